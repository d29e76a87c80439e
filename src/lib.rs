use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod extract;
pub mod query;

/// Lowercase alphanumeric identifier derived from a display name,
/// truncated to 50 characters.
pub fn slug(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii_alphanumeric)
        .take(50)
        .collect()
}

/// One bibliographic record from the source file. Never merged across
/// rows, even when two rows share an EID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub source: String,
    pub cited_by: u64,
    pub doi: String,
    pub link: String,
    pub document_type: String,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorNode {
    pub id: String,
    pub name: String,
    pub affiliation: String,
    pub paper_count: usize,
    pub citation_count: u64,
    pub papers: Vec<Paper>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityNode {
    pub id: String,
    pub name: String,
    pub paper_count: usize,
    pub citation_count: u64,
    pub authors: Vec<AuthorNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryNode {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub paper_count: usize,
    pub citation_count: u64,
    pub universities: Vec<UniversityNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_papers: usize,
    pub total_citations: u64,
    pub total_countries: usize,
    pub total_universities: usize,
    pub total_authors: usize,
}

/// Restricts which rows participate in an aggregation run. Doubles as
/// the cache key, so identical filters share one computed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum YearFilter {
    #[default]
    All,
    Single(i32),
    /// Inclusive on both ends.
    Range(i32, i32),
}

impl YearFilter {
    pub fn matches(&self, year: i32) -> bool {
        match *self {
            YearFilter::All => true,
            YearFilter::Single(y) => year == y,
            YearFilter::Range(start, end) => year >= start && year <= end,
        }
    }

    /// Builds a filter from the CLI's optional year arguments. A lone
    /// `--year` wins over a range.
    pub fn from_args(year: Option<i32>, start: Option<i32>, end: Option<i32>) -> Self {
        match (year, start, end) {
            (Some(y), _, _) => YearFilter::Single(y),
            (None, Some(s), Some(e)) => YearFilter::Range(s, e),
            _ => YearFilter::All,
        }
    }
}
