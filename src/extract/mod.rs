use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;
use tracing::debug;

use crate::{slug, Paper};

mod names;
mod parser;

pub use names::{extract_author_id, match_key, normalize_name, strip_id_suffix};
pub use parser::{build_id_hints, parse_affiliations, RawAffiliation};

/// Repeated-column widths of the structured export format.
const AUTHOR_COLUMNS: usize = 10;
const AFFILIATION_COLUMNS: usize = 18;

/// A total load failure. Parse-level problems inside individual rows
/// never surface here; they are skipped during extraction.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("source file contains no data rows")]
    Empty,
    #[error("failed to read source file: {0}")]
    Csv(#[from] csv::Error),
}

/// An in-memory CSV export: header index plus raw rows. The whole table
/// is held in memory; aggregation is a bounded batch pass, not a stream.
pub struct SourceTable {
    headers: HashMap<String, usize>,
    rows: Vec<StringRecord>,
}

impl SourceTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SourceTable, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::Missing(path.to_path_buf()));
        }

        let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers: HashMap<String, usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();

        // Unreadable rows are skipped rather than failing the load.
        let rows: Vec<StringRecord> = reader.records().filter_map(|r| r.ok()).collect();
        if rows.is_empty() {
            return Err(LoadError::Empty);
        }

        debug!("loaded {} rows, {} columns", rows.len(), headers.len());
        Ok(SourceTable { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell value for a named column, trimmed; empty and "nan" cells
    /// (pandas artifacts in cleaned exports) read as absent.
    pub fn get<'a>(&self, row: &'a StringRecord, column: &str) -> Option<&'a str> {
        let idx = *self.headers.get(column)?;
        let value = row.get(idx)?.trim();
        if value.is_empty() || value == "nan" {
            None
        } else {
            Some(value)
        }
    }

    /// True when the export carries the pre-structured repeated columns
    /// rather than the raw free-text affiliation fields.
    pub fn is_structured(&self) -> bool {
        self.headers.contains_key("Author 1")
            && self.headers.contains_key("University 1")
            && self.headers.contains_key("Country 1")
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }
}

/// Governs what happens when no author on a paper matches a university
/// listed for that paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignmentPolicy {
    /// Assign every author on the paper to the unmatched university, so
    /// the institution-paper association is not silently lost. Trades
    /// precision for recall.
    #[default]
    FallbackAllAuthors,
    /// Only assign authors whose affiliation entry names the university.
    MatchedOnly,
}

#[derive(Debug, Clone)]
pub struct RowAuthor {
    /// Name as shown in the Author column, id suffix stripped.
    pub display: String,
    /// Numeric id when the column embeds one, else a slug of the name.
    pub id: String,
    /// Normalized join key against the affiliation map.
    norm: String,
}

/// One (country, university) occurrence on a paper with its assigned
/// authors. Country index i and university index i always refer to the
/// same occurrence; the lists are never crossed.
#[derive(Debug, Clone)]
pub struct Association {
    pub country: String,
    pub university: String,
    pub authors: Vec<RowAuthor>,
}

#[derive(Debug, Clone)]
pub struct ExtractedRow {
    pub paper: Paper,
    pub associations: Vec<Association>,
}

fn parse_int(value: Option<&str>) -> i64 {
    // cleaned exports sometimes carry floats like "5.0"
    value
        .and_then(|v| v.parse::<f64>().ok())
        .map(|v| v as i64)
        .unwrap_or(0)
}

pub fn extract_paper(table: &SourceTable, row: &StringRecord, row_idx: usize) -> Paper {
    let id = table
        .get(row, "EID")
        .map(str::to_string)
        .unwrap_or_else(|| format!("paper_{}", row_idx));

    let mut authors = Vec::new();
    for i in 1..=AUTHOR_COLUMNS {
        if let Some(text) = table.get(row, &format!("Author {}", i)) {
            let name = strip_id_suffix(text);
            if !name.is_empty() {
                authors.push(name);
            }
        }
    }

    Paper {
        id,
        title: table.get(row, "Title").unwrap_or_default().to_string(),
        year: parse_int(table.get(row, "Year")) as i32,
        source: table
            .get(row, "Source title")
            .unwrap_or_default()
            .to_string(),
        cited_by: parse_int(table.get(row, "Cited by")).max(0) as u64,
        doi: table.get(row, "DOI").unwrap_or_default().to_string(),
        link: table.get(row, "Link").unwrap_or_default().to_string(),
        document_type: table
            .get(row, "Document Type")
            .unwrap_or_default()
            .to_string(),
        authors,
    }
}

/// Splits an "Author Name - University" cell. Returns None unless both
/// sides are present.
fn split_affiliation(text: &str) -> Option<(&str, &str)> {
    let (name, university) = text.split_once(" - ")?;
    let (name, university) = (name.trim(), university.trim());
    if name.is_empty() || university.is_empty() {
        None
    } else {
        Some((name, university))
    }
}

fn row_author(text: &str) -> RowAuthor {
    let display = strip_id_suffix(text);
    let id = extract_author_id(text).unwrap_or_else(|| slug(&display));
    let norm = normalize_name(&display);
    RowAuthor { display, id, norm }
}

/// Extracts one paper and its per-index (country, university, authors)
/// associations from a row, in either source format.
pub fn extract_row(
    table: &SourceTable,
    row_idx: usize,
    policy: AssignmentPolicy,
) -> ExtractedRow {
    let row = &table.rows()[row_idx];
    let paper = extract_paper(table, row, row_idx);

    let associations = if table.is_structured() {
        extract_structured(table, row, policy)
    } else {
        extract_raw(table, row)
    };

    ExtractedRow {
        paper,
        associations,
    }
}

fn extract_structured(
    table: &SourceTable,
    row: &StringRecord,
    policy: AssignmentPolicy,
) -> Vec<Association> {
    let authors: Vec<RowAuthor> = (1..=AUTHOR_COLUMNS)
        .filter_map(|i| table.get(row, &format!("Author {}", i)))
        .map(row_author)
        .collect();

    // normalized author name -> university, from the "Author with
    // Affliliation i" columns (the source misspells the header)
    let mut affiliation_map: HashMap<String, String> = HashMap::new();
    for i in 1..=AUTHOR_COLUMNS {
        if let Some(text) = table.get(row, &format!("Author with Affliliation {}", i)) {
            if let Some((name, university)) = split_affiliation(text) {
                affiliation_map.insert(normalize_name(name), university.to_string());
            }
        }
    }

    let mut associations = Vec::new();
    for i in 1..=AFFILIATION_COLUMNS {
        let country = table.get(row, &format!("Country {}", i));
        let university = table.get(row, &format!("University {}", i));
        let (Some(country), Some(university)) = (country, university) else {
            continue;
        };

        let matched: Vec<RowAuthor> = authors
            .iter()
            .filter(|a| affiliation_map.get(&a.norm).map(String::as_str) == Some(university))
            .cloned()
            .collect();

        let assigned = if matched.is_empty() && policy == AssignmentPolicy::FallbackAllAuthors {
            authors.clone()
        } else {
            matched
        };

        associations.push(Association {
            country: country.to_string(),
            university: university.to_string(),
            authors: assigned,
        });
    }
    associations
}

fn extract_raw(table: &SourceTable, row: &StringRecord) -> Vec<Association> {
    let Some(raw) = table.get(row, "Authors with affiliations") else {
        return Vec::new();
    };
    let hints = build_id_hints(table.get(row, "Author full names").unwrap_or_default());

    // group parsed edges by (institution, country), keeping discovery
    // order for stable downstream tie-breaks
    let mut order: Vec<(String, String)> = Vec::new();
    let mut grouped: HashMap<(String, String), Association> = HashMap::new();

    for edge in parse_affiliations(raw, &hints) {
        let key = (slug(&edge.institution), slug(&edge.country));
        let assoc = grouped.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Association {
                country: edge.country.clone(),
                university: edge.institution.clone(),
                authors: Vec::new(),
            }
        });
        let id = edge
            .author_id
            .clone()
            .unwrap_or_else(|| slug(&edge.author_name));
        if assoc.authors.iter().all(|a| a.id != id) {
            assoc.authors.push(RowAuthor {
                norm: normalize_name(&edge.author_name),
                display: edge.author_name,
                id,
            });
        }
    }

    order
        .into_iter()
        .filter_map(|key| grouped.remove(&key))
        .collect()
}
