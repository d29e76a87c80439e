use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::{aggregate, Aggregate, Coordinates};
use crate::extract::{AssignmentPolicy, LoadError, SourceTable};
use crate::{AuthorNode, CountryNode, Stats, YearFilter};

mod cache;
pub use cache::TreeCache;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountrySummary {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub paper_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversitySummary {
    pub id: String,
    pub name: String,
    pub paper_count: usize,
    pub citation_count: u64,
    pub author_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryDetail {
    pub id: String,
    pub name: String,
    pub paper_count: usize,
    pub citation_count: u64,
    pub universities: Vec<UniversitySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: String,
    pub name: String,
    pub affiliation: String,
    pub paper_count: usize,
    pub citation_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityDetail {
    pub id: String,
    pub name: String,
    pub country: String,
    pub paper_count: usize,
    pub citation_count: u64,
    pub authors: Vec<AuthorSummary>,
}

/// Read-only views over the aggregated tree, with a filter-keyed cache.
///
/// Every view re-runs the aggregation for an uncached filter; results
/// are cached until the source file is replaced.
pub struct DataService {
    path: PathBuf,
    policy: AssignmentPolicy,
    cache: TreeCache,
}

impl DataService {
    /// Opens a source file, validating it with a full unfiltered
    /// aggregation run. Missing or empty files are rejected.
    pub fn load<P: Into<PathBuf>>(path: P, policy: AssignmentPolicy) -> Result<Self, LoadError> {
        let service = Self {
            path: path.into(),
            policy,
            cache: TreeCache::new(),
        };
        service.tree(YearFilter::All)?;
        Ok(service)
    }

    /// Swaps in a new source file. The replacement is validated first;
    /// on failure the prior dataset and cache are left untouched.
    pub fn replace<P: Into<PathBuf>>(&mut self, path: P) -> Result<(), LoadError> {
        let path = path.into();
        let table = SourceTable::load(&path)?;
        let tree = aggregate(&table, YearFilter::All, self.policy);

        self.path = path;
        self.cache.invalidate();
        self.cache.get_or_compute(YearFilter::All, || Ok(tree))?;
        Ok(())
    }

    fn tree(&self, filter: YearFilter) -> Result<Arc<Aggregate>, LoadError> {
        self.cache.get_or_compute(filter, || {
            let table = SourceTable::load(&self.path)?;
            Ok(aggregate(&table, filter, self.policy))
        })
    }

    pub fn cache(&self) -> &TreeCache {
        &self.cache
    }

    /// Overall statistics; the country total only counts countries with
    /// known coordinates, i.e. those visible on the map.
    pub fn stats(&self, filter: YearFilter) -> Result<Stats, LoadError> {
        let tree = self.tree(filter)?;
        let on_map = tree
            .countries
            .iter()
            .filter(|c| {
                Coordinates {
                    lat: c.lat,
                    lng: c.lng,
                }
                .is_on_map()
            })
            .count();
        Ok(Stats {
            total_countries: on_map,
            ..tree.stats.clone()
        })
    }

    pub fn countries(&self, filter: YearFilter) -> Result<Vec<CountrySummary>, LoadError> {
        let tree = self.tree(filter)?;
        Ok(tree
            .countries
            .iter()
            .map(|c| CountrySummary {
                id: c.id.clone(),
                name: c.name.clone(),
                lat: c.lat,
                lng: c.lng,
                paper_count: c.paper_count,
            })
            .collect())
    }

    pub fn country(
        &self,
        country_id: &str,
        filter: YearFilter,
    ) -> Result<Option<CountryDetail>, LoadError> {
        let tree = self.tree(filter)?;
        let Some(country) = tree.countries.iter().find(|c| c.id == country_id) else {
            return Ok(None);
        };
        Ok(Some(CountryDetail {
            id: country.id.clone(),
            name: country.name.clone(),
            paper_count: country.paper_count,
            citation_count: country.citation_count,
            universities: country
                .universities
                .iter()
                .map(|u| UniversitySummary {
                    id: u.id.clone(),
                    name: u.name.clone(),
                    paper_count: u.paper_count,
                    citation_count: u.citation_count,
                    author_count: u.authors.len(),
                })
                .collect(),
        }))
    }

    pub fn university(
        &self,
        country_id: &str,
        university_id: &str,
        filter: YearFilter,
    ) -> Result<Option<UniversityDetail>, LoadError> {
        let tree = self.tree(filter)?;
        let Some(country) = tree.countries.iter().find(|c| c.id == country_id) else {
            return Ok(None);
        };
        let Some(university) = country.universities.iter().find(|u| u.id == university_id)
        else {
            return Ok(None);
        };
        Ok(Some(UniversityDetail {
            id: university.id.clone(),
            name: university.name.clone(),
            country: country.name.clone(),
            paper_count: university.paper_count,
            citation_count: university.citation_count,
            authors: university
                .authors
                .iter()
                .map(|a| AuthorSummary {
                    id: a.id.clone(),
                    name: a.name.clone(),
                    affiliation: a.affiliation.clone(),
                    paper_count: a.paper_count,
                    citation_count: a.citation_count,
                })
                .collect(),
        }))
    }

    pub fn author(
        &self,
        country_id: &str,
        university_id: &str,
        author_id: &str,
        filter: YearFilter,
    ) -> Result<Option<AuthorNode>, LoadError> {
        let tree = self.tree(filter)?;
        Ok(tree
            .countries
            .iter()
            .find(|c| c.id == country_id)
            .and_then(|c| c.universities.iter().find(|u| u.id == university_id))
            .and_then(|u| u.authors.iter().find(|a| a.id == author_id))
            .cloned())
    }

    /// The full filtered tree; consumers do their own text filtering.
    pub fn search(&self, filter: YearFilter) -> Result<Vec<CountryNode>, LoadError> {
        let tree = self.tree(filter)?;
        Ok(tree.countries.clone())
    }
}

#[derive(Args)]
pub struct QueryArgs {
    /// Bibliographic CSV export (structured or raw format)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Country id (slug) to drill into
    #[arg(short, long)]
    pub country: Option<String>,

    /// University id within the country
    #[arg(short, long)]
    pub university: Option<String>,

    /// Author id within the university
    #[arg(short, long)]
    pub author: Option<String>,

    /// Restrict to a single publication year
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Inclusive start of a publication-year range
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Inclusive end of a publication-year range
    #[arg(long)]
    pub end_year: Option<i32>,

    /// Only credit authors whose affiliation entry names the university
    #[arg(long)]
    pub matched_only: bool,
}

fn policy_from(matched_only: bool) -> AssignmentPolicy {
    if matched_only {
        AssignmentPolicy::MatchedOnly
    } else {
        AssignmentPolicy::FallbackAllAuthors
    }
}

pub fn run(args: QueryArgs) -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let service = DataService::load(&args.input, policy_from(args.matched_only))
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    let filter = YearFilter::from_args(args.year, args.start_year, args.end_year);

    match (&args.country, &args.university, &args.author) {
        (None, _, _) => {
            let countries = service.countries(filter)?;
            info!("{} countries", countries.len());
            println!("{}", serde_json::to_string_pretty(&countries)?);
        }
        (Some(country), None, _) => {
            let Some(detail) = service.country(country, filter)? else {
                bail!("country not found: {}", country);
            };
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        (Some(country), Some(university), None) => {
            let Some(detail) = service.university(country, university, filter)? else {
                bail!("university not found: {}/{}", country, university);
            };
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        (Some(country), Some(university), Some(author)) => {
            let Some(node) = service.author(country, university, author, filter)? else {
                bail!("author not found: {}/{}/{}", country, university, author);
            };
            println!("{}", serde_json::to_string_pretty(&node)?);
        }
    }

    Ok(())
}

#[derive(Args)]
pub struct StatsArgs {
    /// Bibliographic CSV export (structured or raw format)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Restrict to a single publication year
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Inclusive start of a publication-year range
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Inclusive end of a publication-year range
    #[arg(long)]
    pub end_year: Option<i32>,
}

pub fn run_stats(args: StatsArgs) -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let service = DataService::load(&args.input, AssignmentPolicy::default())
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    let filter = YearFilter::from_args(args.year, args.start_year, args.end_year);
    let stats = service.stats(filter)?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
