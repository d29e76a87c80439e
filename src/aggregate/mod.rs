use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::extract::{extract_row, AssignmentPolicy, Association, SourceTable};
use crate::{slug, AuthorNode, CountryNode, Paper, Stats, UniversityNode, YearFilter};

mod coords;
pub use coords::{country_coordinates, Coordinates};

/// The complete result of one aggregation run over a filtered row set.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub countries: Vec<CountryNode>,
    pub stats: Stats,
}

#[derive(Default)]
struct AuthorAcc {
    name: String,
    affiliation: String,
    papers: HashSet<String>,
    // distinct paper ids in discovery order, for deterministic output
    paper_order: Vec<String>,
}

#[derive(Default)]
struct UniversityAcc {
    name: String,
    papers: HashSet<String>,
    author_order: Vec<String>,
    authors: HashMap<String, AuthorAcc>,
}

#[derive(Default)]
struct CountryAcc {
    name: String,
    papers: HashSet<String>,
    university_order: Vec<String>,
    universities: HashMap<String, UniversityAcc>,
}

#[derive(Default)]
struct Fold {
    country_order: Vec<String>,
    countries: HashMap<String, CountryAcc>,
}

impl Fold {
    fn add(&mut self, assoc: &Association, paper_id: &str) {
        let country_id = slug(&assoc.country);
        if !self.countries.contains_key(&country_id) {
            self.country_order.push(country_id.clone());
        }
        let country = self.countries.entry(country_id).or_default();
        country.name = assoc.country.clone();
        country.papers.insert(paper_id.to_string());

        let university_id = slug(&assoc.university);
        if !country.universities.contains_key(&university_id) {
            country.university_order.push(university_id.clone());
        }
        let university = country.universities.entry(university_id).or_default();
        university.name = assoc.university.clone();
        university.papers.insert(paper_id.to_string());

        for author in &assoc.authors {
            if !university.authors.contains_key(&author.id) {
                university.author_order.push(author.id.clone());
            }
            let acc = university.authors.entry(author.id.clone()).or_default();
            acc.name = author.display.clone();
            acc.affiliation = assoc.university.clone();
            if acc.papers.insert(paper_id.to_string()) {
                acc.paper_order.push(paper_id.to_string());
            }
        }
    }
}

fn citation_sum(papers: &HashSet<String>, index: &HashMap<String, Paper>) -> u64 {
    // ids missing from the index are skipped
    papers
        .iter()
        .filter_map(|id| index.get(id))
        .map(|p| p.cited_by)
        .sum()
}

fn emit(fold: &Fold, index: &HashMap<String, Paper>) -> Vec<CountryNode> {
    let mut countries = Vec::new();

    for country_id in &fold.country_order {
        let country = &fold.countries[country_id];
        let mut universities = Vec::new();

        for university_id in &country.university_order {
            let university = &country.universities[university_id];
            let mut authors = Vec::new();

            for author_id in &university.author_order {
                let author = &university.authors[author_id];
                let papers: Vec<Paper> = author
                    .paper_order
                    .iter()
                    .filter_map(|id| index.get(id).cloned())
                    .collect();
                let citation_count = papers.iter().map(|p| p.cited_by).sum();
                authors.push(AuthorNode {
                    id: author_id.clone(),
                    name: author.name.clone(),
                    affiliation: author.affiliation.clone(),
                    paper_count: author.papers.len(),
                    citation_count,
                    papers,
                });
            }

            if authors.is_empty() {
                continue;
            }
            authors.sort_by(|a, b| b.paper_count.cmp(&a.paper_count));

            universities.push(UniversityNode {
                id: university_id.clone(),
                name: university.name.clone(),
                paper_count: university.papers.len(),
                citation_count: citation_sum(&university.papers, index),
                authors,
            });
        }

        if universities.is_empty() {
            continue;
        }
        universities.sort_by(|a, b| b.paper_count.cmp(&a.paper_count));

        let coords = country_coordinates(&country.name);
        countries.push(CountryNode {
            id: country_id.clone(),
            name: country.name.clone(),
            lat: coords.lat,
            lng: coords.lng,
            paper_count: country.papers.len(),
            citation_count: citation_sum(&country.papers, index),
            universities,
        });
    }

    countries.sort_by(|a, b| b.paper_count.cmp(&a.paper_count));
    countries
}

/// Folds every filtered row into the country → university → author tree
/// and computes final counts. One full pass; no incremental update.
pub fn aggregate(table: &SourceTable, filter: YearFilter, policy: AssignmentPolicy) -> Aggregate {
    aggregate_with(table, filter, policy, |_| {})
}

pub fn aggregate_with<F>(
    table: &SourceTable,
    filter: YearFilter,
    policy: AssignmentPolicy,
    mut on_row: F,
) -> Aggregate
where
    F: FnMut(usize),
{
    let mut fold = Fold::default();
    let mut index: HashMap<String, Paper> = HashMap::new();
    let mut total_papers = 0usize;
    let mut total_citations = 0u64;

    for row_idx in 0..table.len() {
        let extracted = extract_row(table, row_idx, policy);
        on_row(row_idx);
        if !filter.matches(extracted.paper.year) {
            continue;
        }

        // totals come from the row set, not the tree, so papers with no
        // resolved affiliation still count
        total_papers += 1;
        total_citations += extracted.paper.cited_by;

        let paper_id = extracted.paper.id.clone();
        index.insert(paper_id.clone(), extracted.paper);
        for assoc in &extracted.associations {
            fold.add(assoc, &paper_id);
        }
    }

    let countries = emit(&fold, &index);

    let total_universities = countries.iter().map(|c| c.universities.len()).sum();
    let mut author_ids: HashSet<&str> = HashSet::new();
    for country in &countries {
        for university in &country.universities {
            for author in &university.authors {
                author_ids.insert(&author.id);
            }
        }
    }

    let stats = Stats {
        total_papers,
        total_citations,
        total_countries: countries.len(),
        total_universities,
        total_authors: author_ids.len(),
    };

    Aggregate { countries, stats }
}

#[derive(Args)]
pub struct ProcessArgs {
    /// Bibliographic CSV export (structured or raw format)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for countries.json and stats.json
    #[arg(short, long)]
    pub output: PathBuf,

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
    /// (disables the assign-all-authors fallback)
    #[arg(long)]
    pub matched_only: bool,
}

pub fn run(args: ProcessArgs) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scopus_atlas=info".parse().unwrap()),
        )
        .try_init()
        .ok();

    fs::create_dir_all(&args.output)?;

    let table = SourceTable::load(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    info!("Loaded {} rows", table.len());

    let filter = YearFilter::from_args(args.year, args.start_year, args.end_year);
    let policy = if args.matched_only {
        AssignmentPolicy::MatchedOnly
    } else {
        AssignmentPolicy::FallbackAllAuthors
    };

    let progress = ProgressBar::new(table.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let aggregate = aggregate_with(&table, filter, policy, |_| progress.inc(1));
    progress.finish();

    let countries_path = args.output.join("countries.json");
    let file = File::create(&countries_path)
        .with_context(|| format!("failed to create {}", countries_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &aggregate.countries)?;
    writer.flush()?;

    let stats_path = args.output.join("stats.json");
    let file = File::create(&stats_path)
        .with_context(|| format!("failed to create {}", stats_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &aggregate.stats)?;
    writer.flush()?;

    info!(
        "Aggregated {} papers into {} countries, {} universities, {} authors",
        aggregate.stats.total_papers,
        aggregate.stats.total_countries,
        aggregate.stats.total_universities,
        aggregate.stats.total_authors
    );
    info!("Output: {}", args.output.display());

    Ok(())
}
