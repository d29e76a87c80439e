use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use scopus_atlas::extract::{extract_row, AssignmentPolicy, LoadError, SourceTable};

fn csv_row(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| format!("\"{}\"", f))
        .collect::<Vec<_>>()
        .join(",")
}

fn write_csv(dir: &TempDir, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

const STRUCTURED_HEADER: &[&str] = &[
    "EID",
    "Title",
    "Year",
    "Source title",
    "Cited by",
    "DOI",
    "Link",
    "Document Type",
    "Author 1",
    "Author 2",
    "Author with Affliliation 1",
    "Author with Affliliation 2",
    "University 1",
    "University 2",
    "Country 1",
    "Country 2",
];

fn structured_file(dir: &TempDir, rows: &[Vec<&str>]) -> PathBuf {
    let mut lines = vec![csv_row(STRUCTURED_HEADER)];
    lines.extend(rows.iter().map(|r| csv_row(r)));
    write_csv(dir, "papers.csv", &lines)
}

#[test]
fn test_load_missing_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = SourceTable::load(temp_dir.path().join("absent.csv"));
    assert!(matches!(result, Err(LoadError::Missing(_))));
}

#[test]
fn test_load_header_only_file_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_csv(&temp_dir, "empty.csv", &[csv_row(STRUCTURED_HEADER)]);
    let result = SourceTable::load(path);
    assert!(matches!(result, Err(LoadError::Empty)));
}

#[test]
fn test_format_detection() {
    let temp_dir = TempDir::new().unwrap();

    let structured = structured_file(
        &temp_dir,
        &[vec![
            "e1", "T", "2021", "S", "0", "", "", "", "", "", "", "", "", "", "", "",
        ]],
    );
    assert!(SourceTable::load(structured).unwrap().is_structured());

    let raw = write_csv(
        &temp_dir,
        "raw.csv",
        &[
            csv_row(&["EID", "Title", "Year", "Cited by", "Authors with affiliations"]),
            csv_row(&["e1", "T", "2021", "0", "Doe, Jane, APU, KL, Malaysia"]),
        ],
    );
    assert!(!SourceTable::load(raw).unwrap().is_structured());
}

#[test]
fn test_extract_paper_fields() {
    let temp_dir = TempDir::new().unwrap();
    let path = structured_file(
        &temp_dir,
        &[vec![
            "2-s2.0-1",
            "Deep Learning Survey",
            "2022",
            "IEEE Access",
            "5.0",
            "10.1/x",
            "https://example.org/p1",
            "Article",
            "Doe, Jane (123)",
            "Smith, John (456)",
            "",
            "",
            "",
            "",
            "",
            "",
        ]],
    );
    let table = SourceTable::load(path).unwrap();
    let extracted = extract_row(&table, 0, AssignmentPolicy::default());

    let paper = &extracted.paper;
    assert_eq!(paper.id, "2-s2.0-1");
    assert_eq!(paper.title, "Deep Learning Survey");
    assert_eq!(paper.year, 2022);
    assert_eq!(paper.source, "IEEE Access");
    assert_eq!(paper.cited_by, 5); // float cell parsed as integer
    assert_eq!(paper.document_type, "Article");
    // id suffixes are stripped from display names
    assert_eq!(paper.authors, vec!["Doe, Jane", "Smith, John"]);
}

#[test]
fn test_extract_paper_falls_back_to_row_index_id() {
    let temp_dir = TempDir::new().unwrap();
    let path = structured_file(
        &temp_dir,
        &[vec![
            "", "T", "2021", "S", "0", "", "", "", "", "", "", "", "", "", "", "",
        ]],
    );
    let table = SourceTable::load(path).unwrap();
    let extracted = extract_row(&table, 0, AssignmentPolicy::default());
    assert_eq!(extracted.paper.id, "paper_0");
}

#[test]
fn test_country_and_university_are_paired_by_index() {
    let temp_dir = TempDir::new().unwrap();
    let path = structured_file(
        &temp_dir,
        &[vec![
            "e1",
            "T",
            "2021",
            "S",
            "0",
            "",
            "",
            "",
            "Doe, Jane (123)",
            "Smith, John (456)",
            "Jane Doe - Asia Pacific University",
            "John Smith - University of Oxford",
            "Asia Pacific University",
            "University of Oxford",
            "Malaysia",
            "United Kingdom",
        ]],
    );
    let table = SourceTable::load(path).unwrap();
    let extracted = extract_row(&table, 0, AssignmentPolicy::default());

    assert_eq!(extracted.associations.len(), 2);
    // University 1 belongs to Country 1, never a cross product
    assert_eq!(extracted.associations[0].country, "Malaysia");
    assert_eq!(extracted.associations[0].university, "Asia Pacific University");
    assert_eq!(extracted.associations[1].country, "United Kingdom");
    assert_eq!(extracted.associations[1].university, "University of Oxford");

    // each author matched to their own university via the affiliation map
    assert_eq!(extracted.associations[0].authors.len(), 1);
    assert_eq!(extracted.associations[0].authors[0].id, "123");
    assert_eq!(extracted.associations[0].authors[0].display, "Doe, Jane");
    assert_eq!(extracted.associations[1].authors.len(), 1);
    assert_eq!(extracted.associations[1].authors[0].id, "456");
}

#[test]
fn test_unmatched_university_falls_back_to_all_authors() {
    let temp_dir = TempDir::new().unwrap();
    let rows = vec![vec![
        "e1",
        "T",
        "2021",
        "S",
        "0",
        "",
        "",
        "",
        "Doe, Jane (123)",
        "Smith, John (456)",
        "Jane Doe - Asia Pacific University",
        "",
        "Asia Pacific University",
        "University of Oxford",
        "Malaysia",
        "United Kingdom",
    ]];

    let path = structured_file(&temp_dir, &rows);
    let table = SourceTable::load(path).unwrap();

    // no affiliation entry names Oxford, so everyone is assigned to it
    let extracted = extract_row(&table, 0, AssignmentPolicy::FallbackAllAuthors);
    assert_eq!(extracted.associations[1].university, "University of Oxford");
    assert_eq!(extracted.associations[1].authors.len(), 2);

    // the strict policy leaves the university without authors instead
    let extracted = extract_row(&table, 0, AssignmentPolicy::MatchedOnly);
    assert_eq!(extracted.associations[1].authors.len(), 0);
    // the matched association is unaffected by the policy
    assert_eq!(extracted.associations[0].authors.len(), 1);
}

#[test]
fn test_author_without_embedded_id_gets_a_slug() {
    let temp_dir = TempDir::new().unwrap();
    let path = structured_file(
        &temp_dir,
        &[vec![
            "e1",
            "T",
            "2021",
            "S",
            "0",
            "",
            "",
            "",
            "Jane Doe",
            "",
            "Jane Doe - Asia Pacific University",
            "",
            "Asia Pacific University",
            "",
            "Malaysia",
            "",
        ]],
    );
    let table = SourceTable::load(path).unwrap();
    let extracted = extract_row(&table, 0, AssignmentPolicy::default());
    assert_eq!(extracted.associations[0].authors[0].id, "janedoe");
}

#[test]
fn test_raw_format_rows_go_through_the_affiliation_parser() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_csv(
        &temp_dir,
        "raw.csv",
        &[
            csv_row(&[
                "EID",
                "Title",
                "Year",
                "Cited by",
                "Authors with affiliations",
                "Author full names",
            ]),
            csv_row(&[
                "e1",
                "T",
                "2021",
                "3",
                "Doe, Jane, Asia Pacific University, Kuala Lumpur, Malaysia; \
                 Smith, John, University of Oxford, Oxford, United Kingdom",
                "Doe, Jane (123); Smith, John (456)",
            ]),
        ],
    );
    let table = SourceTable::load(path).unwrap();
    let extracted = extract_row(&table, 0, AssignmentPolicy::default());

    assert_eq!(extracted.associations.len(), 2);
    assert_eq!(extracted.associations[0].country, "Malaysia");
    assert_eq!(extracted.associations[0].university, "Asia Pacific University");
    assert_eq!(extracted.associations[0].authors.len(), 1);
    assert_eq!(extracted.associations[0].authors[0].id, "123");
    assert_eq!(extracted.associations[1].country, "United Kingdom");
    assert_eq!(extracted.associations[1].authors[0].id, "456");
}

#[test]
fn test_raw_format_row_without_affiliation_text_yields_no_associations() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_csv(
        &temp_dir,
        "raw.csv",
        &[
            csv_row(&["EID", "Title", "Year", "Cited by", "Authors with affiliations"]),
            csv_row(&["e1", "T", "2021", "0", ""]),
        ],
    );
    let table = SourceTable::load(path).unwrap();
    let extracted = extract_row(&table, 0, AssignmentPolicy::default());
    assert!(extracted.associations.is_empty());
}
