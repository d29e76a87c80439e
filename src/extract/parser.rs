use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

use super::names::match_key;

/// One resolved (author, institution, country) association parsed from
/// the free-text "Authors with affiliations" field of a single paper.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAffiliation {
    pub author_name: String,
    pub author_id: Option<String>,
    pub institution: String,
    pub country: String,
}

/// Tokens that mark the start of an institution name. Includes common
/// non-English spellings seen in Scopus exports.
const INSTITUTION_KEYWORDS: &[&str] = &[
    "university",
    "college",
    "institute",
    "school",
    "polytechnic",
    "academy",
    "center",
    "centre",
    "department",
    "faculty",
    "laboratory",
    "universidade",
    "universit\u{e9}",
    "universit\u{e4}t",
    "universiti",
];

lazy_static! {
    static ref FULL_NAME_ID_RE: Regex = Regex::new(r"^(.+?)\s*\((\d+)\)$").unwrap();
}

fn is_institution_token(token: &str) -> bool {
    let lower = token.to_lowercase();
    INSTITUTION_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Builds the name-key → numeric-id map from the "Author full names"
/// field (semicolon-separated "Name (digits)" entries).
pub fn build_id_hints(author_full_names: &str) -> HashMap<String, String> {
    let mut hints = HashMap::new();
    for part in author_full_names.split(';') {
        let part = part.trim();
        if let Some(caps) = FULL_NAME_ID_RE.captures(part) {
            hints.insert(match_key(&caps[1]), caps[2].to_string());
        }
    }
    hints
}

/// Best-effort parse of one paper's "Authors with affiliations" text.
///
/// Entries are separated by `;`, tokens by `,`. The first two tokens of
/// an entry are the author's name ("Last, First"); the rest is a chain
/// of institution/location/country tokens carved up by the keyword set
/// above. Entries with fewer than four tokens are skipped, as are
/// sub-2-character noise tokens. Never errors: an unparseable entry
/// simply contributes no associations.
pub fn parse_affiliations(
    raw: &str,
    id_hints: &HashMap<String, String>,
) -> Vec<RawAffiliation> {
    let mut edges = Vec::new();
    // tuples already seen for this paper, case-insensitive; keyed with
    // the author so a second author at the same institution still gets
    // their own association
    let mut seen: HashSet<(String, String, String)> = HashSet::new();

    for entry in raw.split(';') {
        let tokens: Vec<&str> = entry
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.len() < 4 {
            continue;
        }

        let author_name = format!("{} {}", tokens[1], tokens[0]);
        let author_id = id_hints.get(&match_key(&author_name)).cloned();

        let chain: Vec<&str> = tokens[2..]
            .iter()
            .copied()
            .filter(|t| t.len() >= 2)
            .collect();
        if chain.len() < 2 {
            continue;
        }

        for (institution, country) in split_chain(&chain) {
            let key = (
                author_name.to_lowercase(),
                institution.to_lowercase(),
                country.to_lowercase(),
            );
            if seen.insert(key) {
                edges.push(RawAffiliation {
                    author_name: author_name.clone(),
                    author_id: author_id.clone(),
                    institution,
                    country,
                });
            }
        }
    }

    edges
}

/// Carves an entry's token chain into (institution, country) pairs.
///
/// A keyword token not immediately followed by another keyword token
/// starts an institution run; the token before the next keyword token
/// (or the chain's final token) is that institution's country. Chains
/// without any keyword degrade to (first token, last token).
fn split_chain(chain: &[&str]) -> Vec<(String, String)> {
    let starts: Vec<usize> = (0..chain.len())
        .filter(|&i| {
            is_institution_token(chain[i])
                && !(i + 1 < chain.len() && is_institution_token(chain[i + 1]))
        })
        .collect();

    if starts.is_empty() {
        return vec![(chain[0].to_string(), chain[chain.len() - 1].to_string())];
    }

    let mut pairs = Vec::new();
    for &start in &starts {
        let boundary = (start + 1..chain.len()).find(|&j| is_institution_token(chain[j]));
        let country_idx = match boundary {
            Some(j) => j - 1,
            None => chain.len() - 1,
        };
        if country_idx == start {
            // keyword run ends the chain with no country token after it
            continue;
        }
        pairs.push((chain[start].to_string(), chain[country_idx].to_string()));
    }
    pairs
}
