//! Stage 2 — merchant resolution against a static pattern table.
//!
//! Patterns are precompiled once, matched in a single ranked pass, and the
//! table is read-only data after construction — extending the merchant set
//! is a data change (a TOML override), not a code change.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SCAN_LINES: usize = 20;

#[derive(Debug, Deserialize)]
struct MerchantTableFile {
    #[serde(default)]
    merchant: Vec<MerchantPattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantPattern {
    pub pattern: String,
    pub canonical_name: String,
    pub weight: f32,
}

impl MerchantPattern {
    pub fn new(pattern: impl Into<String>, canonical_name: impl Into<String>, weight: f32) -> Self {
        MerchantPattern {
            pattern: pattern.into(),
            canonical_name: canonical_name.into(),
            weight,
        }
    }
}

#[derive(Debug, Error)]
pub enum MerchantTableError {
    #[error("failed to parse merchant table TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid merchant pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MerchantResolution {
    pub name: String,
    pub confidence: f32,
}

struct CompiledPattern {
    canonical_name: String,
    weight: f32,
    regex: Regex,
}

/// A read-only, compiled merchant lookup table. Cheap to clone (an `Arc`
/// internally would be the next step if construction cost ever mattered —
/// for ~40-100 patterns it does not).
pub struct MerchantTable {
    patterns: Vec<CompiledPattern>,
}

impl MerchantTable {
    pub fn new(patterns: Vec<MerchantPattern>) -> Result<Self, MerchantTableError> {
        let compiled = patterns
            .into_iter()
            .map(|p| {
                let regex = compile_whitespace_tolerant(&p.pattern).map_err(|source| {
                    MerchantTableError::InvalidPattern {
                        pattern: p.pattern.clone(),
                        source,
                    }
                })?;
                Ok(CompiledPattern {
                    canonical_name: p.canonical_name,
                    weight: p.weight,
                    regex,
                })
            })
            .collect::<Result<Vec<_>, MerchantTableError>>()?;
        Ok(MerchantTable { patterns: compiled })
    }

    /// Parses an override table from TOML, shaped as an array of tables:
    /// `[[merchant]]` / `pattern = "..."` / `canonical_name = "..."` /
    /// `weight = 0.9`.
    pub fn from_toml(toml_text: &str) -> Result<Self, MerchantTableError> {
        let file: MerchantTableFile = toml::from_str(toml_text)?;
        Self::new(file.merchant)
    }

    /// Ships at least 40 well-known retailers, several with multiple
    /// spellings — the default the pipeline uses when the caller supplies no
    /// override.
    pub fn default_table() -> Self {
        Self::new(
            DEFAULT_MERCHANTS
                .iter()
                .map(|(pattern, canonical, weight)| {
                    MerchantPattern::new(*pattern, *canonical, *weight)
                })
                .collect(),
        )
        .expect("built-in merchant table patterns must compile")
    }

    /// Scans the first ~20 lines of the transcript; returns the highest-
    /// weight match, ties broken by first occurrence. `("Unknown Store",
    /// 0.0)` when nothing matches.
    pub fn resolve(&self, transcript: &str) -> MerchantResolution {
        let scan_text: String = transcript.lines().take(SCAN_LINES).collect::<Vec<_>>().join("\n");

        let mut best: Option<(f32, usize, &str)> = None;
        for cp in &self.patterns {
            if let Some(m) = cp.regex.find(&scan_text) {
                let is_better = match best {
                    None => true,
                    Some((w, pos, _)) => cp.weight > w || (cp.weight == w && m.start() < pos),
                };
                if is_better {
                    best = Some((cp.weight, m.start(), &cp.canonical_name));
                }
            }
        }

        match best {
            Some((weight, _, name)) => MerchantResolution {
                name: name.to_string(),
                confidence: weight,
            },
            None => MerchantResolution {
                name: "Unknown Store".to_string(),
                confidence: 0.0,
            },
        }
    }
}

/// Turns a human-written pattern like `"whole foods"` into a case-insensitive
/// regex that tolerates any amount of whitespace where the pattern has a
/// literal space, so OCR'd extra/missing spaces don't break the match.
fn compile_whitespace_tolerant(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(pattern.trim());
    let tolerant = escaped.replace(' ', r"\s+");
    Regex::new(&format!(r"(?i){tolerant}"))
}

/// Built-in retailer patterns: (pattern, canonical name, weight).
const DEFAULT_MERCHANTS: &[(&str, &str, f32)] = &[
    ("walmart", "Walmart", 0.95),
    ("wal-mart", "Walmart", 0.95),
    ("target", "Target", 0.95),
    ("costco", "Costco", 0.95),
    ("costco wholesale", "Costco", 0.95),
    ("kroger", "Kroger", 0.9),
    ("safeway", "Safeway", 0.9),
    ("albertsons", "Albertsons", 0.9),
    ("whole foods", "Whole Foods Market", 0.95),
    ("whole foods market", "Whole Foods Market", 0.95),
    ("trader joe's", "Trader Joe's", 0.95),
    ("trader joes", "Trader Joe's", 0.9),
    ("publix", "Publix", 0.9),
    ("aldi", "Aldi", 0.9),
    ("meijer", "Meijer", 0.9),
    ("h-e-b", "H-E-B", 0.9),
    ("heb", "H-E-B", 0.85),
    ("winco foods", "WinCo Foods", 0.9),
    ("food lion", "Food Lion", 0.9),
    ("giant eagle", "Giant Eagle", 0.9),
    ("wegmans", "Wegmans", 0.9),
    ("sprouts farmers market", "Sprouts Farmers Market", 0.9),
    ("cvs pharmacy", "CVS Pharmacy", 0.95),
    ("cvs", "CVS Pharmacy", 0.85),
    ("walgreens", "Walgreens", 0.95),
    ("rite aid", "Rite Aid", 0.9),
    ("home depot", "The Home Depot", 0.95),
    ("the home depot", "The Home Depot", 0.95),
    ("lowe's", "Lowe's", 0.95),
    ("lowes", "Lowe's", 0.9),
    ("best buy", "Best Buy", 0.95),
    ("ikea", "IKEA", 0.95),
    ("macy's", "Macy's", 0.9),
    ("macys", "Macy's", 0.85),
    ("nordstrom", "Nordstrom", 0.9),
    ("tj maxx", "TJ Maxx", 0.9),
    ("t.j. maxx", "TJ Maxx", 0.9),
    ("marshalls", "Marshalls", 0.9),
    ("ross dress for less", "Ross Dress for Less", 0.9),
    ("ross stores", "Ross Dress for Less", 0.85),
    ("dollar general", "Dollar General", 0.9),
    ("dollar tree", "Dollar Tree", 0.9),
    ("family dollar", "Family Dollar", 0.9),
    ("7-eleven", "7-Eleven", 0.9),
    ("7 eleven", "7-Eleven", 0.85),
    ("circle k", "Circle K", 0.9),
    ("starbucks", "Starbucks", 0.95),
    ("mcdonald's", "McDonald's", 0.95),
    ("mcdonalds", "McDonald's", 0.9),
    ("burger king", "Burger King", 0.95),
    ("wendy's", "Wendy's", 0.95),
    ("chipotle", "Chipotle Mexican Grill", 0.95),
    ("chick-fil-a", "Chick-fil-A", 0.95),
    ("subway", "Subway", 0.9),
    ("panera bread", "Panera Bread", 0.9),
    ("dunkin", "Dunkin'", 0.9),
    ("pizza hut", "Pizza Hut", 0.9),
    ("domino's", "Domino's Pizza", 0.9),
    ("amazon", "Amazon", 0.9),
    ("amazon.com", "Amazon", 0.95),
    ("apple store", "Apple Store", 0.9),
    ("staples", "Staples", 0.9),
    ("office depot", "Office Depot", 0.9),
    ("petco", "Petco", 0.9),
    ("petsmart", "PetSmart", 0.9),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_merchant() {
        let table = MerchantTable::default_table();
        let r = table.resolve("WALMART SUPERCENTER\n123 Main St\nTotal $45.00");
        assert_eq!(r.name, "Walmart");
        assert!(r.confidence >= 0.9);
    }

    #[test]
    fn unknown_merchant_returns_fallback() {
        let table = MerchantTable::default_table();
        let r = table.resolve("JOE'S CORNER SHOP\nTotal $10.00");
        assert_eq!(r.name, "Unknown Store");
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn case_and_whitespace_insensitive() {
        let table = MerchantTable::new(vec![MerchantPattern::new("whole foods", "Whole Foods Market", 0.9)])
            .unwrap();
        let r = table.resolve("whole   FOODS market\nTotal $1.00");
        assert_eq!(r.name, "Whole Foods Market");
    }

    #[test]
    fn restricted_to_first_20_lines() {
        let table =
            MerchantTable::new(vec![MerchantPattern::new("costco", "Costco", 0.9)]).unwrap();
        let mut lines = vec!["header".to_string(); 25];
        lines.push("mentions costco in the body".to_string());
        let transcript = lines.join("\n");
        let r = table.resolve(&transcript);
        assert_eq!(r.name, "Unknown Store");
    }

    #[test]
    fn tie_broken_by_first_occurrence() {
        let table = MerchantTable::new(vec![
            MerchantPattern::new("store b", "Store B", 0.9),
            MerchantPattern::new("store a", "Store A", 0.9),
        ])
        .unwrap();
        let r = table.resolve("store a ... later store b");
        assert_eq!(r.name, "Store A");
    }

    #[test]
    fn higher_weight_wins_over_earlier_position() {
        let table = MerchantTable::new(vec![
            MerchantPattern::new("store a", "Store A", 0.5),
            MerchantPattern::new("store b", "Store B", 0.9),
        ])
        .unwrap();
        let r = table.resolve("store a ... later store b");
        assert_eq!(r.name, "Store B");
    }

    #[test]
    fn default_table_has_at_least_40_entries() {
        assert!(DEFAULT_MERCHANTS.len() >= 40);
    }

    #[test]
    fn from_toml_parses_override_table() {
        let toml_text = r#"
            [[merchant]]
            pattern = "acme"
            canonical_name = "Acme Corp"
            weight = 0.8
        "#;
        let table = MerchantTable::from_toml(toml_text).unwrap();
        let r = table.resolve("ACME WAREHOUSE\nTotal $1.00");
        assert_eq!(r.name, "Acme Corp");
    }

    #[test]
    fn from_toml_rejects_invalid_document() {
        assert!(MerchantTable::from_toml("not valid toml [[[").is_err());
    }
}
