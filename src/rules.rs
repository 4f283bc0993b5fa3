use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

/// Built-in rule set, compiled into the binary. `--rules <file>` replaces it
/// wholesale for per-site or per-locale variants.
const DEFAULT_RULES: &str = include_str!("../rules/default.json");

#[derive(Debug, Clone, Deserialize)]
pub struct RuleSet {
    pub version: u32,
    pub bundle: BundleRules,
    pub facets: FacetRules,
    pub reconcile: ReconcileRules,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleRules {
    /// Whole-word indicators of multi-item listings ("combo", "twin", ...).
    pub keywords: Vec<String>,
    /// Units accepted in size measurements ("ml", "g", ...).
    pub size_units: Vec<String>,
}

/// One named facet value and the keywords that vote for it.
/// Family order is significant: matches are reported in declaration order.
#[derive(Debug, Clone, Deserialize)]
pub struct Family {
    pub label: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacetRules {
    /// Chars of context inspected on each side of a suitability keyword.
    pub context_window: usize,
    /// Chars of context inspected around a body-part keyword.
    pub usage_window: usize,
    /// Chars scanned after a country indicator.
    pub country_window: usize,
    pub categories: Vec<Family>,
    pub body_parts: Vec<Family>,
    pub functions: Vec<Family>,
    pub baby_keywords: Vec<String>,
    pub suitability: SuitabilityRules,
    pub country: CountryRules,
    pub usage_indicators: Vec<String>,
    pub non_usage_indicators: Vec<String>,
    pub cleansing_indicators: Vec<String>,
}

/// Context-sensitive yes/no facet ("is this for eczema"). The tie-break is
/// ordered: positive framing wins over negative, and anything still
/// ambiguous falls through to "No".
#[derive(Debug, Clone, Deserialize)]
pub struct SuitabilityRules {
    pub keywords: Vec<String>,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub condition_terms: Vec<String>,
    pub symptom_terms: Vec<String>,
    pub treatment_terms: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryRules {
    pub indicators: Vec<String>,
    pub countries: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileRules {
    /// Claimed names at or below this length never match (too generic).
    pub min_claim_len: usize,
}

impl RuleSet {
    pub fn builtin() -> Result<Self> {
        parse(DEFAULT_RULES).context("built-in rule set is invalid")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read rules file {:?}", path))?;
        parse(&raw).with_context(|| format!("invalid rules file {:?}", path))
    }

    /// Load the rule set for a run: the given file if any, else the built-in.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::builtin(),
        }
    }
}

fn parse(raw: &str) -> Result<RuleSet> {
    let rules: RuleSet = serde_json::from_str(raw)?;
    ensure!(rules.version >= 1, "unsupported rules version {}", rules.version);
    ensure!(!rules.bundle.keywords.is_empty(), "bundle keyword list is empty");
    ensure!(!rules.bundle.size_units.is_empty(), "size unit list is empty");
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_parse() {
        let rules = RuleSet::builtin().unwrap();
        assert_eq!(rules.version, 1);
        assert!(rules.bundle.keywords.iter().any(|k| k == "combo"));
        assert!(rules.bundle.keywords.iter().any(|k| k == "refill"));
        assert_eq!(rules.reconcile.min_claim_len, 3);
    }

    #[test]
    fn family_order_preserved() {
        let rules = RuleSet::builtin().unwrap();
        // Body parts report in declaration order; face is declared first.
        assert_eq!(rules.facets.body_parts[0].label, "face");
        assert_eq!(rules.facets.categories[0].label, "cleanser");
    }

    #[test]
    fn version_zero_rejected() {
        let raw = DEFAULT_RULES.replacen("\"version\": 1", "\"version\": 0", 1);
        assert!(parse(&raw).is_err());
    }
}
