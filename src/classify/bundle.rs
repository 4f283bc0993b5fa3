use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::rules::BundleRules;

static MULTIPACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\s*x\s*\d+").unwrap());
// Name separators are normalized to spaces first, so "2-in-1" arrives as "2 in 1".
static N_IN_1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\s*in\s*1\b").unwrap());

/// Detects listings that describe more than one purchasable unit.
/// Any single positive signal classifies the item as a bundle; false
/// positives are accepted, missed bundles are not.
pub struct BundleDetector {
    keywords: HashSet<String>,
    size_re: Regex,
}

impl BundleDetector {
    pub fn new(rules: &BundleRules) -> Result<Self> {
        let units = rules
            .size_units
            .iter()
            .map(|u| regex::escape(u))
            .collect::<Vec<_>>()
            .join("|");
        let size_re = Regex::new(&format!(r"\b(\d+(?:\.\d+)?)\s*({})\b", units))?;
        let keywords = rules.keywords.iter().map(|k| k.to_lowercase()).collect();
        Ok(BundleDetector { keywords, size_re })
    }

    /// True when the listing is a multi-item bundle and should be rejected.
    /// An unknown name ("N/A" or empty) contributes no signal; the URL can
    /// still flag the item on its own.
    pub fn is_bundle(&self, name: &str, url: &str) -> bool {
        let normalized = normalize_name(name);
        if !normalized.is_empty() && normalized != "n/a" {
            if self.name_has_keyword(&normalized)
                || self.has_repeated_sizes(&normalized)
                || MULTIPACK_RE.is_match(&normalized)
                || N_IN_1_RE.is_match(&normalized)
            {
                return true;
            }
        }
        self.url_has_keyword(url)
    }

    fn name_has_keyword(&self, normalized: &str) -> bool {
        normalized
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .any(|t| self.keywords.contains(t))
    }

    /// Two or more distinct `number+unit` measurements in one name describe
    /// multiple physical items ("473ml 454g", "100ml 200ml").
    fn has_repeated_sizes(&self, normalized: &str) -> bool {
        let mut seen = HashSet::new();
        for cap in self.size_re.captures_iter(normalized) {
            seen.insert((cap[1].to_string(), cap[2].to_string()));
            if seen.len() >= 2 {
                return true;
            }
        }
        false
    }

    fn url_has_keyword(&self, url: &str) -> bool {
        url.to_lowercase()
            .split(['/', '-', '_', '.', '?', '=', '&'])
            .any(|t| self.keywords.contains(t))
    }
}

/// Lowercase and replace the separators sellers use interchangeably with
/// spaces, so "Twin-Pack" and "Twin Pack" tokenize the same way.
fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(['-', '+', '&'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;

    fn detector() -> BundleDetector {
        BundleDetector::new(&RuleSet::builtin().unwrap().bundle).unwrap()
    }

    #[test]
    fn keyword_in_name() {
        let d = detector();
        assert!(d.is_bundle("Moisture Trio Set", ""));
        assert!(d.is_bundle("Shampoo & Conditioner Combo", ""));
        assert!(d.is_bundle("Advent Calendar 2024", ""));
        assert!(d.is_bundle("Hand Cream Refill", ""));
    }

    #[test]
    fn keyword_must_be_whole_word() {
        let d = detector();
        // "kit" inside "kitten", "set" inside "setting" must not match.
        assert!(!d.is_bundle("Kitten Soft Cleanser", ""));
        assert!(!d.is_bundle("Makeup Setting Spray", ""));
    }

    #[test]
    fn separators_normalized() {
        let d = detector();
        assert!(d.is_bundle("Twin-Pack Cleanser", ""));
        assert!(d.is_bundle("Day+Night Duo", ""));
    }

    #[test]
    fn repeated_sizes() {
        let d = detector();
        assert!(d.is_bundle("Cleanser 100ml 200ml", ""));
        assert!(d.is_bundle("Body Lotion 473ml 454g", ""));
        assert!(!d.is_bundle("Hydrating Face Serum 50ml", ""));
    }

    #[test]
    fn quantity_multiplier() {
        let d = detector();
        assert!(d.is_bundle("Bar Soap 3 x 90g", ""));
        assert!(d.is_bundle("Wipes 2x80 sheets", ""));
    }

    #[test]
    fn n_in_1_pattern() {
        let d = detector();
        assert!(d.is_bundle("2-in-1 Shampoo", ""));
        assert!(d.is_bundle("5 in 1 Treatment", ""));
    }

    #[test]
    fn plain_single_items_pass() {
        let d = detector();
        assert!(!d.is_bundle("Gentle Face Wash", ""));
        assert!(!d.is_bundle("Vitamin C Brightening Serum 30ml", ""));
    }

    #[test]
    fn unknown_name_is_not_a_bundle() {
        let d = detector();
        assert!(!d.is_bundle("N/A", ""));
        assert!(!d.is_bundle("", ""));
    }

    #[test]
    fn url_token_flags_bundle() {
        let d = detector();
        assert!(d.is_bundle(
            "N/A",
            "https://example.com/gift-set-hydration/p/BP_1001"
        ));
        assert!(!d.is_bundle(
            "N/A",
            "https://example.com/sunset-glow-toner/p/BP_1002"
        ));
    }

    #[test]
    fn decision_is_stable() {
        let d = detector();
        let name = "Moisture Trio Set";
        assert_eq!(d.is_bundle(name, ""), d.is_bundle(name, ""));
    }
}
