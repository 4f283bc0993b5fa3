pub mod bundle;
pub mod facets;

use anyhow::Result;

use crate::catalog::{ProductRecord, RawCapture};
use crate::rules::RuleSet;
use bundle::BundleDetector;
use facets::FacetSet;

/// Owns the compiled rule set for one run. Stateless across calls; batches
/// may classify in parallel.
pub struct Classifier {
    detector: BundleDetector,
    rules: RuleSet,
}

impl Classifier {
    pub fn new(rules: RuleSet) -> Result<Self> {
        let detector = BundleDetector::new(&rules.bundle)?;
        Ok(Classifier { detector, rules })
    }

    pub fn is_bundle(&self, name: &str, url: &str) -> bool {
        self.detector.is_bundle(name, url)
    }

    pub fn facets(&self, name: &str, page_text: &str) -> FacetSet {
        facets::extract(&self.rules.facets, name, page_text)
    }

    /// Classify one capture into a catalog record, or None for a bundle
    /// (bundles are discarded, never persisted).
    pub fn classify(&self, capture: &RawCapture) -> Option<ProductRecord> {
        let name = or_unknown(&capture.name);
        let brand = or_unknown(&capture.brand);

        if self.is_bundle(&name, &capture.url) {
            return None;
        }

        let f = self.facets(&name, &capture.page_text);
        Some(ProductRecord {
            brand,
            name,
            category_type: f.category_type,
            body_parts: f.body_parts,
            function: f.function,
            baby: f.baby,
            eczema: f.eczema,
            country: f.country,
            ingredient: f.ingredient,
            url: capture.url.clone(),
        })
    }
}

fn or_unknown(field: &str) -> String {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        facets::UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(RuleSet::builtin().unwrap()).unwrap()
    }

    fn capture(name: &str, url: &str, text: &str) -> RawCapture {
        RawCapture {
            brand: "Acme".into(),
            name: name.into(),
            page_text: text.into(),
            url: url.into(),
        }
    }

    #[test]
    fn bundle_is_discarded() {
        let c = classifier();
        assert!(c
            .classify(&capture("Moisture Trio Set", "https://x/p/1", ""))
            .is_none());
    }

    #[test]
    fn single_item_becomes_record() {
        let c = classifier();
        let record = c
            .classify(&capture(
                "Gentle Face Wash",
                "https://x/p/2",
                "A gentle cleanser for your face.",
            ))
            .unwrap();
        assert_eq!(record.name, "Gentle Face Wash");
        assert_eq!(record.category_type, "cleanser");
        assert_eq!(record.url, "https://x/p/2");
    }

    #[test]
    fn empty_name_becomes_sentinel() {
        let c = classifier();
        let record = c.classify(&capture("", "https://x/p/3", "")).unwrap();
        assert_eq!(record.name, "N/A");
    }
}
