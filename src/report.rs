use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use itertools::Itertools;

use crate::table::Table;

/// Inputs for the human-readable filter summary.
pub struct FilterSummary<'a> {
    pub candidates_file: &'a Path,
    pub claimed_file: &'a Path,
    pub total: usize,
    pub remaining: usize,
    pub removed: usize,
    pub removed_by_brand: Vec<(String, usize)>,
    pub outputs: Vec<String>,
}

/// Count removed rows per brand, most-removed first, ties alphabetical.
pub fn brand_breakdown(removed: &Table, brand_col: Option<usize>) -> Vec<(String, usize)> {
    let Some(col) = brand_col else {
        return Vec::new();
    };
    removed
        .column(col)
        .map(|b| {
            let b = b.trim();
            if b.is_empty() {
                "N/A".to_string()
            } else {
                b.to_string()
            }
        })
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect()
}

pub fn write_summary(path: &Path, summary: &FilterSummary) -> Result<()> {
    let mut out = String::new();
    let _ = writeln!(out, "Product Filtering Summary");
    let _ = writeln!(out, "=========================");
    let _ = writeln!(out, "Date: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out);
    let _ = writeln!(out, "Input files:");
    let _ = writeln!(
        out,
        "- {}: {} products",
        summary.candidates_file.display(),
        summary.total
    );
    let _ = writeln!(out, "- {}", summary.claimed_file.display());
    let _ = writeln!(out);
    let _ = writeln!(out, "Results:");
    let _ = writeln!(out, "- Products remaining: {}", summary.remaining);
    let _ = writeln!(out, "- Products removed: {}", summary.removed);

    if !summary.removed_by_brand.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Removed products by brand:");
        for (brand, count) in &summary.removed_by_brand {
            let _ = writeln!(out, "  {}: {}", brand, count);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Output files:");
    for file in &summary.outputs {
        let _ = writeln!(out, "- {}", file);
    }

    fs::write(path, out).with_context(|| format!("failed to write summary {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakdown_sorted_by_count_then_name() {
        let removed = Table::new(
            vec!["brand".into(), "product".into()],
            vec![
                vec!["Zeta".into(), "A".into()],
                vec!["Acme".into(), "B".into()],
                vec!["Zeta".into(), "C".into()],
                vec!["Blue".into(), "D".into()],
            ],
        );
        let breakdown = brand_breakdown(&removed, Some(0));
        assert_eq!(
            breakdown,
            vec![
                ("Zeta".to_string(), 2),
                ("Acme".to_string(), 1),
                ("Blue".to_string(), 1),
            ]
        );
    }

    #[test]
    fn breakdown_without_brand_column_is_empty() {
        let removed = Table::new(vec!["product".into()], vec![vec!["A".into()]]);
        assert!(brand_breakdown(&removed, None).is_empty());
    }

    #[test]
    fn summary_contains_counts_and_brands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filter_summary.txt");
        let summary = FilterSummary {
            candidates_file: Path::new("products.csv"),
            claimed_file: Path::new("brandlist.csv"),
            total: 3,
            remaining: 2,
            removed: 1,
            removed_by_brand: vec![("Acme".into(), 1)],
            outputs: vec!["products_remaining_sorted.csv".into()],
        };
        write_summary(&path, &summary).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("Products remaining: 2"));
        assert!(text.contains("Products removed: 1"));
        assert!(text.contains("  Acme: 1"));
        assert!(text.contains("products_remaining_sorted.csv"));
    }
}
