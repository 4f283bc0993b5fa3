use thiserror::Error;
use tracing::warn;

use crate::table::Table;

/// Common spellings, checked case-sensitively before any heuristic runs.
const NAME_HEADERS: &[&str] = &[
    "product_name",
    "productName",
    "product",
    "name",
    "product name",
    "item",
    "description",
    "Product",
    "Product Name",
    "PRODUCT_NAME",
];

const BRAND_HEADERS: &[&str] = &[
    "brand_name",
    "brandName",
    "brand",
    "company",
    "manufacturer",
    "Brand",
    "Brand Name",
    "BRAND_NAME",
];

/// Average cell length above which a column looks like descriptive text.
const TEXTY_AVG_LEN: f64 = 5.0;

#[derive(Debug, Error)]
pub enum ColumnError {
    // Fatal: matching against the wrong column silently corrupts the
    // partition.
    #[error("could not locate a product-name column (headers: {headers:?})")]
    NoNameColumn { headers: Vec<String> },
}

/// Locate the product-name column in a claimed-products list: exact
/// spellings, then the column whose cells are longest on average, then the
/// last column. Both fallbacks are logged.
pub fn claimed_name_column(table: &Table) -> Result<usize, ColumnError> {
    if let Some(idx) = find_exact(&table.headers, NAME_HEADERS) {
        return Ok(idx);
    }
    for idx in 0..table.headers.len() {
        if average_len(table, idx) > TEXTY_AVG_LEN {
            warn!(
                column = %table.headers[idx],
                "no known product-name header; using longest-content column"
            );
            return Ok(idx);
        }
    }
    if let Some(idx) = table.headers.len().checked_sub(1) {
        warn!(
            column = %table.headers[idx],
            "no known product-name header; falling back to last column"
        );
        return Ok(idx);
    }
    Err(ColumnError::NoNameColumn {
        headers: table.headers.clone(),
    })
}

/// Brand column in a claimed-products list. Optional: exact spellings only.
pub fn claimed_brand_column(table: &Table) -> Option<usize> {
    find_exact(&table.headers, BRAND_HEADERS)
}

/// Product-name column in the candidate table: exact spellings, then any
/// header mentioning product or name.
pub fn candidate_name_column(table: &Table) -> Result<usize, ColumnError> {
    if let Some(idx) = find_exact(&table.headers, NAME_HEADERS) {
        return Ok(idx);
    }
    if let Some(idx) = find_containing(&table.headers, &["product", "name"]) {
        warn!(column = %table.headers[idx], "using fuzzy product-name column in candidates");
        return Ok(idx);
    }
    Err(ColumnError::NoNameColumn {
        headers: table.headers.clone(),
    })
}

/// Brand column in the candidate table, if any.
pub fn candidate_brand_column(table: &Table) -> Option<usize> {
    if let Some(idx) = find_exact(&table.headers, BRAND_HEADERS) {
        return Some(idx);
    }
    let idx = find_containing(&table.headers, &["brand"])?;
    warn!(column = %table.headers[idx], "using fuzzy brand column in candidates");
    Some(idx)
}

fn find_exact(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c))
}

fn find_containing(headers: &[String], needles: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let lower = h.to_lowercase();
        needles.iter().any(|n| lower.contains(n))
    })
}

fn average_len(table: &Table, col: usize) -> f64 {
    if table.is_empty() {
        return 0.0;
    }
    let total: usize = table.column(col).map(|v| v.trim().chars().count()).sum();
    total as f64 / table.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn exact_header_wins() {
        let t = table(&["id", "Product Name"], &[&["1", "Face Wash"]]);
        assert_eq!(claimed_name_column(&t).unwrap(), 1);
    }

    #[test]
    fn exact_check_is_case_sensitive() {
        // "NAME" is not in the spelling list; content length decides instead.
        let t = table(
            &["NAME", "code"],
            &[&["Hydrating Vitamin C Serum", "17"], &["Retinol Night Cream", "8"]],
        );
        assert_eq!(claimed_name_column(&t).unwrap(), 0);
    }

    #[test]
    fn length_heuristic_picks_descriptive_column() {
        let t = table(
            &["sku", "label"],
            &[
                &["a1", "Hydrating Vitamin C Serum"],
                &["b2", "Retinol Night Repair"],
            ],
        );
        assert_eq!(claimed_name_column(&t).unwrap(), 1);
    }

    #[test]
    fn last_column_fallback() {
        let t = table(&["a", "b"], &[&["1", "2"]]);
        assert_eq!(claimed_name_column(&t).unwrap(), 1);
    }

    #[test]
    fn brand_column_is_optional() {
        let t = table(&["sku", "label"], &[]);
        assert!(claimed_brand_column(&t).is_none());
        let t = table(&["Brand", "label"], &[]);
        assert_eq!(claimed_brand_column(&t), Some(0));
    }

    #[test]
    fn candidate_fuzzy_name() {
        let t = table(&["sku", "Item Product Title"], &[]);
        assert_eq!(candidate_name_column(&t).unwrap(), 1);
    }

    #[test]
    fn candidate_name_failure_is_fatal() {
        let t = table(&["sku", "price"], &[]);
        let err = candidate_name_column(&t).unwrap_err();
        assert!(matches!(err, ColumnError::NoNameColumn { .. }));
    }
}
