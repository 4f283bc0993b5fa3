pub mod columns;

use std::collections::HashSet;

use crate::rules::ReconcileRules;
use crate::table::Table;

/// Status values for the combined output. Fixed strings; spreadsheet
/// filters key off them.
pub const STATUS_HEADER: &str = "Status";
pub const STATUS_TAKEN: &str = "Already Taken";
pub const STATUS_NOT_TAKEN: &str = "Not Taken";

/// Normalized claimed names and brands extracted from a claimed-products
/// table.
#[derive(Debug, Clone)]
pub struct ClaimedList {
    names: Vec<String>,
    brands: HashSet<String>,
}

impl ClaimedList {
    pub fn from_table(table: &Table, name_col: usize, brand_col: Option<usize>) -> Self {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for value in table.column(name_col) {
            let name = normalize(value);
            if !name.is_empty() && seen.insert(name.clone()) {
                names.push(name);
            }
        }
        let brands = brand_col
            .map(|col| {
                table
                    .column(col)
                    .map(normalize)
                    .filter(|b| !b.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        ClaimedList { names, brands }
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    pub fn brand_count(&self) -> usize {
        self.brands.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    /// Exact brand equality also marks a candidate claimed.
    pub by_brand: bool,
    /// Claimed names at or below this length never match.
    pub min_claim_len: usize,
}

impl MatchOptions {
    pub fn from_rules(rules: &ReconcileRules, by_brand: bool) -> Self {
        MatchOptions {
            by_brand,
            min_claim_len: rules.min_claim_len,
        }
    }
}

/// Strict disjoint split of the candidate table.
#[derive(Debug, Clone)]
pub struct Partition {
    pub remaining: Table,
    pub removed: Table,
}

/// A candidate is claimed when some claimed name contains, or is contained
/// in, the candidate name (both normalized) and the claimed name is longer
/// than `min_claim_len`, or, with `by_brand`, when the brands match
/// exactly. Partial-name matches require scanning every claimed entry.
pub fn is_claimed(name: &str, brand: &str, claimed: &ClaimedList, opts: MatchOptions) -> bool {
    let name = normalize(name);
    let brand = normalize(brand);

    if opts.by_brand && !brand.is_empty() && claimed.brands.contains(&brand) {
        return true;
    }
    if name.is_empty() {
        return false;
    }
    claimed.names.iter().any(|taken| {
        taken.chars().count() > opts.min_claim_len
            && (name.contains(taken.as_str()) || taken.contains(name.as_str()))
    })
}

/// Partition candidates into (remaining, removed). Every input row lands in
/// exactly one side; inputs are not mutated and order is preserved.
pub fn partition(
    candidates: &Table,
    claimed: &ClaimedList,
    name_col: usize,
    brand_col: Option<usize>,
    opts: MatchOptions,
) -> Partition {
    let mut remaining = Vec::new();
    let mut removed = Vec::new();
    for row in &candidates.rows {
        let name = candidates.cell(row, name_col);
        let brand = brand_col.map(|c| candidates.cell(row, c)).unwrap_or_default();
        if is_claimed(name, brand, claimed, opts) {
            removed.push(row.clone());
        } else {
            remaining.push(row.clone());
        }
    }
    Partition {
        remaining: Table::new(candidates.headers.clone(), remaining),
        removed: Table::new(candidates.headers.clone(), removed),
    }
}

/// Stable multi-key ascending sort by brand then name, case-insensitive.
/// Unknown values ("N/A" or blank) collate after every real value.
pub fn sort_rows(table: &mut Table, brand_col: Option<usize>, name_col: usize) {
    table.rows.sort_by(|a, b| {
        let key = |row: &Vec<String>| {
            let brand = brand_col
                .map(|c| sort_key(row.get(c).map(String::as_str).unwrap_or_default()))
                .unwrap_or_default();
            let name = sort_key(row.get(name_col).map(String::as_str).unwrap_or_default());
            (brand, name)
        };
        key(a).cmp(&key(b))
    });
}

fn sort_key(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
        // Collates after any real value.
        char::MAX.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// One table with a leading status column: removed rows first, then
/// remaining, ready for a final sort.
pub fn combined(partition: &Partition) -> Table {
    let mut headers = Vec::with_capacity(partition.remaining.headers.len() + 1);
    headers.push(STATUS_HEADER.to_string());
    headers.extend(partition.remaining.headers.iter().cloned());

    let mut rows = Vec::with_capacity(partition.removed.len() + partition.remaining.len());
    for row in &partition.removed.rows {
        rows.push(with_status(row, STATUS_TAKEN));
    }
    for row in &partition.remaining.rows {
        rows.push(with_status(row, STATUS_NOT_TAKEN));
    }
    Table::new(headers, rows)
}

fn with_status(row: &[String], status: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(row.len() + 1);
    out.push(status.to_string());
    out.extend(row.iter().cloned());
    out
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
