use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Canonical catalog column order. Order-sensitive for interop; the URL is
/// always last and is the de-duplication key.
pub const COLUMNS: [&str; 10] = [
    "brandName",
    "productName",
    "categoryType",
    "bodyParts",
    "productFunction",
    "babyProduct",
    "eczemaProduct",
    "country",
    "productIngredient",
    "productURL",
];

/// One classified, persisted product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "brandName")]
    pub brand: String,
    #[serde(rename = "productName")]
    pub name: String,
    #[serde(rename = "categoryType")]
    pub category_type: String,
    #[serde(rename = "bodyParts")]
    pub body_parts: String,
    #[serde(rename = "productFunction")]
    pub function: String,
    #[serde(rename = "babyProduct")]
    pub baby: String,
    #[serde(rename = "eczemaProduct")]
    pub eczema: String,
    #[serde(rename = "country")]
    pub country: String,
    #[serde(rename = "productIngredient")]
    pub ingredient: String,
    #[serde(rename = "productURL")]
    pub url: String,
}

/// One raw page capture handed over by the page-fetching layer.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub brand: String,
    pub name: String,
    pub page_text: String,
    pub url: String,
}

/// URLs already present in the catalog. Missing file means a fresh catalog.
pub fn existing_urls(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open catalog {:?}", path))?;
    let headers = reader.headers()?.clone();
    // The URL column is last by convention; honor the header when present.
    let url_idx = headers
        .iter()
        .position(|h| h.trim() == "productURL")
        .unwrap_or_else(|| headers.len().saturating_sub(1));

    let mut urls = HashSet::new();
    for record in reader.records() {
        let record = record?;
        if let Some(url) = record.get(url_idx) {
            let url = url.trim();
            if !url.is_empty() {
                urls.insert(url.to_string());
            }
        }
    }
    Ok(urls)
}

/// Append records, writing the header only when the file is created.
pub fn append_records(path: &Path, records: &[ProductRecord]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    let new_file = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open catalog {:?} for append", path))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if new_file {
        writer.write_record(COLUMNS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_records(path: &Path) -> Result<Vec<ProductRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open catalog {:?}", path))?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: ProductRecord = row?;
        records.push(record);
    }
    Ok(records)
}

/// Read raw captures. The capture file is produced by our own fetch layer,
/// so its headers are fixed and a missing column is an error.
pub fn read_captures(path: &Path) -> Result<Vec<RawCapture>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open captures {:?}", path))?;
    let headers = reader.headers()?.clone();
    let col = |name: &str| -> Result<usize> {
        match headers.iter().position(|h| h.trim() == name) {
            Some(idx) => Ok(idx),
            None => bail!("captures file {:?} has no {:?} column", path, name),
        }
    };
    let brand_idx = col("brandName")?;
    let name_idx = col("productName")?;
    let text_idx = col("pageText")?;
    let url_idx = col("productURL")?;

    let mut captures = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        captures.push(RawCapture {
            brand: field(brand_idx),
            name: field(name_idx),
            page_text: field(text_idx),
            url: field(url_idx).trim().to_string(),
        });
    }
    Ok(captures)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, url: &str) -> ProductRecord {
        ProductRecord {
            brand: "Acme".into(),
            name: name.into(),
            category_type: "cleanser".into(),
            body_parts: "face".into(),
            function: "cleansing".into(),
            baby: "No".into(),
            eczema: "No".into(),
            country: "Not specified".into(),
            ingredient: "N/A".into(),
            url: url.into(),
        }
    }

    #[test]
    fn append_then_read_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.csv");

        append_records(&path, &[record("Face Wash", "https://x/p/1")]).unwrap();
        append_records(&path, &[record("Toner", "https://x/p/2")]).unwrap();

        let urls = existing_urls(&path).unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls.contains("https://x/p/1"));
        assert!(urls.contains("https://x/p/2"));

        // Header must appear exactly once.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.matches("brandName").count(), 1);
    }

    #[test]
    fn missing_catalog_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let urls = existing_urls(&dir.path().join("absent.csv")).unwrap();
        assert!(urls.is_empty());
    }

    #[test]
    fn records_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.csv");
        append_records(&path, &[record("Face Wash", "https://x/p/1")]).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Face Wash");
        assert_eq!(records[0].url, "https://x/p/1");
    }

    #[test]
    fn captures_require_fixed_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captures.csv");
        std::fs::write(&path, "brandName,productName,productURL\nAcme,Face Wash,https://x/p/1\n")
            .unwrap();
        let err = read_captures(&path).unwrap_err();
        assert!(err.to_string().contains("pageText"));
    }

    #[test]
    fn captures_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captures.csv");
        std::fs::write(
            &path,
            "brandName,productName,pageText,productURL\nAcme,Face Wash,\"line one\nline two\",https://x/p/1\n",
        )
        .unwrap();
        let captures = read_captures(&path).unwrap();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].page_text, "line one\nline two");
    }
}
