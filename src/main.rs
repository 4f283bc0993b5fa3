mod catalog;
mod classify;
mod reconcile;
mod report;
mod rules;
mod table;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use catalog::ProductRecord;
use classify::Classifier;
use reconcile::{ClaimedList, MatchOptions};
use rules::RuleSet;

#[derive(Parser)]
#[command(
    name = "catalog_triage",
    about = "Classify scraped product captures and reconcile product catalogs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify raw page captures into a catalog CSV
    Classify {
        /// Captures CSV from the fetch layer (brandName, productName, pageText, productURL)
        #[arg(short, long)]
        input: PathBuf,
        /// Catalog CSV to append to (created if missing)
        #[arg(short, long)]
        catalog: PathBuf,
        /// Alternative rules file (JSON)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Classify a single product and print the verdict
    Check {
        /// Product name as listed
        #[arg(long)]
        name: String,
        /// Product page URL
        #[arg(long, default_value = "")]
        url: String,
        /// File holding the page's visible text
        #[arg(long)]
        page_text: Option<PathBuf>,
        /// Alternative rules file (JSON)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Remove already-claimed products from a candidate catalog
    Filter {
        /// Candidate products CSV
        #[arg(long)]
        candidates: PathBuf,
        /// Claimed products CSV (loose schema; columns are detected)
        #[arg(long)]
        claimed: PathBuf,
        /// Also remove candidates whose brand exactly matches a claimed brand
        #[arg(long)]
        by_brand: bool,
        /// Additionally write one combined file with a Status column
        #[arg(long)]
        combined: bool,
        /// Output directory (default: current directory)
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Alternative rules file (JSON)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Catalog overview: totals, brands, categories
    Stats {
        /// Catalog CSV to summarize
        #[arg(short, long)]
        catalog: PathBuf,
        /// Max rows per breakdown
        #[arg(short = 'n', long, default_value = "15")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Classify {
            input,
            catalog,
            rules,
        } => run_classify(&input, &catalog, rules.as_deref()),
        Commands::Check {
            name,
            url,
            page_text,
            rules,
        } => run_check(&name, &url, page_text.as_deref(), rules.as_deref()),
        Commands::Filter {
            candidates,
            claimed,
            by_brand,
            combined,
            out_dir,
            rules,
        } => run_filter(&candidates, &claimed, by_brand, combined, &out_dir, rules.as_deref()),
        Commands::Stats { catalog, limit } => run_stats(&catalog, limit),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn run_classify(input: &Path, catalog_path: &Path, rules_path: Option<&Path>) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let rules = RuleSet::load(rules_path)?;
    let classifier = Classifier::new(rules)?;

    let existing = catalog::existing_urls(catalog_path)?;
    let captures = catalog::read_captures(input)?;
    println!(
        "Loaded {} captures; catalog holds {} products",
        captures.len(),
        existing.len()
    );

    // The URL is the identity key: anything already in the catalog, or seen
    // earlier in this batch, is not classified again.
    let mut seen = existing;
    let mut fresh = Vec::new();
    let mut duplicates = 0usize;
    let mut missing_url = 0usize;
    for capture in captures {
        if capture.url.is_empty() {
            warn!(product = %capture.name, "capture has no URL; skipping");
            missing_url += 1;
            continue;
        }
        if !seen.insert(capture.url.clone()) {
            duplicates += 1;
            continue;
        }
        fresh.push(capture);
    }

    if fresh.is_empty() {
        println!("No new captures to classify.");
        return Ok(());
    }
    println!("Classifying {} new captures...", fresh.len());

    let pb = ProgressBar::new(fresh.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut appended = 0usize;
    let mut bundles = 0usize;
    for chunk in fresh.chunks(256) {
        let records: Vec<ProductRecord> = chunk
            .par_iter()
            .filter_map(|c| classifier.classify(c))
            .collect();
        bundles += chunk.len() - records.len();
        catalog::append_records(catalog_path, &records)?;
        appended += records.len();
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    println!(
        "Saved {} products ({} bundles skipped, {} already in catalog, {} without URL).",
        appended, bundles, duplicates, missing_url
    );
    Ok(())
}

fn run_check(
    name: &str,
    url: &str,
    page_text: Option<&Path>,
    rules_path: Option<&Path>,
) -> Result<()> {
    let rules = RuleSet::load(rules_path)?;
    let classifier = Classifier::new(rules)?;

    let text = match page_text {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read page text {:?}", path))?,
        None => String::new(),
    };

    let bundle = classifier.is_bundle(name, url);
    println!("Product:    {}", name);
    if !url.is_empty() {
        println!("URL:        {}", url);
    }
    println!("Bundle:     {}", if bundle { "yes (would be rejected)" } else { "no" });
    if bundle {
        return Ok(());
    }

    let f = classifier.facets(name, &text);
    println!("Category:   {}", f.category_type);
    println!("Body parts: {}", f.body_parts);
    println!("Function:   {}", f.function);
    println!("Baby:       {}", f.baby);
    println!("Eczema:     {}", f.eczema);
    println!("Country:    {}", f.country);
    println!("Ingredient: {}", truncate(&f.ingredient, 60));
    Ok(())
}

fn run_filter(
    candidates_path: &Path,
    claimed_path: &Path,
    by_brand: bool,
    combined: bool,
    out_dir: &Path,
    rules_path: Option<&Path>,
) -> Result<()> {
    let rules = RuleSet::load(rules_path)?;

    let candidates = table::read_table(candidates_path)?;
    let claimed_table = table::read_table(claimed_path)?;
    println!(
        "Candidates: {} rows | Claimed: {} rows",
        candidates.len(),
        claimed_table.len()
    );

    let name_col = reconcile::columns::candidate_name_column(&candidates)?;
    let brand_col = reconcile::columns::candidate_brand_column(&candidates);
    let claimed_name_col = reconcile::columns::claimed_name_column(&claimed_table)?;
    let claimed_brand_col = reconcile::columns::claimed_brand_column(&claimed_table);

    let list = ClaimedList::from_table(&claimed_table, claimed_name_col, claimed_brand_col);
    println!(
        "Claimed list: {} unique names, {} brands",
        list.name_count(),
        list.brand_count()
    );
    if by_brand && claimed_brand_col.is_none() {
        println!("Claimed file has no brand column; matching by name only.");
    }

    let opts = MatchOptions::from_rules(
        &rules.reconcile,
        by_brand && claimed_brand_col.is_some(),
    );
    let mut partition = reconcile::partition(&candidates, &list, name_col, brand_col, opts);
    println!(
        "Remaining: {} | Removed: {}",
        partition.remaining.len(),
        partition.removed.len()
    );

    reconcile::sort_rows(&mut partition.remaining, brand_col, name_col);
    reconcile::sort_rows(&mut partition.removed, brand_col, name_col);

    let stem = candidates_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("products");
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {:?}", out_dir))?;

    let mut outputs = Vec::new();
    let remaining_path = out_dir.join(format!("{}_remaining_sorted.csv", stem));
    table::write_table(&remaining_path, &partition.remaining)?;
    outputs.push(remaining_path.display().to_string());

    if !partition.removed.is_empty() {
        let removed_path = out_dir.join(format!("{}_removed_sorted.csv", stem));
        table::write_table(&removed_path, &partition.removed)?;
        outputs.push(removed_path.display().to_string());
    }

    if combined {
        let mut all = reconcile::combined(&partition);
        // The status column shifts every index right by one.
        reconcile::sort_rows(&mut all, brand_col.map(|c| c + 1), name_col + 1);
        let combined_path = out_dir.join(format!("{}_combined_sorted.csv", stem));
        table::write_table(&combined_path, &all)?;
        outputs.push(combined_path.display().to_string());
    }

    let breakdown = report::brand_breakdown(&partition.removed, brand_col);
    if !breakdown.is_empty() {
        println!("\n--- Removed by brand ---");
        for (brand, count) in breakdown.iter().take(10) {
            println!("  {:<24} {:>4}", truncate(brand, 24), count);
        }
    }

    let summary_path = out_dir.join("filter_summary.txt");
    report::write_summary(
        &summary_path,
        &report::FilterSummary {
            candidates_file: candidates_path,
            claimed_file: claimed_path,
            total: candidates.len(),
            remaining: partition.remaining.len(),
            removed: partition.removed.len(),
            removed_by_brand: breakdown,
            outputs: outputs.clone(),
        },
    )?;
    outputs.push(summary_path.display().to_string());

    println!("\nWrote:");
    for file in &outputs {
        println!("  {}", file);
    }
    Ok(())
}

fn run_stats(catalog_path: &Path, limit: usize) -> Result<()> {
    use itertools::Itertools;

    let records = catalog::read_records(catalog_path)?;
    if records.is_empty() {
        println!("Catalog is empty.");
        return Ok(());
    }

    println!("Products: {}", records.len());
    let baby = records.iter().filter(|r| r.baby == "Yes").count();
    let eczema = records.iter().filter(|r| r.eczema == "Yes").count();
    println!("Baby-suitable: {} | Eczema-suitable: {}", baby, eczema);

    let brands: Vec<(String, usize)> = records
        .iter()
        .map(|r| r.brand.trim().to_string())
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect();
    println!("\n--- Brands ({}) ---", brands.len());
    for (brand, count) in brands.iter().take(limit) {
        println!("  {:<24} {:>4}", truncate(brand, 24), count);
    }

    let categories: Vec<(String, usize)> = records
        .iter()
        .map(|r| r.category_type.trim().to_string())
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect();
    println!("\n--- Categories ({}) ---", categories.len());
    for (category, count) in categories.iter().take(limit) {
        println!("  {:<24} {:>4}", truncate(category, 24), count);
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
