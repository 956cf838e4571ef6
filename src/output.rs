use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::category::join_categories;

pub const HEADER: [&str; 2] = ["domain", "categories"];

#[derive(Debug, Serialize)]
struct CategoryRow<'a> {
    domain: &'a str,
    categories: String,
}

/// Creates the output file with its header row. Returns whether it was created.
pub fn ensure_output(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output file {:?}", path))?;
    writer.write_record(HEADER)?;
    writer.flush()?;

    info!(action = "create", component = "output", path = ?path, "Created output file");
    Ok(true)
}

fn reader_for(path: &Path) -> Result<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open output file {:?}", path))
}

/// Domains already recorded: the first field of every row after the header.
pub fn load_done_domains(path: &Path) -> Result<HashSet<String>> {
    let mut done = HashSet::new();
    for record in reader_for(path)?.records() {
        let record = record.with_context(|| format!("Malformed row in {:?}", path))?;
        if let Some(domain) = record.get(0) {
            let domain = domain.trim();
            if !domain.is_empty() {
                done.insert(domain.to_string());
            }
        }
    }
    Ok(done)
}

/// Appends one row per categorized domain, flushing after every row.
pub struct CategoryWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CategoryWriter {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {:?} for appending", path))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    /// Writes `domain` with its pipe-delimited categories and returns the
    /// category field as written.
    pub fn append(&mut self, domain: &str, categories: &[String]) -> Result<String> {
        let row = CategoryRow {
            domain,
            categories: join_categories(categories),
        };
        self.writer
            .serialize(&row)
            .with_context(|| format!("Failed to write row for {} to {:?}", domain, self.path))?;
        self.writer.flush()?;
        Ok(row.categories)
    }
}

/// Reads the output file back as `domain -> categories`. Domains are
/// lowercased and empty labels dropped. Extra fields left by rows written
/// without quoting are folded back into the category field.
pub fn load_category_map(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let mut map = BTreeMap::new();
    for record in reader_for(path)?.records() {
        let record = record.with_context(|| format!("Malformed row in {:?}", path))?;
        let domain = match record.get(0).map(str::trim) {
            Some(domain) if !domain.is_empty() => domain.to_lowercase(),
            _ => continue,
        };

        let raw = record.iter().skip(1).collect::<Vec<_>>().join(",");
        let categories = raw
            .split('|')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect();
        map.insert(domain, categories);
    }
    Ok(map)
}

#[derive(Debug, PartialEq, Eq)]
pub struct CategorySummary {
    pub total_domains: usize,
    pub uncategorized: usize,
    /// Category label with the number of domains carrying it, most frequent first.
    pub counts: Vec<(String, usize)>,
}

pub fn summarize(map: &BTreeMap<String, Vec<String>>) -> CategorySummary {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut uncategorized = 0;
    for categories in map.values() {
        if categories.is_empty() {
            uncategorized += 1;
        }
        for category in categories {
            *counts.entry(category.as_str()).or_insert(0) += 1;
        }
    }

    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(category, count)| (category.to_string(), count))
        .collect();
    // Stable sort keeps ties in alphabetical order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    CategorySummary {
        total_domains: map.len(),
        uncategorized,
        counts,
    }
}

pub fn print_summary(path: &Path, summary: &CategorySummary, top: usize) {
    use crate::utils::format_number;

    println!("\n--- {} ---", path.display());
    println!(
        "Categorized domains: {}",
        format_number(summary.total_domains)
    );
    println!(
        "Domains without a category: {}",
        format_number(summary.uncategorized)
    );

    println!(
        "\nTop {} categories:",
        std::cmp::min(top, summary.counts.len())
    );
    for (category, count) in summary.counts.iter().take(top) {
        println!("- {}: {} domains", category, format_number(*count));
    }
}
