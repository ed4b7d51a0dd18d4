//! Dataset validation command.

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tunedeck_data::{DatasetRecord, DatasetStats, DatasetStatus, DatasetStore};

#[derive(Serialize)]
struct JsonOutput<'a> {
    name: &'a str,
    media_type: &'a str,
    size: u64,
    status: DatasetStatus,
    valid: bool,
    examples: usize,
    error: Option<&'a str>,
    stats: Option<DatasetStats>,
}

/// Validate one dataset file. Exits with status 1 if it is rejected.
pub async fn execute(file: &Path, json: bool) -> anyhow::Result<()> {
    let store = DatasetStore::new();
    let record = store
        .process_path(file)
        .await
        .with_context(|| format!("Failed to read dataset {}", file.display()))?;
    let stats = store.stats(&record.id).await;

    if json {
        let out = JsonOutput {
            name: &record.name,
            media_type: &record.media_type,
            size: record.size,
            status: record.status,
            valid: record.is_ready(),
            examples: record.example_count(),
            error: record.error.as_deref(),
            stats,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        output_human(&record, stats);
    }

    if !record.is_ready() {
        std::process::exit(1);
    }
    Ok(())
}

fn output_human(record: &DatasetRecord, stats: Option<DatasetStats>) {
    println!("{}", "tunedeck validate".bold().cyan());
    println!();
    println!("  File:     {}", record.name);
    println!("  Type:     {}", record.media_type.dimmed());
    println!("  Size:     {} bytes", record.size);

    if let Some(error) = &record.error {
        println!("  Status:   {}", "✗ invalid".red().bold());
        println!("  Error:    {}", error.red());
        return;
    }

    println!("  Status:   {}", "✓ valid".green().bold());
    println!("  Examples: {}", record.example_count());
    match stats {
        Some(DatasetStats::Text { lines, characters, words }) => {
            println!("  Text:     {lines} lines, {words} words, {characters} characters");
        }
        Some(DatasetStats::Structured { records, fields }) => {
            println!("  Records:  {records} records, {fields} fields");
        }
        None => {}
    }
}
