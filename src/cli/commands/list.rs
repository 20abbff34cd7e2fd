//! List command - show stored cache entries

use crate::cli::args::{ListArgs, OutputFormat};
use crate::cli::commands::JobContext;
use crate::error::SlotCacheResult;
use crate::store::{CacheStore, StoreEntry};
use console::style;

/// Execute the list command
pub async fn execute(args: ListArgs, ctx: &JobContext) -> SlotCacheResult<()> {
    let store = ctx.store();
    let entries = store.list().await?;

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => println!("No cache entries found."),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn print_table(entries: &[StoreEntry]) {
    println!(
        "{:<72} {:>10} {:<17} {:<17}",
        style("KEY").bold(),
        style("SIZE").bold(),
        style("CREATED").bold(),
        style("LAST USED").bold()
    );
    println!("{}", "-".repeat(119));

    for entry in entries {
        println!(
            "{:<72} {:>10} {:<17} {:<17}",
            entry.key,
            format_bytes(entry.size_bytes),
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.last_accessed_at.format("%Y-%m-%d %H:%M")
        );
    }

    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    println!();
    println!("Total: {} entries, {}", entries.len(), format_bytes(total));
}

fn print_json(entries: &[StoreEntry]) -> SlotCacheResult<()> {
    println!("{}", serde_json::to_string_pretty(entries)?);
    Ok(())
}

fn print_plain(entries: &[StoreEntry]) {
    for entry in entries {
        println!("{}", entry.key);
    }
}
