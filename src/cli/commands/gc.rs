//! Gc command - remove entries idle past the retention window

use crate::cli::args::GcArgs;
use crate::cli::commands::list::format_bytes;
use crate::cli::commands::JobContext;
use crate::error::SlotCacheResult;
use chrono::Utc;
use console::style;

/// Execute the gc command
pub async fn execute(args: GcArgs, ctx: &JobContext) -> SlotCacheResult<()> {
    let days = args.days.unwrap_or(ctx.config.store.retention_days);

    if days == 0 {
        println!("Cache GC is disabled (retention_days = 0)");
        return Ok(());
    }

    let store = ctx.store();
    let removed = store.prune(days, args.dry_run).await?;

    if removed.is_empty() {
        println!("No entries idle for more than {} days.", days);
        return Ok(());
    }

    let verb = if args.dry_run { "Would remove" } else { "Removed" };
    println!("{} {} entry(ies) idle for more than {} days:", verb, removed.len(), days);

    for entry in &removed {
        let idle_days = (Utc::now() - entry.last_accessed_at).num_days();
        println!(
            "  {} {} ({}, idle {} days)",
            style("•").red(),
            entry.key,
            format_bytes(entry.size_bytes),
            idle_days
        );
    }

    if args.dry_run {
        println!();
        println!("Dry run - no entries removed.");
    }

    Ok(())
}
