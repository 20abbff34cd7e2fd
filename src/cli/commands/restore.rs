//! Restore command - restore cached artifacts at job start

use crate::cache::{CacheController, RunState, SlotRun, SlotState};
use crate::cli::args::RestoreArgs;
use crate::cli::commands::JobContext;
use crate::error::{SlotCacheError, SlotCacheResult};
use console::style;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Step outputs file exported by GitHub Actions runners
const GITHUB_OUTPUT_VAR: &str = "GITHUB_OUTPUT";

/// Execute the restore command
pub async fn execute(args: RestoreArgs, ctx: &JobContext) -> SlotCacheResult<()> {
    let slots = ctx.slots(&args.slot)?;
    let controller = CacheController::new(Box::new(ctx.store()), ctx.os.clone())?;

    let mut runs = Vec::with_capacity(slots.len());
    for slot in slots {
        let run = controller.plan_and_restore(slot).await?;
        print_outcome(&run);
        runs.push(run);
    }

    let path = ctx.run_state_path(args.state_file);
    let state = RunState::new(ctx.os.clone(), runs);
    state.save(&path).await?;
    debug!("Recorded run {} at {}", state.id, path.display());

    if let Some(output) = std::env::var_os(GITHUB_OUTPUT_VAR) {
        if let Err(e) = write_step_outputs(Path::new(&output), &state.slots) {
            warn!("Failed to write step outputs: {}", e);
        }
    }

    Ok(())
}

fn print_outcome(run: &SlotRun) {
    let (marker, detail) = match run.state {
        SlotState::Hit => (style("✓").green(), "hit".to_string()),
        SlotState::PartialHit => (
            style("~").yellow(),
            format!(
                "partial hit from {}",
                run.lookup
                    .as_ref()
                    .and_then(|l| l.matched_key())
                    .map(|k| k.to_string())
                    .unwrap_or_default()
            ),
        ),
        SlotState::Miss => (style("○").dim(), "miss".to_string()),
        SlotState::Disabled => (
            style("!").red(),
            format!(
                "disabled: {}",
                run.disabled_reason.as_deref().unwrap_or("unknown")
            ),
        ),
        other => (style("?").dim(), other.to_string()),
    };

    let key = run.key.as_ref().map(|k| k.to_string()).unwrap_or_default();
    println!("  {} {} {} [{}]", marker, run.slot.name, key, detail);
}

/// Append `<slot>-cache-hit=<bool>` lines for later workflow steps
pub fn write_step_outputs(path: &Path, runs: &[SlotRun]) -> SlotCacheResult<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SlotCacheError::io(format!("opening {}", path.display()), e))?;

    for run in runs {
        writeln!(file, "{}-cache-hit={}", run.slot.name, run.is_exact_hit())
            .map_err(|e| SlotCacheError::io(format!("writing {}", path.display()), e))?;
    }

    Ok(())
}
