//! Save command - populate caches at job end

use crate::cache::{CacheController, RunState};
use crate::cli::args::SaveArgs;
use crate::cli::commands::JobContext;
use crate::error::SlotCacheResult;
use console::style;
use tracing::{debug, info};

/// Execute the save command
pub async fn execute(args: SaveArgs, ctx: &JobContext) -> SlotCacheResult<()> {
    let path = ctx.run_state_path(args.state_file);
    let mut state = RunState::load(&path).await?;
    debug!("Loaded run {} from {}", state.id, path.display());

    // Keys were computed against the restore step's OS identifier.
    let controller = CacheController::new(Box::new(ctx.store()), state.os.clone())?;

    let mut saved = 0;
    for run in &mut state.slots {
        if !run.needs_populate() {
            println!("  {} {} [{}]", style("-").dim(), run.slot.name, run.state);
            continue;
        }

        if controller.save(run).await? {
            saved += 1;
            println!("  {} {} saved", style("✓").green(), run.slot.name);
        } else {
            println!("  {} {} not saved", style("!").yellow(), run.slot.name);
        }
    }

    state.save(&path).await?;
    info!("Saved {} slot(s)", saved);

    Ok(())
}
