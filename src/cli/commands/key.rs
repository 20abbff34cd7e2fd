//! Key command - print the cache key for each slot

use crate::cache::resolve;
use crate::cli::args::KeyArgs;
use crate::cli::commands::JobContext;
use crate::error::SlotCacheResult;
use console::style;
use tracing::debug;

/// Execute the key command
///
/// A slot whose key cannot be computed is reported as disabled, the same
/// way `restore` runs it uncached.
pub async fn execute(args: KeyArgs, ctx: &JobContext) -> SlotCacheResult<()> {
    let slots = ctx.slots(&args.slot)?;

    for slot in &slots {
        match resolve(slot, &ctx.os) {
            Ok(key) => println!("{}: {}", slot.name, key),
            Err(e) => {
                debug!("Key input error for {}: {:?}", slot.name, e);
                println!("{}: {} {}", slot.name, style("disabled").yellow(), e);
            }
        }
    }

    Ok(())
}
