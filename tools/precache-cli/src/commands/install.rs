//! Precache the manifest for the configured version.

use anyhow::Result;

use crate::context::Context;

/// Run the install command.
pub async fn run(ctx: &Context) -> Result<()> {
    let worker = ctx.worker(ctx.network()?).await?;

    let spinner = ctx.output.spinner(&format!(
        "Precaching {} assets into {}",
        worker.controller().config().manifest().len(),
        worker.controller().cache_name()
    ));
    let result = worker.install().await;
    spinner.finish_and_clear();
    let outcome = result?;

    if ctx.output.is_json() {
        ctx.output.json(&outcome);
        return Ok(());
    }

    ctx.output.success(&format!(
        "Installed version {} ({} assets in {})",
        worker.version(),
        outcome.cached,
        outcome.cache_name
    ));
    ctx.output
        .info("Run `precache activate` to remove caches of other versions.");
    Ok(())
}
