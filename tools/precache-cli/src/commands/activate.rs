//! Remove caches that do not belong to the configured version.

use anyhow::Result;

use crate::context::Context;

/// Run the activate command.
pub async fn run(ctx: &Context) -> Result<()> {
    let worker = ctx.worker(ctx.network()?).await?;
    let report = worker.activate().await?;

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.header(&format!("Activated {}", worker.controller().cache_name()));
    if report.deleted.is_empty() {
        ctx.output.info("No stale caches found.");
    }
    for name in &report.deleted {
        ctx.output.list_item(&format!("deleted {}", name));
    }
    for name in &report.failed {
        ctx.output.warn(&format!("Could not delete {}", name));
    }

    ctx.output.success(&format!("Version {} is in control", worker.version()));
    Ok(())
}
