//! Install a version and activate it.

use anyhow::Result;
use chrono::{DateTime, Utc};
use precache_worker::{ActivationReport, InstallOutcome, Registration};
use serde::Serialize;

use crate::context::Context;

#[derive(Serialize)]
struct DeployRecord {
    version: String,
    install: InstallOutcome,
    activation: Option<ActivationReport>,
    state: String,
    timestamp: DateTime<Utc>,
}

/// Run the deploy command.
pub async fn run(ctx: &Context) -> Result<()> {
    let network = ctx.network()?;
    let worker = ctx.worker(network.clone()).await?;
    let version = worker.version().clone();

    ctx.output.header(&format!("Deploying version {}", version));
    ctx.output.kv("Cache", worker.controller().cache_name().as_str());
    ctx.output.kv("Storage", &ctx.storage_path().display().to_string());

    let mut registration = Registration::new(network).with_settings(&ctx.settings.lifecycle);

    ctx.output.step(1, 2, "Installing");
    let spinner = ctx.output.spinner("Precaching assets");
    let installed = registration.install(worker).await;
    spinner.finish_and_clear();
    let install = installed?;
    ctx.output.kv("Cached", &install.cached.to_string());

    ctx.output.step(2, 2, "Activating");
    let activation = registration.try_activate().await?;
    let state = registration
        .state_of(&version)
        .map(|s| s.to_string())
        .unwrap_or_default();

    if ctx.output.is_json() {
        ctx.output.json(&DeployRecord {
            version: version.to_string(),
            install,
            activation,
            state,
            timestamp: Utc::now(),
        });
        return Ok(());
    }

    match activation {
        Some(report) => {
            for name in &report.deleted {
                ctx.output.list_item(&format!("deleted {}", name));
            }
            for name in &report.failed {
                ctx.output.warn(&format!("Could not delete {}", name));
            }
            ctx.output.success(&format!("Version {} deployed", version));
        }
        None => ctx.output.warn(&format!("Version {} installed and waiting", version)),
    }
    Ok(())
}
