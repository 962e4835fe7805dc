//! Show the configured asset manifest.

use anyhow::Result;
use serde::Serialize;

use crate::context::Context;

#[derive(Serialize)]
struct ManifestView<'a> {
    version: &'a str,
    cache_name: &'a str,
    skip_waiting: bool,
    assets: Vec<String>,
}

/// Run the manifest command.
pub async fn run(ctx: &Context) -> Result<()> {
    let config = ctx.controller_config()?;

    if ctx.output.is_json() {
        ctx.output.json(&ManifestView {
            version: config.version().as_str(),
            cache_name: config.cache_name().as_str(),
            skip_waiting: config.skip_waiting(),
            assets: config.manifest().iter().map(|u| u.to_string()).collect(),
        });
        return Ok(());
    }

    ctx.output.header("Asset manifest");
    if let Some(path) = &ctx.config_file {
        ctx.output.kv("Config", &path.display().to_string());
    }
    ctx.output.kv("Version", config.version().as_str());
    ctx.output.kv("Cache", config.cache_name().as_str());
    ctx.output.kv("Skip waiting", &config.skip_waiting().to_string());
    ctx.output.kv("Assets", &config.manifest().len().to_string());

    if config.manifest().is_empty() {
        ctx.output.warn("Manifest is empty; install will create an empty cache");
    }
    for url in config.manifest().iter() {
        ctx.output.list_item(url.as_str());
    }

    Ok(())
}
