//! List stored caches.

use anyhow::Result;
use serde::Serialize;

use super::CachesArgs;
use crate::context::Context;
use crate::output::Badge;

#[derive(Serialize)]
struct CacheInfo {
    name: String,
    entries: usize,
    status: Badge,
}

/// Run the caches command.
pub async fn run(args: CachesArgs, ctx: &Context) -> Result<()> {
    let storage = ctx.storage().await?;
    // Without a version every cache is listed as unknown.
    let current = match ctx.controller_config() {
        Ok(config) => Some(config.cache_name().clone()),
        Err(e) => {
            ctx.output
                .debug(&format!("Cannot tell current from stale caches: {:#}", e));
            None
        }
    };

    let caches: Vec<CacheInfo> = storage
        .summary()
        .await
        .into_iter()
        .map(|(name, entries)| {
            let status = Badge::for_cache(&name, current.as_ref());
            CacheInfo {
                name,
                entries,
                status,
            }
        })
        .filter(|c| !args.stale || c.status == Badge::Stale)
        .collect();

    if ctx.output.is_json() {
        ctx.output.json(&caches);
        return Ok(());
    }

    ctx.output
        .header(&format!("Caches in {}", storage.path().display()));
    if caches.is_empty() {
        ctx.output.info("No caches found.");
        return Ok(());
    }

    println!("{:<32} {:>8}  {}", "NAME", "ENTRIES", "STATUS");
    for cache in &caches {
        println!(
            "{:<32} {:>8}  {}",
            cache.name,
            cache.entries,
            cache.status.styled()
        );
    }
    Ok(())
}
