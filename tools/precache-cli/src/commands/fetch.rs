//! Answer a request cache-first.

use anyhow::{anyhow, Context as _, Result};
use http::Method;
use precache_core::AssetRequest;
use precache_net::Network;
use precache_store::CacheStorage;
use precache_worker::{FetchOutcome, ResponseSource};
use serde::Serialize;
use url::Url;

use super::FetchArgs;
use crate::context::Context;
use crate::output::{format_bytes, Badge};

#[derive(Serialize)]
struct FetchView<'a> {
    url: &'a str,
    status: u16,
    source: &'a ResponseSource,
    bytes: usize,
}

/// Run the fetch command.
pub async fn run(args: FetchArgs, ctx: &Context) -> Result<()> {
    let url = resolve_url(&args.url, ctx.settings.origin.as_ref())?;
    let method = Method::from_bytes(args.method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid method '{}'", args.method))?;

    let mut request = AssetRequest::new(method, url);
    for header in &args.headers {
        let (name, value) = parse_header(header)?;
        request = request.with_header(name, value);
    }

    let network = ctx.network()?;
    let outcome = match ctx.controller_config() {
        Ok(_) => ctx.worker(network).await?.fetch(request.clone()).await?,
        Err(e) => {
            // Lookup scans every cache, so no version is needed to answer.
            ctx.output
                .debug(&format!("No controller version ({:#}), answering from storage", e));
            let storage = ctx.storage().await?;
            answer_uncontrolled(&storage, &network, &request).await?
        }
    };
    let response = &outcome.response;

    if let Some(path) = &args.output {
        tokio::fs::write(path, &response.body)
            .await
            .with_context(|| format!("Failed to write {}", path))?;
    }

    if ctx.output.is_json() {
        ctx.output.json(&FetchView {
            url: request.url().as_str(),
            status: response.status,
            source: &outcome.source,
            bytes: response.body.len(),
        });
        return Ok(());
    }

    let source = match &outcome.source {
        ResponseSource::Cache(name) => format!("{} ({})", Badge::Cache.styled(), name),
        ResponseSource::Network => Badge::Network.styled(),
    };
    ctx.output.kv("URL", request.url().as_str());
    ctx.output.kv("Status", &response.status.to_string());
    ctx.output.kv("Source", &source);
    ctx.output.kv("Size", &format_bytes(response.body.len() as u64));

    if args.include {
        for (name, value) in &response.headers {
            ctx.output.list_item(&format!("{}: {}", name, value));
        }
    }

    if !response.is_ok() {
        ctx.output.warn(&format!("Response status {}", response.status));
    }
    if let Some(path) = &args.output {
        ctx.output.success(&format!("Body written to {}", path));
    }
    Ok(())
}

/// Cache-first answer over raw storage, for stores used without a configured version.
async fn answer_uncontrolled(
    storage: &impl CacheStorage,
    network: &impl Network,
    request: &AssetRequest,
) -> Result<FetchOutcome> {
    if let Some(hit) = storage.lookup_all(request).await? {
        return Ok(FetchOutcome {
            response: hit.response,
            source: ResponseSource::Cache(hit.cache_name),
        });
    }
    let response = network.fetch(request).await?;
    Ok(FetchOutcome {
        response,
        source: ResponseSource::Network,
    })
}

/// Parse an absolute URL, or join a relative one onto the origin.
fn resolve_url(raw: &str, origin: Option<&Url>) -> Result<Url> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let origin = origin.ok_or_else(|| anyhow!("Relative URL '{}' needs an origin in the config", raw))?;
            origin
                .join(raw)
                .with_context(|| format!("Invalid URL '{}'", raw))
        }
        Err(e) => Err(anyhow!("Invalid URL '{}': {}", raw, e)),
    }
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Header '{}' must be `name:value`", raw))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use precache_core::StoredResponse;
    use precache_net::StaticNetwork;
    use precache_store::{MemoryStorage, NamedCache};

    #[test]
    fn test_resolve_relative_url() {
        let origin = Url::parse("https://example.com/app/").unwrap();
        let url = resolve_url("web/app.wasm", Some(&origin)).unwrap();
        assert_eq!(url.as_str(), "https://example.com/app/web/app.wasm");
    }

    #[test]
    fn test_relative_url_without_origin() {
        assert!(resolve_url("app.css", None).is_err());
        assert!(resolve_url("https://example.com/app.css", None).is_ok());
    }

    #[test]
    fn test_parse_header() {
        let (name, value) = parse_header("Accept: text/css").unwrap();
        assert_eq!(name, "Accept");
        assert_eq!(value, "text/css");
        assert!(parse_header("broken").is_err());
    }

    #[tokio::test]
    async fn test_uncontrolled_answer_uses_any_cache() {
        let storage = MemoryStorage::new();
        let cache = storage.open("app-old").await.unwrap();
        let hit = AssetRequest::parse_get("https://example.com/app.css").unwrap();
        cache
            .put_all(vec![(hit.clone(), StoredResponse::new(200).with_body("css"))])
            .await
            .unwrap();
        let network = StaticNetwork::new().with_body("https://example.com/api", "live");

        let outcome = answer_uncontrolled(&storage, &network, &hit).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache("app-old".to_string()));
        assert_eq!(outcome.response.body, b"css");

        let miss = AssetRequest::parse_get("https://example.com/api").unwrap();
        let outcome = answer_uncontrolled(&storage, &network, &miss).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(network.call_count(), 1);
        assert_eq!(storage.summary().await, vec![("app-old".to_string(), 1)]);
    }
}
