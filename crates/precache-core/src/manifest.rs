//! The fixed list of assets precached at install time.

use std::collections::HashSet;

use url::Url;

use crate::error::CoreError;
use crate::request::AssetRequest;

/// Ordered, duplicate-free list of absolute asset URLs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetManifest {
    assets: Vec<Url>,
}

impl AssetManifest {
    /// Build a manifest from absolute URLs only.
    pub fn new<I, S>(entries: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::resolve(None, entries)
    }

    /// Build a manifest, resolving relative entries against `origin`.
    ///
    /// Entries that resolve to the same URL (ignoring fragments) are rejected,
    /// since a batch population may not contain the same request twice.
    pub fn resolve<I, S>(origin: Option<&Url>, entries: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut assets = Vec::new();
        let mut seen = HashSet::new();

        for entry in entries {
            let entry = entry.as_ref().trim();
            let url = parse_entry(origin, entry)?;

            let mut key = url.clone();
            key.set_fragment(None);
            if !seen.insert(key) {
                return Err(CoreError::DuplicateAsset(entry.to_string()));
            }
            assets.push(url);
        }

        Ok(Self { assets })
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the manifest lists no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Iterate over asset URLs in manifest order.
    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.assets.iter()
    }

    /// GET requests for every asset, in manifest order.
    pub fn requests(&self) -> Vec<AssetRequest> {
        self.assets.iter().cloned().map(AssetRequest::get).collect()
    }

    /// Whether `url` is listed.
    pub fn contains(&self, url: &Url) -> bool {
        self.assets.iter().any(|a| a == url)
    }
}

fn parse_entry(origin: Option<&Url>, entry: &str) -> Result<Url, CoreError> {
    let invalid = |reason: String| CoreError::InvalidUrl {
        url: entry.to_string(),
        reason,
    };

    match Url::parse(entry) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => match origin {
            Some(base) => base.join(entry).map_err(|e| invalid(e.to_string())),
            None => Err(invalid("relative URL without an origin".to_string())),
        },
        Err(e) => Err(invalid(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://richardwooding.github.io").unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let manifest = AssetManifest::resolve(
            Some(&origin()),
            [
                "/gameoflife",
                "/gameoflife/app.css",
                "https://storage.googleapis.com/murlok-github/icon-192.png",
            ],
        )
        .unwrap();

        let urls: Vec<&str> = manifest.iter().map(|u| u.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://richardwooding.github.io/gameoflife",
                "https://richardwooding.github.io/gameoflife/app.css",
                "https://storage.googleapis.com/murlok-github/icon-192.png",
            ]
        );
    }

    #[test]
    fn test_relative_without_origin_fails() {
        let err = AssetManifest::new(["/app.css"]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidUrl { .. }));
    }

    #[test]
    fn test_duplicates_rejected() {
        let err = AssetManifest::resolve(
            Some(&origin()),
            ["/app.css", "https://richardwooding.github.io/app.css"],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateAsset(_)));
    }

    #[test]
    fn test_order_preserved_in_requests() {
        let manifest =
            AssetManifest::resolve(Some(&origin()), ["/b.js", "/a.js", "/c.js"]).unwrap();
        let requests = manifest.requests();

        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].url().path(), "/b.js");
        assert_eq!(requests[1].url().path(), "/a.js");
        assert_eq!(requests[2].url().path(), "/c.js");
        assert!(requests.iter().all(|r| r.is_cacheable()));
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = AssetManifest::new(Vec::<String>::new()).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.len(), 0);
    }
}
