//! Core types for the versioned offline asset cache.
//!
//! This crate provides the fundamental types:
//! - `VersionId` / `CacheName` - Deployed asset set identity
//! - `AssetManifest` - The fixed list of precached URLs
//! - `AssetRequest` / `StoredResponse` - Request and response values
//! - `Signal` / `WorkerState` - Lifecycle tracking
//! - `Settings` / `ControllerConfig` - File and environment configuration

mod config;
mod error;
mod lifecycle;
mod manifest;
mod request;
mod version;

pub use config::*;
pub use error::*;
pub use lifecycle::*;
pub use manifest::*;
pub use request::*;
pub use version::*;
