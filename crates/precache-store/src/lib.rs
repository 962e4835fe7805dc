//! Named cache storage for the versioned offline asset cache.
//!
//! This crate provides:
//! - `CacheStorage` - The set of named caches owned by one origin
//! - `NamedCache` - One cache, populated all-or-nothing
//! - `MemoryStorage` - Process-local backend
//! - `FsStorage` - Backend persisted to a single JSON file
//!
//! # Example
//!
//! ```ignore
//! use precache_store::{CacheStorage, MemoryStorage};
//!
//! let storage = MemoryStorage::new();
//! let cache = storage.open("app-5e5b9e78").await?;
//! cache.add_all(&network, &manifest.requests()).await?;
//!
//! let hit = storage.lookup_all(&request).await?;
//! ```

mod error;
mod fs;
mod memory;
mod state;
mod storage;

pub use error::*;
pub use fs::*;
pub use memory::*;
pub use state::{CacheHandle, CachedEntry};
pub use storage::*;
