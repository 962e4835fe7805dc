//! Network access for the versioned offline asset cache.
//!
//! This crate provides:
//! - `Network` - The fetch capability consumed by install and fetch handling
//! - `HttpNetwork` - reqwest-backed implementation
//! - `StaticNetwork` - Table-driven implementation for tests and local runs

mod client;
mod error;
mod fixed;

pub use client::*;
pub use error::*;
pub use fixed::*;
