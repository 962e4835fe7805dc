//! Cache lifecycle controller for offline asset delivery.
//!
//! A controller version precaches a fixed manifest under a versioned cache
//! name, removes every other cache once it activates, and answers requests
//! cache-first with a network fallback.
//!
//! - `CacheController` - The install, activate and fetch handlers
//! - `HandlerTable` / `Worker` - Signal to handler registration and dispatch
//! - `Registration` - Host-side version lifecycle (install, waiting, active, redundant)
//!
//! # Example
//!
//! ```ignore
//! use precache_worker::{CacheController, Registration, Worker};
//!
//! let config = settings.controller_config()?;
//! let worker = Worker::new(CacheController::new(config, storage, network.clone()));
//!
//! let mut registration = Registration::new(network);
//! registration.register(worker).await?;
//!
//! let outcome = registration.fetch(&request).await?;
//! ```

mod controller;
mod error;
mod host;
mod table;

pub use controller::*;
pub use error::*;
pub use host::*;
pub use table::*;
