//! Storage of per-trip metrics.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Comparison job / HTTP handlers             │
//! └───────────────────┬─────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────┐
//! │  services.rs: cache lookup, store, list     │
//! └───────────────────┬─────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────┐
//! │  TripRepository trait                       │
//! └───────────────────┬─────────────────────────┘
//!                     │
//!             ┌───────▼────────┐
//!             │ LocalRepository│
//!             │  (in-memory)   │
//!             └────────────────┘
//! ```
//!
//! The repository is created once at startup and injected where needed; there
//! is no process-global instance.

pub mod checksum;
pub mod repositories;
pub mod repository;
pub mod services;


pub use checksum::{calculate_checksum, record_fingerprint};
pub use repositories::LocalRepository;
pub use repository::{ErrorContext, RepositoryError, RepositoryResult, TripRepository};
pub use services::{lookup_cache, CacheLookup};
