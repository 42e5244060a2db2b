//! HTTP server module.
//!
//! An axum REST API over the service layer: comparison jobs, their progress
//! and logs, bulk refresh jobs, stored trips and fleet insights.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - Request parsing and validation                         │
//! │  - CORS, compression, error mapping                       │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services/)                                │
//! │  - ComparisonOrchestrator, ProgressStore, WorkerPool      │
//! │  - Aggregation, deltas, insights                          │
//! └─────────┬─────────────────────────────────┬──────────────┘
//!           │                                 │
//! ┌─────────▼──────────────┐      ┌───────────▼──────────────┐
//! │  Trip source (source/) │      │  Repository (db/)        │
//! │  export + trip API     │      │  stored TripMetrics      │
//! └────────────────────────┘      └──────────────────────────┘
//! ```

#[cfg(feature = "http-server")]
pub mod handlers;

#[cfg(feature = "http-server")]
pub mod router;

#[cfg(feature = "http-server")]
pub mod state;

#[cfg(feature = "http-server")]
pub mod error;

#[cfg(feature = "http-server")]
pub mod dto;

#[cfg(feature = "http-server")]
pub use router::create_router;

#[cfg(feature = "http-server")]
pub use state::AppState;
