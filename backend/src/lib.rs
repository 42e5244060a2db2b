//! # Trip Quality Backend
//!
//! GPS trip quality engine and period comparison service.
//!
//! Trips exported for a date range are analyzed from their raw GPS traces:
//! the trace is split into short, medium and long segments, each trip gets a
//! quality category, and fleet-wide metrics for two periods are compared as
//! background jobs whose progress can be polled or streamed.
//!
//! ## Architecture
//!
//! - [`models`]: Domain types (trips, segments, metrics, date ranges)
//! - [`algorithms`]: Pure analysis: segments, quality classification, trip activity
//! - [`source`]: Trip export and trip API client
//! - [`db`]: Repository trait, in-memory storage and cache lookup
//! - [`services`]: Aggregation, deltas, insights and the comparison job orchestrator
//! - [`config`]: TOML and environment configuration
//! - [`http`]: Axum-based HTTP server and request handlers
//! - [`api`]: Public types used by API responses

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod algorithms;
pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod source;

#[cfg(feature = "http-server")]
pub mod http;
