//! External trip data: the date-range export and the per-trip detail API.
//!
//! The comparison job only sees the [`TripDataSource`] trait. The production
//! implementation is [`HttpTripSource`]; tests plug in scripted sources.

pub mod error;
pub mod http;
pub mod parse;

use async_trait::async_trait;

pub use error::{SourceError, SourceResult};
pub use http::HttpTripSource;

use crate::models::{DateRange, TripDetail, TripId, TripRecord};

#[async_trait]
pub trait TripDataSource: Send + Sync {
    /// Every trip exported for the range, one record per trip id.
    async fn fetch_trips(&self, range: &DateRange) -> SourceResult<Vec<TripRecord>>;

    /// Status, coordinates and activity for one trip.
    async fn fetch_trip_detail(&self, trip_id: TripId) -> SourceResult<TripDetail>;
}
