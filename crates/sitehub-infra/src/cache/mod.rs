//! CDN asset cache - files under a fixed root, filled from the origin on demand.

mod disk;
mod inflight;

pub use disk::DiskAssetCache;
pub use inflight::{FetchGuard, FetchRole, FlightFailure, FlightResult, InFlightTracker};
