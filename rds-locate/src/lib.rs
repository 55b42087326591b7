//! rds-locate: map TMC location codes to geographic coordinates.
//!
//! Lookup is local-first: a per-country JSON table on disk answers
//! instantly; anything it cannot answer falls back to the Overpass API
//! with per-country strategy detection, endpoint rotation, a shared
//! 1100 ms rate limit, and negative caching of unknown codes.

pub mod fetch;
pub mod local;
pub mod overpass;
pub mod resolver;
pub mod types;

pub use fetch::{Clock, FetchResponse, HttpFetch, ReqwestFetch, SystemClock};
pub use resolver::{LocationResolver, BATCH_SIZE, MIN_REQUEST_GAP_MS};
pub use types::{LocationStatus, ResolveError, ResolvedLocation, Result};
