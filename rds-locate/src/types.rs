//! Shared types and error enum for rds-locate.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by the resolver.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("HTTP status {0}")]
    Http(u16),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Outcome of a lookup; `NotFound` entries are cached to suppress re-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocationStatus {
    Resolved,
    NotFound,
}

/// A TMC location code resolved to geographic coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub lcd: u32,
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
    pub road_ref: Option<String>,
    pub prev_lcd: Option<u32>,
    pub next_lcd: Option<u32>,
    pub status: LocationStatus,
}

impl ResolvedLocation {
    /// Negative-cache entry with zero coordinates.
    pub fn not_found(lcd: u32) -> Self {
        ResolvedLocation {
            lcd,
            lat: 0.0,
            lon: 0.0,
            name: None,
            road_ref: None,
            prev_lcd: None,
            next_lcd: None,
            status: LocationStatus::NotFound,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == LocationStatus::Resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_entry() {
        let loc = ResolvedLocation::not_found(9_999);
        assert_eq!(loc.lcd, 9_999);
        assert_eq!(loc.lat, 0.0);
        assert_eq!(loc.lon, 0.0);
        assert!(!loc.is_resolved());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ResolveError::Http(429).to_string(), "HTTP status 429");
        assert_eq!(ResolveError::Timeout.to_string(), "request timed out");
    }
}
