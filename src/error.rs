//! Error taxonomy for one polling cycle

use thiserror::Error;

/// Transport-level failure talking to the order endpoint
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not read response body: {0}")]
    Body(#[from] std::io::Error),
}

/// The endpoint answered, but not with a usable order
#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("response is not an array of [label, value] pairs: {0}")]
    Shape(String),
    #[error("field `{field}` missing (index {index}, {len} pairs received)")]
    MissingField {
        field: &'static str,
        index: usize,
        len: usize,
    },
    #[error("location `{0}` is not a \"lat,lng\" pair")]
    BadCoordinate(String),
    #[error("location {lat},{lng} is outside valid latitude/longitude ranges")]
    OutOfRange { lat: f64, lng: f64 },
}

/// Geometry could not be produced for the globe scene
#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("globe scene used before it was built")]
    Uninitialized,
    #[error("projection of {lat},{lng} is not finite")]
    NonFinite { lat: f64, lng: f64 },
}

/// Anything that can spoil a single fetch-classify-render cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl CycleError {
    /// Short tag for the status line
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::Fetch(_) => "fetch",
            CycleError::Payload(_) => "payload",
            CycleError::Projection(_) => "projection",
        }
    }
}
