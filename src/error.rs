//! Crate-wide error type.
//!
//! Most conditions this engine runs into are locally recoverable (stale
//! handles, out-of-range coordinates, missing child tiles — see the error
//! handling design in the module docs) and are therefore *not* represented
//! here: they are clamped, skipped, or turned into `None` at the call site.
//! `GeoTilerError` only covers the handful of operations that have no
//! sensible silent fallback.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoTilerError {
    #[error("tile level {0} exceeds the maximum level {1}")]
    LevelOutOfRange(u8, u8),
    #[error("bounds pair is not normalized: first={0:?} second={1:?}")]
    BoundsNotNormalized(crate::geo::GeoCoordinate, crate::geo::GeoCoordinate),
    #[error("unknown zoom backend prefix in `{0}`")]
    UnknownZoomBackend(String),
    #[error("malformed geo URL: `{0}`")]
    InvalidGeoUrl(String),
}

pub type Result<T> = std::result::Result<T, GeoTilerError>;
