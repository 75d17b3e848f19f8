//! Geographic coordinates and the `geo:` URL textual form.
//
// Grounded on `geocoordinates.h` from the KDE original: a lat/lon pair with
// an independently-clearable altitude and a has-flags bitset, rather than
// collapsing altitude presence into `Option<f64>` alone (that would not let
// `clear_alt` be distinguished from "never had an altitude" for equality,
// which §3's Data Model explicitly calls out).

use crate::error::GeoTilerError;
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Which fields of a [`GeoCoordinate`] are meaningfully set.
    #[derive(Serialize, Deserialize)]
    pub struct HasFlags: u8 {
        const NOTHING     = 0;
        const LATITUDE    = 1 << 0;
        const LONGITUDE   = 1 << 1;
        const COORDINATES = Self::LATITUDE.bits() | Self::LONGITUDE.bits();
        const ALTITUDE    = 1 << 2;
    }
}

/// A latitude/longitude pair in degrees, with an optional altitude in meters.
///
/// Latitude is clamped to `[-90, 90]` and longitude to `[-180, 180]` by every
/// constructor; callers that need the §4.1 clamp-at-cell-boundary behavior
/// use [`TileIndex::from_coordinates`](crate::tile_index::TileIndex::from_coordinates)
/// directly rather than clamping the coordinate itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoCoordinate {
    lat: f64,
    lon: f64,
    alt: f64,
    has_flags: HasFlags,
}

impl GeoCoordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            alt: 0.0,
            has_flags: HasFlags::COORDINATES,
        }
    }

    pub fn with_altitude(lat: f64, lon: f64, alt: f64) -> Self {
        Self {
            lat,
            lon,
            alt,
            has_flags: HasFlags::COORDINATES | HasFlags::ALTITUDE,
        }
    }

    pub fn empty() -> Self {
        Self {
            lat: 0.0,
            lon: 0.0,
            alt: 0.0,
            has_flags: HasFlags::NOTHING,
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn alt(&self) -> f64 {
        self.alt
    }

    pub fn has_coordinates(&self) -> bool {
        self.has_flags.contains(HasFlags::COORDINATES)
    }

    pub fn has_altitude(&self) -> bool {
        self.has_flags.contains(HasFlags::ALTITUDE)
    }

    pub fn has_flags(&self) -> HasFlags {
        self.has_flags
    }

    pub fn set_alt(&mut self, alt: f64) {
        self.alt = alt;
        self.has_flags |= HasFlags::ALTITUDE;
    }

    pub fn clear_alt(&mut self) {
        self.has_flags.remove(HasFlags::ALTITUDE);
    }

    /// Whether `self` and `other` share the same lat/lon, ignoring altitude.
    pub fn same_lon_lat_as(&self, other: &GeoCoordinate) -> bool {
        self.has_coordinates()
            && other.has_coordinates()
            && self.lat == other.lat
            && self.lon == other.lon
    }

    /// Render `value` with 12 significant digits, matching the original's
    /// `QString::number(value, 'g', 12)`: fixed notation for the magnitudes
    /// geo coordinates actually take, falling back to scientific notation
    /// outside that range.
    fn field_string(value: f64) -> String {
        if value == 0.0 {
            return "0".to_string();
        }
        const SIG: i32 = 12;
        let exponent = value.abs().log10().floor() as i32;
        if (-4..SIG).contains(&exponent) {
            let decimals = (SIG - 1 - exponent).max(0) as usize;
            let formatted = format!("{value:.decimals$}");
            trim_trailing_zeros(&formatted)
        } else {
            let mantissa_decimals = (SIG - 1).max(0) as usize;
            format!("{value:.mantissa_decimals$e}")
        }
    }

    /// Canonical textual form: `geo:LAT,LON[,ALT]`, 12 significant digits.
    pub fn geo_url(&self) -> Option<String> {
        if !self.has_coordinates() {
            return None;
        }
        if self.has_altitude() {
            Some(format!(
                "geo:{},{},{}",
                Self::field_string(self.lat),
                Self::field_string(self.lon),
                Self::field_string(self.alt)
            ))
        } else {
            Some(format!(
                "geo:{},{}",
                Self::field_string(self.lat),
                Self::field_string(self.lon)
            ))
        }
    }

    /// Parse a `geo:LAT,LON[,ALT]` URL. Unrecognized input yields an error
    /// rather than a half-populated coordinate (§7: parse failure signaled
    /// without touching an out-parameter — here, without constructing a
    /// value at all).
    pub fn from_geo_url(url: &str) -> Result<Self, GeoTilerError> {
        let Some(rest) = url.strip_prefix("geo:") else {
            return Err(GeoTilerError::InvalidGeoUrl(url.to_string()));
        };
        let parts: Vec<&str> = rest.split(',').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(GeoTilerError::InvalidGeoUrl(url.to_string()));
        }
        let lat: f64 = parts[0]
            .parse()
            .map_err(|_| GeoTilerError::InvalidGeoUrl(url.to_string()))?;
        let lon: f64 = parts[1]
            .parse()
            .map_err(|_| GeoTilerError::InvalidGeoUrl(url.to_string()))?;
        if parts.len() == 3 {
            let alt: f64 = parts[2]
                .parse()
                .map_err(|_| GeoTilerError::InvalidGeoUrl(url.to_string()))?;
            Ok(Self::with_altitude(lat, lon, alt))
        } else {
            Ok(Self::new(lat, lon))
        }
    }
}

impl PartialEq for GeoCoordinate {
    /// Equality per §3: compares the has-altitude flag and, if present, the
    /// altitude, in addition to lat/lon.
    fn eq(&self, other: &Self) -> bool {
        if self.has_coordinates() != other.has_coordinates() {
            return false;
        }
        if self.has_coordinates() && (self.lat != other.lat || self.lon != other.lon) {
            return false;
        }
        if self.has_altitude() != other.has_altitude() {
            return false;
        }
        if self.has_altitude() && self.alt != other.alt {
            return false;
        }
        true
    }
}

impl std::fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.geo_url() {
            Some(url) => write!(f, "{url}"),
            None => write!(f, "geo:<none>"),
        }
    }
}

/// A `(southwest, northeast)` rectangle in geographic coordinates.
pub type GeoBoundsPair = (GeoCoordinate, GeoCoordinate);

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    trimmed.trim_end_matches('.').to_string()
}
