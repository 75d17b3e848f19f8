//! Backend zoom ↔ tile level mapping (§4.6).
//
// Grounded on `BackendGoogleMaps::getTileViewLevel` (`backend-googlemaps.cpp`)
// for the `"googlemaps:"` table, and on `WorldMapWidget2::convertZoomToBackendZoom`
// (`worldmapwidget2.cpp`) for the `"marble:"` table, which the original only
// expresses indirectly as a marble-zoom-to-googlemaps-zoom conversion; the
// marble table here composes that conversion with the googlemaps table,
// preserving both verbatim per the §9 open-question instruction.

use crate::error::GeoTilerError;
use crate::tile_index::MAX_LEVEL;

const GOOGLEMAPS_PREFIX: &str = "googlemaps:";
const MARBLE_PREFIX: &str = "marble:";

/// `(zoom, level)` pairs, found experimentally in the original and preserved
/// verbatim. A zoom beyond the last entry clamps to [`MAX_LEVEL`].
const GOOGLEMAPS_ZOOM_TO_LEVEL: &[(u32, u8)] = &[
    (0, 1),
    (1, 1),
    (2, 1),
    (3, 2),
    (4, 2),
    (5, 3),
    (6, 3),
    (7, 3),
    (8, 4),
    (9, 4),
    (10, 4),
    (11, 4),
    (12, 4),
    (13, 4),
    (14, 5),
    (15, 5),
    (16, 5),
    (17, 5),
    (18, 6),
    (19, 6),
    (20, 6),
    (21, 7),
    (22, 7),
];

/// Upper bound (inclusive) of marble's `zoom()` scale mapped to the
/// googlemaps zoom it corresponds to, per `convertZoomToBackendZoom`'s
/// `targetBackend == "googlemaps"` branch.
const MARBLE_ZOOM_TO_GOOGLEMAPS_ZOOM: &[(u32, u32)] = &[
    (900, 0),
    (970, 1),
    (1108, 2),
    (1250, 3),
    (1384, 4),
    (1520, 5),
    (1665, 6),
    (1800, 7),
    (1940, 8),
    (2070, 9),
    (2220, 10),
    (2357, 11),
    (2510, 12),
    (2635, 13),
    (2775, 14),
    (2900, 15),
    (3051, 16),
    (3180, 17),
    (3295, 18),
    (3450, 19),
];

fn googlemaps_zoom_to_level(zoom: u32) -> u8 {
    for &(z, level) in GOOGLEMAPS_ZOOM_TO_LEVEL {
        if zoom == z {
            return level;
        }
    }
    MAX_LEVEL
}

fn marble_zoom_to_level(zoom: u32) -> u8 {
    for &(threshold, google_zoom) in MARBLE_ZOOM_TO_GOOGLEMAPS_ZOOM {
        if zoom <= threshold {
            return googlemaps_zoom_to_level(google_zoom);
        }
    }
    // Past the original's highest fitted threshold: the conversion table
    // maps this range to googlemaps zoom 20, one past the table's last entry.
    googlemaps_zoom_to_level(20)
}

/// Map a backend-qualified zoom string (`"googlemaps:5"`, `"marble:2220"`) to
/// a tile level in `[0, MAX_LEVEL]`.
pub fn zoom_to_level(zoom: &str) -> Result<u8, GeoTilerError> {
    if let Some(rest) = zoom.strip_prefix(GOOGLEMAPS_PREFIX) {
        let z: u32 = rest
            .parse()
            .map_err(|_| GeoTilerError::UnknownZoomBackend(zoom.to_string()))?;
        return Ok(googlemaps_zoom_to_level(z).min(MAX_LEVEL));
    }
    if let Some(rest) = zoom.strip_prefix(MARBLE_PREFIX) {
        let z: u32 = rest
            .parse()
            .map_err(|_| GeoTilerError::UnknownZoomBackend(zoom.to_string()))?;
        return Ok(marble_zoom_to_level(z).min(MAX_LEVEL));
    }
    Err(GeoTilerError::UnknownZoomBackend(zoom.to_string()))
}
