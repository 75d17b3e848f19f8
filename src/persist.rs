//! Host-persisted map-view configuration (§6.5).
//
// The core performs no file or wire I/O (Non-goal, §1); this models the
// value a host is expected to persist as simple key/value pairs, the way
// the teacher derives `Serialize`/`Deserialize` on its OGC value types
// (`TitleDescriptionKeywords`, `BoundingBox2D`) without owning any transport.

use serde::{Deserialize, Serialize};

use crate::geo::GeoCoordinate;

/// The shown map layer, zoom, and center, persisted by the host under
/// backend-prefixed keys such as `"GoogleMaps Map Type" = "ROADMAP"` and
/// `"Zoom" = "googlemaps:5"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapViewConfig {
    pub layer_id: String,
    pub zoom: String,
    pub center: GeoCoordinate,
}

impl MapViewConfig {
    pub fn new(layer_id: impl Into<String>, zoom: impl Into<String>, center: GeoCoordinate) -> Self {
        Self {
            layer_id: layer_id.into(),
            zoom: zoom.into(),
            center,
        }
    }

    /// Render as the flat key/value pairs §6.5 describes the host storing.
    /// The center is stored in its canonical `geo:` textual form.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("Layer".to_string(), self.layer_id.clone()),
            ("Zoom".to_string(), self.zoom.clone()),
        ];
        if let Some(url) = self.center.geo_url() {
            pairs.push(("Center".to_string(), url));
        }
        pairs
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn to_pairs_includes_layer_zoom_and_geo_url_center() {
        let cfg = MapViewConfig::new("ROADMAP", "googlemaps:5", GeoCoordinate::new(1.0, 2.0));
        let pairs = cfg.to_pairs();
        assert!(pairs.contains(&("Layer".to_string(), "ROADMAP".to_string())));
        assert!(pairs.contains(&("Zoom".to_string(), "googlemaps:5".to_string())));
        assert!(pairs.contains(&("Center".to_string(), "geo:1,2".to_string())));
    }
}
