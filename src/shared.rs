//! Per-widget shared state (SPEC_FULL §C), read by the clusterer and by
//! iterator consumers.
//
// Grounded on `KGeoMapSharedData` in `kgeomap_common.h`: a plain shared
// struct, not a synchronization primitive, since the engine is
// single-threaded (§5).

use crate::cluster::Cluster;
use crate::geo::GeoCoordinate;

/// Which interaction the host's pointer input is currently bound to.
///
/// Grounded on the `MouseMode` flags in `types.h`; this engine only needs
/// one mode active at a time; a host layering multiple concurrent mouse
/// behaviors on top can wrap this in its own flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    #[default]
    Pan,
    SelectFreehand,
    SelectRectangle,
    ZoomIntoGroup,
}

/// Shared per-frame state: the clusterer writes `clusters`, and both it and
/// external consumers read `sort_key`/`thumbnail_size` to decide how to pick
/// and render representatives.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    pub clusters: Vec<Cluster>,
    pub sort_key: i32,
    pub thumbnail_size: (u32, u32),
    pub mouse_mode: MouseMode,
    pub selection_rectangle: Option<(GeoCoordinate, GeoCoordinate)>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_selection_rectangle(&self) -> bool {
        self.selection_rectangle.is_some()
    }
}
