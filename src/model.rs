//! External item-model and selection-model adapters (§6.1, §6.2).
//
// Grounded on `markermodel.h`'s `ItemMarkerTiler::MarkerModel` abstract
// interface and `kgeomap_common.h`'s selection plumbing; the capability-set
// framing follows §4.4/§9 ("polymorphism over capability sets, not concrete
// classes").

use crate::geo::GeoCoordinate;

bitflags::bitflags! {
    /// Per-item or per-model capability bits (§6.1).
    #[derive(Default)]
    pub struct ItemFlags: u8 {
        const VISIBLE = 1 << 0;
        const MOVABLE = 1 << 1;
        const SNAPS   = 1 << 2;
    }
}

/// A stable, opaque reference to one row of the external item model.
///
/// The tiler never dereferences a host pointer: it stores only `Handle`
/// values and asks the [`ItemModel`] to resolve them. A `Handle` remains
/// valid, by the adapter's contract, until the row it names is explicitly
/// removed (§9 "stable handles").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub u64);

/// The capability set an external item collection must provide (§6.1).
///
/// Notifications (`rows_inserted`, `rows_about_to_be_removed`,
/// `data_changed`, `model_reset`) are not methods on this trait: the host
/// calls the corresponding `ItemTiler` methods directly when those events
/// occur, the same way the original wires Qt model signals to tiler slots.
pub trait ItemModel {
    fn row_count(&self) -> usize;

    /// The stable handle for `row`. The adapter promises this value keeps
    /// identifying the same item across moves, until removal.
    fn handle_at(&self, row: usize) -> Handle;

    /// `None` for rows that carry no geo tag.
    fn item_coordinates(&self, handle: Handle) -> Option<GeoCoordinate>;

    fn model_flags(&self) -> ItemFlags {
        ItemFlags::VISIBLE | ItemFlags::MOVABLE
    }

    fn item_flags(&self, _handle: Handle) -> ItemFlags {
        ItemFlags::VISIBLE | ItemFlags::MOVABLE
    }

    /// Pick the best representative among `handles` for `sort_key`
    /// (§4.3 `get_tile_representative`). Defaults to the first handle.
    fn best_representative(&self, handles: &[Handle], _sort_key: i32) -> Option<Handle> {
        handles.first().copied()
    }
}

/// The capability set an external selection collection must provide
/// (§6.2).
pub trait SelectionModel {
    fn is_selected(&self, handle: Handle) -> bool;
}
