//! A hierarchical geo-tiling and screen-space clustering engine for map
//! marker widgets.
//!
//! Items come from a host-owned [`model::ItemModel`] (and, for selection
//! state, a [`model::SelectionModel`]); this crate never owns the items
//! themselves, only a pyramid of [`tile_index::TileIndex`]-addressed tiles
//! built over their coordinates.
//!
//! ## Building a pyramid and iterating it
//!
//! ```rust
//! use geotiler::geo::GeoCoordinate;
//! use geotiler::item_tiler::ItemTiler;
//! use geotiler::model::{Handle, ItemModel, SelectionModel};
//! use geotiler::tiler::NonEmptyIterator;
//!
//! struct Markers {
//!     coordinates: Vec<GeoCoordinate>,
//! }
//!
//! impl ItemModel for Markers {
//!     fn row_count(&self) -> usize {
//!         self.coordinates.len()
//!     }
//!     fn handle_at(&self, row: usize) -> Handle {
//!         Handle(row as u64)
//!     }
//!     fn item_coordinates(&self, handle: Handle) -> Option<GeoCoordinate> {
//!         self.coordinates.get(handle.0 as usize).copied()
//!     }
//! }
//!
//! struct NoSelection;
//! impl SelectionModel for NoSelection {
//!     fn is_selected(&self, _handle: Handle) -> bool {
//!         false
//!     }
//! }
//!
//! let model = Markers {
//!     coordinates: vec![GeoCoordinate::new(1.0, 2.0), GeoCoordinate::new(50.0, 60.0)],
//! };
//! // The pyramid starts dirty, so the first query below regenerates it from
//! // every row the model already holds; `add_item` is only for a row the
//! // host adds *after* that initial load.
//! let mut tiler = ItemTiler::new(model, NoSelection);
//!
//! let tiles: Vec<_> = NonEmptyIterator::whole_globe(&mut tiler, 3).collect();
//! assert_eq!(tiles.len(), 2);
//! ```
//!
//! ## Clustering for display
//!
//! A [`cluster::Clusterer`] turns the tiles visible at one zoom level into a
//! bounded set of on-screen clusters, given a [`backend::MapBackend`] that
//! can project geo coordinates to widget-local pixels. See
//! [`cluster::Clusterer::cluster`].

pub mod altitude;
pub mod backend;
pub mod cluster;
pub mod error;
pub mod geo;
pub mod group_state;
pub mod item_tiler;
pub mod model;
pub mod persist;
pub mod shared;
pub mod tile;
pub mod tile_index;
pub mod tiler;
pub mod zoom;

pub use cluster::{Cluster, Clusterer};
pub use error::{GeoTilerError, Result};
pub use geo::{GeoBoundsPair, GeoCoordinate};
pub use group_state::{GroupState, Ternary};
pub use item_tiler::ItemTiler;
pub use model::{Handle, ItemModel, SelectionModel};
pub use shared::SharedState;
pub use tile_index::{TileIndex, MAX_LEVEL, TILING};
pub use tiler::{AbstractTiler, NonEmptyIterator};
