//! A single node of the tile pyramid.
//
// Grounded on `markermodel.h::Tile` from the KDE original, adapted to owned
// `Box<Tile>` children instead of raw pointers (§9 "cyclic parent pointers
// avoided" — nodes never point back to a parent).

use crate::model::Handle;
use crate::tile_index::TILING;

const CHILD_COUNT: usize = (TILING * TILING) as usize;

/// One node of the pyramid: a fixed-size child slot vector (lazily
/// allocated), the handles of every item reachable through this node, and
/// how many of those are currently selected.
#[derive(Debug, Default)]
pub struct Tile {
    children: Option<Vec<Option<Box<Tile>>>>,
    items: Vec<Handle>,
    selected_count: usize,
    /// Lazy cache of `get_tile_representative`'s result for one sort key
    /// (§4.3). Invalidated conservatively on every mutation that touches
    /// this tile's `items`, per the §9 open-question decision: the original
    /// does not clearly define invalidation on item move, so this
    /// implementation just drops the cache whenever `items` changes.
    representative_cache: Option<(i32, Handle)>,
}

impl Tile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Handle] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn selected_count(&self) -> usize {
        self.selected_count
    }

    pub fn is_subdivided(&self) -> bool {
        self.children.is_some()
    }

    pub fn child(&self, linear_index: u8) -> Option<&Tile> {
        self.children
            .as_ref()
            .and_then(|c| c[linear_index as usize].as_deref())
    }

    pub fn child_mut(&mut self, linear_index: u8) -> Option<&mut Tile> {
        self.children
            .as_mut()
            .and_then(|c| c[linear_index as usize].as_deref_mut())
    }

    /// Allocate the fixed child-slot vector. Does not populate any slot.
    pub fn subdivide(&mut self) {
        if self.children.is_none() {
            self.children = Some((0..CHILD_COUNT).map(|_| None).collect());
        }
    }

    /// Replace the slot at `linear_index`, taking ownership of `new_tile`.
    /// Subdivides first if necessary.
    pub fn add_child(&mut self, linear_index: u8, new_tile: Tile) {
        self.subdivide();
        self.children.as_mut().unwrap()[linear_index as usize] = Some(Box::new(new_tile));
    }

    /// Null the slot at `linear_index` without destroying `self`.
    pub fn clear_child(&mut self, linear_index: u8) -> Option<Box<Tile>> {
        self.children
            .as_mut()
            .and_then(|c| c[linear_index as usize].take())
    }

    /// Yield ownership of all children for bulk destruction, leaving this
    /// node un-subdivided.
    pub fn take_children(&mut self) -> Vec<Option<Box<Tile>>> {
        self.children.take().unwrap_or_default()
    }

    pub fn has_any_child(&self) -> bool {
        self.children
            .as_ref()
            .map(|c| c.iter().any(|slot| slot.is_some()))
            .unwrap_or(false)
    }

    /// Append `handle` to `items`, bumping `selected_count` if `selected`.
    pub fn add_item(&mut self, handle: Handle, selected: bool) {
        self.items.push(handle);
        if selected {
            self.selected_count += 1;
        }
        self.representative_cache = None;
    }

    pub fn cached_representative(&self, sort_key: i32) -> Option<Handle> {
        self.representative_cache
            .and_then(|(key, handle)| (key == sort_key).then_some(handle))
    }

    pub fn cache_representative(&mut self, sort_key: i32, handle: Handle) {
        self.representative_cache = Some((sort_key, handle));
    }

    /// Walk `items` from the front, dropping any handle for which
    /// `is_stale` returns true, then remove the first remaining match for
    /// `handle`. Returns whether `handle` was found (and thus whether a
    /// selection-count decrement, if requested by the caller, applies).
    ///
    /// Tolerating stale entries here is what lets the removal path cope
    /// with a host model that invalidated a row before notifying this
    /// engine (§4.2).
    pub fn remove_item_or_stale(
        &mut self,
        handle: Handle,
        is_stale: impl Fn(Handle) -> bool,
    ) -> bool {
        let found = self.items.iter().any(|&h| h == handle);
        self.items.retain(|&h| h != handle && !is_stale(h));
        self.representative_cache = None;
        found
    }

    /// Decrement `selected_count`, clamping at zero. Per §7, a negative
    /// count is rejected: debug builds assert, release builds clamp.
    pub fn decrement_selected(&mut self) {
        debug_assert!(self.selected_count > 0, "selected_count underflow");
        self.selected_count = self.selected_count.saturating_sub(1);
    }

    /// Increment `selected_count`, clamping at `item_count`. Per §7, a count
    /// exceeding item_count is rejected: debug builds assert, release
    /// builds clamp.
    pub fn increment_selected(&mut self) {
        debug_assert!(
            self.selected_count < self.items.len(),
            "selected_count overflow"
        );
        if self.selected_count < self.items.len() {
            self.selected_count += 1;
        } else {
            log::warn!("selected_count clamped at item_count in release build");
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.selected_count = 0;
        self.children = None;
        self.representative_cache = None;
    }
}
