//! The concrete tiler bound to an external item model (§4.3).
//
// Grounded on `MarkerModel::getTile`/`coordinateToTileIndex` in
// `markermodel.cpp` (lazy subdivision + redistribution on first descent)
// and on `ItemMarkerTiler`'s notification wiring described in
// `itemmarkertiler.h` (insert/remove/move/selection-change handlers).

use log::{debug, trace};

use crate::geo::GeoCoordinate;
use crate::group_state::{GroupState, Ternary};
use crate::model::{Handle, ItemModel, SelectionModel};
use crate::tile::Tile;
use crate::tile_index::{TileIndex, MAX_LEVEL};
use crate::tiler::AbstractTiler;

/// A pyramid maintained incrementally against an [`ItemModel`] and
/// [`SelectionModel`] pair (§4.3).
pub struct ItemTiler<M: ItemModel, S: SelectionModel> {
    model: M,
    selection: S,
    root: Tile,
    is_dirty: bool,
}

impl<M: ItemModel, S: SelectionModel> ItemTiler<M, S> {
    pub fn new(model: M, selection: S) -> Self {
        Self {
            model,
            selection,
            root: Tile::new(),
            is_dirty: true,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn selection(&self) -> &S {
        &self.selection
    }

    /// Destroy the entire pyramid and reinsert every model row from
    /// scratch (§4.3 "Dirty flag and regeneration").
    fn regenerate(&mut self) {
        trace!("regenerating tile pyramid from the item model");
        self.root.clear();
        self.is_dirty = false;
        for row in 0..self.model.row_count() {
            let handle = self.model.handle_at(row);
            self.insert_at_root(handle);
        }
    }

    fn insert_at_root(&mut self, handle: Handle) {
        let Some(coord) = self.model.item_coordinates(handle) else {
            return;
        };
        let selected = self.selection.is_selected(handle);
        insert_item(&mut self.root, handle, &coord, selected);
    }

    /// Walk the path to `index`, subdividing and redistributing items as
    /// it descends (§4.3 `get_tile`). `stop_if_empty` makes a missing
    /// child short-circuit to `None` instead of being created.
    fn get_tile_mut(&mut self, index: &TileIndex, stop_if_empty: bool) -> Option<&mut Tile> {
        if self.is_dirty {
            self.regenerate();
        }
        if index.index_count() == 0 {
            return Some(&mut self.root);
        }

        let level = index.level();
        let model = &self.model;
        let selection = &self.selection;
        let mut node = &mut self.root;

        for cur_level in 0..=level {
            if !node.is_subdivided() {
                node.subdivide();
                let items = node.items().to_vec();
                for handle in items {
                    if let Some(coord) = model.item_coordinates(handle) {
                        let linear = TileIndex::from_coordinates(&coord, cur_level).at(cur_level);
                        if node.child(linear).is_none() {
                            node.add_child(linear, Tile::new());
                        }
                        node.child_mut(linear)
                            .unwrap()
                            .add_item(handle, selection.is_selected(handle));
                    }
                }
            }

            let linear = index.at(cur_level);
            if node.child(linear).is_none() {
                if stop_if_empty {
                    return None;
                }
                node.add_child(linear, Tile::new());
            }
            node = node.child_mut(linear).unwrap();
        }
        Some(node)
    }

    pub fn get_tile(&mut self, index: &TileIndex, stop_if_empty: bool) -> Option<&Tile> {
        self.get_tile_mut(index, stop_if_empty).map(|t| &*t)
    }

    /// Insert a freshly-known item (§4.3 "Insertion algorithm").
    pub fn add_item(&mut self, handle: Handle) {
        if self.is_dirty {
            self.regenerate();
            return;
        }
        self.insert_at_root(handle);
    }

    fn add_item_at(&mut self, handle: Handle, coord: GeoCoordinate) {
        if self.is_dirty {
            self.regenerate();
            return;
        }
        let selected = self.selection.is_selected(handle);
        insert_item(&mut self.root, handle, &coord, selected);
    }

    /// Remove a known item (§4.3 "Removal algorithm"). `ignore_selection`
    /// suppresses the `selected_count` decrement, for the case where an
    /// independent `selection_changed` notification will perform it.
    pub fn remove_item(&mut self, handle: Handle, ignore_selection: bool) {
        if self.is_dirty {
            self.regenerate();
            return;
        }
        match self.model.item_coordinates(handle) {
            Some(coord) => {
                let full_index = TileIndex::from_coordinates(&coord, MAX_LEVEL);
                let decrement_if_found = !ignore_selection && self.selection.is_selected(handle);
                let model = &self.model;
                remove_item(
                    &mut self.root,
                    handle,
                    decrement_if_found,
                    &full_index,
                    0,
                    &|h| model.item_coordinates(h).is_none(),
                );
            }
            None => {
                debug!(
                    "coordinates unavailable for handle {handle:?} at remove time; marking pyramid dirty"
                );
                self.is_dirty = true;
            }
        }
    }

    /// A move is a remove under the old coordinate followed by an insert
    /// under the new one (§4.3 "Move algorithm"). The old coordinate is
    /// read from the model, so this must be called before the host updates
    /// its own stored coordinate for `handle`.
    pub fn move_item(&mut self, handle: Handle, new_coordinate: GeoCoordinate) {
        self.remove_item(handle, true);
        self.add_item_at(handle, new_coordinate);
    }

    /// §4.3/§6.2: walk the existing path for `handle` and adjust
    /// `selected_count` at every existing ancestor, without subdividing
    /// further.
    fn adjust_selection(&mut self, handle: Handle, now_selected: bool) {
        let Some(coord) = self.model.item_coordinates(handle) else {
            return;
        };
        let full_index = TileIndex::from_coordinates(&coord, MAX_LEVEL);
        adjust_selection_path(&mut self.root, &full_index, 0, now_selected);
    }

    // --- notification entry points (§6.1, §6.2, §9) ---

    pub fn rows_inserted(&mut self, first: usize, last: usize) {
        for row in first..=last {
            let handle = self.model.handle_at(row);
            self.add_item(handle);
        }
    }

    pub fn rows_about_to_be_removed(&mut self, first: usize, last: usize) {
        for row in first..=last {
            let handle = self.model.handle_at(row);
            // The selection model independently emits deselection for the
            // same row, so the decrement here is suppressed to avoid
            // double-counting (§4.3 rationale for `ignore_selection`).
            self.remove_item(handle, true);
        }
    }

    pub fn data_changed(&mut self) {
        self.is_dirty = true;
    }

    pub fn model_reset(&mut self) {
        self.is_dirty = true;
    }

    pub fn selection_changed(&mut self, selected: &[Handle], deselected: &[Handle]) {
        for &handle in selected {
            self.adjust_selection(handle, true);
        }
        for &handle in deselected {
            self.adjust_selection(handle, false);
        }
    }

    pub fn set_dirty(&mut self) {
        self.is_dirty = true;
    }
}

impl<M: ItemModel, S: SelectionModel> AbstractTiler for ItemTiler<M, S> {
    fn get_tile_item_count(&mut self, index: &TileIndex) -> usize {
        self.get_tile_mut(index, true).map_or(0, |t| t.item_count())
    }

    fn get_tile_selected_count(&mut self, index: &TileIndex) -> usize {
        self.get_tile_mut(index, true)
            .map_or(0, |t| t.selected_count())
    }

    fn get_tile_item_handles(&mut self, index: &TileIndex) -> Vec<Handle> {
        self.get_tile_mut(index, true)
            .map_or_else(Vec::new, |t| t.items().to_vec())
    }

    fn get_tile_group_state(&mut self, index: &TileIndex) -> Ternary {
        match self.get_tile_mut(index, true) {
            Some(t) => GroupState::from_selection_counts(t.selected_count(), t.item_count()),
            None => Ternary::None,
        }
    }

    fn get_tile_representative(&mut self, index: &TileIndex, sort_key: i32) -> Option<Handle> {
        let tile = self.get_tile_mut(index, true)?;
        if let Some(cached) = tile.cached_representative(sort_key) {
            return Some(cached);
        }
        let items = tile.items().to_vec();
        let chosen = self.model.best_representative(&items, sort_key)?;
        self.get_tile_mut(index, true)
            .unwrap()
            .cache_representative(sort_key, chosen);
        Some(chosen)
    }

    fn is_dirty(&self) -> bool {
        self.is_dirty
    }
}

/// Append `handle` to every existing ancestor along its full-depth path,
/// descending only while nodes are already subdivided (§4.3 "Insertion
/// algorithm" — subdivision is never forced by a plain insert).
fn insert_item(root: &mut Tile, handle: Handle, coord: &GeoCoordinate, selected: bool) {
    let full_index = TileIndex::from_coordinates(coord, MAX_LEVEL);
    let mut node = root;
    let mut depth = 0u8;
    loop {
        node.add_item(handle, selected);
        if depth > MAX_LEVEL || !node.is_subdivided() {
            break;
        }
        let linear = full_index.at(depth);
        if node.child(linear).is_none() {
            node.add_child(linear, Tile::new());
        }
        node = node.child_mut(linear).unwrap();
        depth += 1;
    }
}

/// Remove `handle` (tolerating stale entries) from every existing node
/// along `full_index`, then prune any node left empty, root excluded
/// (§4.3 "Removal algorithm").
fn remove_item(
    tile: &mut Tile,
    handle: Handle,
    decrement_if_found: bool,
    full_index: &TileIndex,
    level: u8,
    is_stale: &impl Fn(Handle) -> bool,
) {
    let found = tile.remove_item_or_stale(handle, is_stale);
    if found && decrement_if_found {
        tile.decrement_selected();
    }
    if level > MAX_LEVEL {
        return;
    }
    let linear = full_index.at(level);
    if let Some(child) = tile.child_mut(linear) {
        remove_item(child, handle, decrement_if_found, full_index, level + 1, is_stale);
        if child.item_count() == 0 {
            tile.clear_child(linear);
        }
    }
}

fn adjust_selection_path(tile: &mut Tile, full_index: &TileIndex, level: u8, now_selected: bool) {
    if now_selected {
        tile.increment_selected();
    } else {
        tile.decrement_selected();
    }
    if level > MAX_LEVEL {
        return;
    }
    let linear = full_index.at(level);
    if let Some(child) = tile.child_mut(linear) {
        adjust_selection_path(child, full_index, level + 1, now_selected);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeModel {
        rows: RefCell<Vec<Handle>>,
        coords: RefCell<HashMap<Handle, GeoCoordinate>>,
    }

    impl FakeModel {
        fn push(&self, handle: Handle, coord: GeoCoordinate) {
            self.rows.borrow_mut().push(handle);
            self.coords.borrow_mut().insert(handle, coord);
        }

        fn remove_row(&self, handle: Handle) {
            self.rows.borrow_mut().retain(|&h| h != handle);
            self.coords.borrow_mut().remove(&handle);
        }

        fn set_coord(&self, handle: Handle, coord: GeoCoordinate) {
            self.coords.borrow_mut().insert(handle, coord);
        }
    }

    impl ItemModel for FakeModel {
        fn row_count(&self) -> usize {
            self.rows.borrow().len()
        }
        fn handle_at(&self, row: usize) -> Handle {
            self.rows.borrow()[row]
        }
        fn item_coordinates(&self, handle: Handle) -> Option<GeoCoordinate> {
            self.coords.borrow().get(&handle).copied()
        }
    }

    #[derive(Default)]
    struct FakeSelection {
        selected: RefCell<std::collections::HashSet<Handle>>,
    }

    impl FakeSelection {
        fn select(&self, handle: Handle) {
            self.selected.borrow_mut().insert(handle);
        }
        fn deselect(&self, handle: Handle) {
            self.selected.borrow_mut().remove(&handle);
        }
    }

    impl SelectionModel for FakeSelection {
        fn is_selected(&self, handle: Handle) -> bool {
            self.selected.borrow().contains(&handle)
        }
    }

    fn tiler() -> ItemTiler<FakeModel, FakeSelection> {
        ItemTiler::new(FakeModel::default(), FakeSelection::default())
    }

    fn globe_counts(tiler: &mut ItemTiler<FakeModel, FakeSelection>, level: u8) -> usize {
        crate::tiler::NonEmptyIterator::whole_globe(tiler, level).count()
    }

    #[test]
    fn s1_insert_only() {
        let mut t = tiler();
        let a = Handle(1);
        let b = Handle(2);
        t.model().push(a, GeoCoordinate::new(1.0, 2.0));
        t.add_item(a);
        t.model().push(b, GeoCoordinate::new(50.0, 60.0));
        t.add_item(b);

        for level in 0..=MAX_LEVEL {
            assert_eq!(globe_counts(&mut t, level), 2, "level {level}");
        }
    }

    #[test]
    fn s2_bounds_restriction() {
        let mut t = tiler();
        t.model().push(Handle(1), GeoCoordinate::new(1.0, 2.0));
        t.add_item(Handle(1));
        t.model().push(Handle(2), GeoCoordinate::new(50.0, 60.0));
        t.add_item(Handle(2));

        let narrow = (GeoCoordinate::new(0.0, 0.0), GeoCoordinate::new(1.0, 2.0));
        let wide = (GeoCoordinate::new(0.0, 0.0), GeoCoordinate::new(60.0, 60.0));
        let empty = (GeoCoordinate::new(-10.0, -10.0), GeoCoordinate::new(-5.0, -5.0));

        assert_eq!(
            crate::tiler::NonEmptyIterator::bounded(&mut t, 1, &[narrow]).count(),
            1
        );
        assert_eq!(
            crate::tiler::NonEmptyIterator::bounded(&mut t, 1, &[wide]).count(),
            2
        );
        assert_eq!(
            crate::tiler::NonEmptyIterator::bounded(&mut t, 1, &[empty]).count(),
            0
        );
    }

    #[test]
    fn s3_remove() {
        let mut t = tiler();
        let a = Handle(1);
        let b = Handle(2);
        t.model().push(a, GeoCoordinate::new(1.0, 2.0));
        t.add_item(a);
        t.model().push(b, GeoCoordinate::new(50.0, 60.0));
        t.add_item(b);

        t.model().remove_row(a);
        t.remove_item(a, false);

        for level in 0..=MAX_LEVEL {
            assert_eq!(globe_counts(&mut t, level), 1, "level {level}");
            let idx = TileIndex::from_coordinates(&GeoCoordinate::new(1.0, 2.0), level);
            assert!(t.get_tile(&idx, true).is_none());
        }
    }

    #[test]
    fn s4_move() {
        let mut t = tiler();
        let a = Handle(1);
        let b = Handle(2);
        t.model().push(a, GeoCoordinate::new(1.0, 2.0));
        t.add_item(a);
        t.model().push(b, GeoCoordinate::new(1.0, 2.0));
        t.add_item(b);
        assert_eq!(globe_counts(&mut t, MAX_LEVEL), 1);

        // move_item reads the handle's *current* coordinate from the model
        // to find its old path, so it must run before the host updates its
        // own stored coordinate.
        t.move_item(a, GeoCoordinate::new(50.0, 60.0));
        t.model().set_coord(a, GeoCoordinate::new(50.0, 60.0));

        for level in 0..=MAX_LEVEL {
            assert_eq!(globe_counts(&mut t, level), 2, "level {level}");
        }
        let old_idx = TileIndex::from_coordinates(&GeoCoordinate::new(1.0, 2.0), MAX_LEVEL);
        let new_idx = TileIndex::from_coordinates(&GeoCoordinate::new(50.0, 60.0), MAX_LEVEL);
        assert_eq!(t.get_tile_item_count(&old_idx), 1);
        assert_eq!(t.get_tile_item_count(&new_idx), 1);
    }

    #[test]
    fn s5_selection_propagation() {
        let mut t = tiler();
        let a = Handle(1);
        let b = Handle(2);
        t.model().push(a, GeoCoordinate::new(50.0, 60.0));
        t.add_item(a);
        t.selection().select(a);
        t.selection_changed(&[a], &[]);

        let idx = TileIndex::from_coordinates(&GeoCoordinate::new(50.0, 60.0), 3);
        assert_eq!(t.get_tile_group_state(&idx), Ternary::All);
        assert_eq!(t.get_tile_selected_count(&idx), 1);

        t.model().push(b, GeoCoordinate::new(50.0, 60.0));
        t.add_item(b);
        assert_eq!(t.get_tile_group_state(&idx), Ternary::Some);
        assert_eq!(t.get_tile_selected_count(&idx), 1);
        assert_eq!(t.get_tile_item_count(&idx), 2);

        t.selection().select(b);
        t.selection_changed(&[b], &[]);
        assert_eq!(t.get_tile_group_state(&idx), Ternary::All);
        assert_eq!(t.get_tile_selected_count(&idx), 2);
    }

    #[test]
    fn s6_antimeridian_split_items_land_on_correct_side() {
        let mut t = tiler();
        let east = Handle(1);
        let west = Handle(2);
        t.model().push(east, GeoCoordinate::new(12.0, 175.0));
        t.add_item(east);
        t.model().push(west, GeoCoordinate::new(12.0, -175.0));
        t.add_item(west);

        let east_bounds = (GeoCoordinate::new(10.0, 20.0), GeoCoordinate::new(15.0, 180.0));
        let west_bounds = (GeoCoordinate::new(10.0, -180.0), GeoCoordinate::new(15.0, -170.0));

        assert_eq!(
            crate::tiler::NonEmptyIterator::bounded(&mut t, 2, &[east_bounds]).count(),
            1
        );
        assert_eq!(
            crate::tiler::NonEmptyIterator::bounded(&mut t, 2, &[west_bounds]).count(),
            1
        );
    }

    #[test]
    fn stale_handle_tolerated_before_notification() {
        let mut t = tiler();
        let a = Handle(1);
        t.model().push(a, GeoCoordinate::new(1.0, 2.0));
        t.add_item(a);

        let idx = TileIndex::from_coordinates(&GeoCoordinate::new(1.0, 2.0), 3);
        assert_eq!(t.get_tile_item_count(&idx), 1);

        // host deletes the row out from under the engine before notifying it
        t.model().remove_row(a);
        // queries must not panic
        assert_eq!(t.get_tile_item_count(&idx), 1);

        t.remove_item(a, false);
        assert_eq!(t.is_dirty(), true);
    }

    #[test]
    fn model_reset_forces_full_rebuild() {
        let mut t = tiler();
        t.model().push(Handle(1), GeoCoordinate::new(1.0, 2.0));
        t.add_item(Handle(1));
        t.model().push(Handle(2), GeoCoordinate::new(50.0, 60.0));
        t.add_item(Handle(2));
        assert_eq!(globe_counts(&mut t, 2), 2);

        t.model_reset();
        assert!(t.is_dirty());
        assert_eq!(globe_counts(&mut t, 2), 2);
        assert!(!t.is_dirty());
    }
}
