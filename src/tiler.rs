//! The abstract tiler capability contract and the non-empty, bounded,
//! level-restricted iterator built on top of it (§4.4, §4.3 "Non-empty
//! iterator").
//
// The iterator's traversal order is ported directly from
// `AbstractMarkerTiler::NonEmptyIterator::nextIndex()` in the KDE original
// (`abstractmarkertiler.cpp`): lat-then-lon advance within the current
// level's limits, popping a level when the limit is exceeded, descending to
// the north-west-most in-bounds cell when a non-empty tile above the target
// level is found. Recursion into the next bounds pair is turned into a loop
// iteration here instead of the original's direct recursive call.

use std::collections::VecDeque;

use crate::geo::GeoBoundsPair;
use crate::group_state::Ternary;
use crate::model::Handle;
use crate::tile_index::{TileIndex, MAX_LEVEL, TILING};

/// Operations the clusterer (or any other consumer) needs from a tiler,
/// regardless of how it maintains its pyramid (§4.4). [`ItemTiler`](crate::item_tiler::ItemTiler)
/// is the concrete implementation bound to an external item model; the
/// contract itself allows substituting a different one (e.g. a tiler that
/// owns its items directly).
pub trait AbstractTiler {
    /// Number of items reachable through the tile at `index`. Triggers
    /// lazy regeneration if the pyramid is dirty, and lazy subdivision
    /// along the path as needed.
    fn get_tile_item_count(&mut self, index: &TileIndex) -> usize;

    fn get_tile_selected_count(&mut self, index: &TileIndex) -> usize;

    fn get_tile_item_handles(&mut self, index: &TileIndex) -> Vec<Handle>;

    /// `All` / `Some` / `None` for the selected attribute (§7).
    fn get_tile_group_state(&mut self, index: &TileIndex) -> Ternary;

    fn get_tile_representative(&mut self, index: &TileIndex, sort_key: i32) -> Option<Handle>;

    fn is_dirty(&self) -> bool;
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Axis {
    Lat,
    Lon,
}

fn prefix_matches(a: &TileIndex, b: &TileIndex, compare_up_to: Option<u8>, axis: Axis) -> bool {
    match compare_up_to {
        None => true,
        Some(max) => (0..=max).all(|i| match axis {
            Axis::Lat => a.lat_index(i) == b.lat_index(i),
            Axis::Lon => a.lon_index(i) == b.lon_index(i),
        }),
    }
}

/// Yields every [`TileIndex`] at a fixed target level whose tile is
/// non-empty and which lies within at least one of the given bounds pairs.
///
/// Bounds pairs must already be normalized (§6.4: `first.lat <= second.lat`
/// and `first.lon <= second.lon`); this type does not split antimeridian
/// crossings itself.
pub struct NonEmptyIterator<'a, T: AbstractTiler + ?Sized> {
    tiler: &'a mut T,
    level: u8,
    bounds_list: VecDeque<(TileIndex, TileIndex)>,
    start_index: TileIndex,
    end_index: TileIndex,
    current_index: TileIndex,
    at_end: bool,
    at_start_of_level: bool,
}

impl<'a, T: AbstractTiler + ?Sized> NonEmptyIterator<'a, T> {
    /// Iterate the whole globe at `level`.
    pub fn whole_globe(tiler: &'a mut T, level: u8) -> Self {
        debug_assert!(level <= MAX_LEVEL);
        let mut start = TileIndex::new();
        let mut end = TileIndex::new();
        for _ in 0..=level {
            start.append_linear_index(0);
            end.append_linear_index((TILING * TILING - 1) as u8);
        }
        Self::from_bounds_list(tiler, level, vec![(start, end)])
    }

    /// Iterate `level` restricted to the given geographic bounds pairs.
    /// Pairs must be normalized (§6.4).
    pub fn bounded(tiler: &'a mut T, level: u8, bounds: &[GeoBoundsPair]) -> Self {
        debug_assert!(level <= MAX_LEVEL);
        let pairs = bounds
            .iter()
            .map(|(sw, ne)| {
                debug_assert!(sw.lat() <= ne.lat() && sw.lon() <= ne.lon());
                (
                    TileIndex::from_coordinates(sw, level),
                    TileIndex::from_coordinates(ne, level),
                )
            })
            .collect();
        Self::from_bounds_list(tiler, level, pairs)
    }

    fn from_bounds_list(tiler: &'a mut T, level: u8, bounds: Vec<(TileIndex, TileIndex)>) -> Self {
        let mut it = Self {
            tiler,
            level,
            bounds_list: bounds.into(),
            start_index: TileIndex::new(),
            end_index: TileIndex::new(),
            current_index: TileIndex::new(),
            at_end: false,
            at_start_of_level: true,
        };
        it.initialize_next_bounds();
        it
    }

    /// Pop the next bounds pair, seed `current_index` at its start, and
    /// advance to the first valid tile under it (or mark `at_end` if no
    /// bounds pair remains).
    fn initialize_next_bounds(&mut self) {
        let Some((start, end)) = self.bounds_list.pop_front() else {
            self.at_end = true;
            return;
        };
        self.start_index = start;
        self.end_index = end;
        self.current_index = start.mid(0, 1);
        self.at_start_of_level = true;
        self.advance();
    }

    fn limits_for(&self, target_level: u8, compare_up_to: Option<u8>) -> (u8, u8, u8, u8) {
        let tiling_max = (TILING - 1) as u8;
        let mut lat_bl = 0u8;
        let mut lon_bl = 0u8;
        let mut lat_tr = tiling_max;
        let mut lon_tr = tiling_max;

        if prefix_matches(&self.current_index, &self.start_index, compare_up_to, Axis::Lat) {
            lat_bl = self.start_index.lat_index(target_level);
        }
        if prefix_matches(&self.current_index, &self.start_index, compare_up_to, Axis::Lon) {
            lon_bl = self.start_index.lon_index(target_level);
        }
        if prefix_matches(&self.current_index, &self.end_index, compare_up_to, Axis::Lat) {
            lat_tr = self.end_index.lat_index(target_level);
        }
        if prefix_matches(&self.current_index, &self.end_index, compare_up_to, Axis::Lon) {
            lon_tr = self.end_index.lon_index(target_level);
        }
        (lat_bl, lon_bl, lat_tr, lon_tr)
    }

    /// Move `current_index` forward until it names a non-empty tile at the
    /// target level, or set `at_end`.
    fn advance(&mut self) {
        if self.at_end {
            return;
        }
        loop {
            let current_level = self.current_index.level();

            if self.at_start_of_level {
                self.at_start_of_level = false;
            } else {
                let compare_up_to = if current_level == 0 { None } else { Some(current_level - 1) };
                let (lat_bl, lon_bl, lat_tr, lon_tr) = self.limits_for(current_level, compare_up_to);

                let mut current_lat = self.current_index.lat_index(current_level);
                let mut current_lon = self.current_index.lon_index(current_level);

                current_lon += 1;
                if current_lon > lon_tr {
                    current_lon = lon_bl;
                    current_lat += 1;
                    if current_lat > lat_tr {
                        if current_level == 0 {
                            self.initialize_next_bounds();
                            return;
                        }
                        self.current_index.one_up();
                        continue;
                    }
                }

                self.current_index.one_up();
                self.current_index.append_lat_lon_index(current_lat, current_lon);
            }

            if self.tiler.get_tile_item_count(&self.current_index) == 0 {
                continue;
            }

            if current_level == self.level {
                return;
            }

            let (lat_bl, lon_bl, _, _) = self.limits_for(current_level + 1, Some(current_level));
            self.current_index.append_lat_lon_index(lat_bl, lon_bl);
            self.at_start_of_level = true;
        }
    }
}

impl<'a, T: AbstractTiler + ?Sized> Iterator for NonEmptyIterator<'a, T> {
    type Item = TileIndex;

    fn next(&mut self) -> Option<TileIndex> {
        if self.at_end {
            return None;
        }
        let result = self.current_index;
        self.advance();
        Some(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    /// A tiler backed by an explicit set of non-empty full-depth indices,
    /// used only to exercise the iterator's traversal order in isolation
    /// from `ItemTiler`.
    struct FakeTiler {
        non_empty: HashSet<TileIndex>,
    }

    impl FakeTiler {
        fn from_coordinates(coords: &[(f64, f64)]) -> Self {
            let mut non_empty = HashSet::new();
            for &(lat, lon) in coords {
                let c = crate::geo::GeoCoordinate::new(lat, lon);
                for level in 0..=MAX_LEVEL {
                    non_empty.insert(TileIndex::from_coordinates(&c, level));
                }
            }
            Self { non_empty }
        }
    }

    impl AbstractTiler for FakeTiler {
        fn get_tile_item_count(&mut self, index: &TileIndex) -> usize {
            usize::from(self.non_empty.contains(index))
        }
        fn get_tile_selected_count(&mut self, _index: &TileIndex) -> usize {
            0
        }
        fn get_tile_item_handles(&mut self, _index: &TileIndex) -> Vec<Handle> {
            Vec::new()
        }
        fn get_tile_group_state(&mut self, _index: &TileIndex) -> Ternary {
            Ternary::None
        }
        fn get_tile_representative(&mut self, _index: &TileIndex, _sort_key: i32) -> Option<Handle> {
            None
        }
        fn is_dirty(&self) -> bool {
            false
        }
    }

    #[test]
    fn whole_globe_yields_one_tile_per_distinct_far_apart_coordinate() {
        let mut tiler = FakeTiler::from_coordinates(&[(1.0, 2.0), (50.0, 60.0)]);
        for level in 0..=MAX_LEVEL {
            let results: Vec<_> = NonEmptyIterator::whole_globe(&mut tiler, level).collect();
            assert_eq!(results.len(), 2, "level {level}");
        }
    }

    #[test]
    fn empty_tiler_yields_nothing() {
        let mut tiler = FakeTiler::from_coordinates(&[]);
        let results: Vec<_> = NonEmptyIterator::whole_globe(&mut tiler, 3).collect();
        assert!(results.is_empty());
    }

    #[test]
    fn bounds_restriction_excludes_out_of_range_items() {
        let mut tiler = FakeTiler::from_coordinates(&[(1.0, 2.0), (50.0, 60.0)]);
        let sw = crate::geo::GeoCoordinate::new(0.0, 0.0);
        let ne = crate::geo::GeoCoordinate::new(1.0, 2.0);
        let results: Vec<_> = NonEmptyIterator::bounded(&mut tiler, 1, &[(sw, ne)]).collect();
        assert_eq!(results.len(), 1);

        let sw2 = crate::geo::GeoCoordinate::new(-10.0, -10.0);
        let ne2 = crate::geo::GeoCoordinate::new(-5.0, -5.0);
        let results2: Vec<_> = NonEmptyIterator::bounded(&mut tiler, 1, &[(sw2, ne2)]).collect();
        assert!(results2.is_empty());
    }
}
