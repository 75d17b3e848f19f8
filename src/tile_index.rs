//! Hierarchical tile addressing.
//
// Grounded on `tileindex.h` / `markermodel.h::TileIndex` from the KDE
// original and, for the iteration idiom of walking a fixed-size index array,
// on the teacher's `tms_iterator.rs`/`tms.rs` tile arithmetic.

use crate::geo::GeoCoordinate;

/// Number of cells a tile is subdivided into along each axis.
pub const TILING: i32 = 10;
/// Deepest representable level (10 levels total, 0..=9).
pub const MAX_LEVEL: u8 = 9;
const MAX_INDEX_COUNT: usize = (MAX_LEVEL as usize) + 1;

/// Which corner of a tile's cell to resolve to a [`GeoCoordinate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    SouthWest,
    NorthWest,
    SouthEast,
    NorthEast,
}

/// A path from the root of the tile pyramid down to some level, as a
/// sequence of linear indices each in `[0, TILING*TILING)`.
///
/// `TileIndex` is a plain value: comparing, truncating (`one_up`), and
/// slicing (`mid`) it never touches a pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    indices: [u8; MAX_INDEX_COUNT],
    count: u8,
}

impl Default for TileIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TileIndex {
    pub fn new() -> Self {
        Self {
            indices: [0; MAX_INDEX_COUNT],
            count: 0,
        }
    }

    /// Number of linear indices stored (0 for the root).
    pub fn index_count(&self) -> u8 {
        self.count
    }

    /// Depth of this index. The original returns 0 for an empty index as
    /// well as for a single-element one; preserved here for parity.
    pub fn level(&self) -> u8 {
        if self.count > 0 {
            self.count - 1
        } else {
            0
        }
    }

    pub fn clear(&mut self) {
        self.count = 0;
    }

    pub fn append_linear_index(&mut self, new_index: u8) {
        debug_assert!((self.count as usize) < MAX_INDEX_COUNT);
        debug_assert!((new_index as i32) < TILING * TILING);
        self.indices[self.count as usize] = new_index;
        self.count += 1;
    }

    pub fn append_lat_lon_index(&mut self, lat_index: u8, lon_index: u8) {
        self.append_linear_index(lat_index * TILING as u8 + lon_index);
    }

    /// The linear index at `level`. `level` must be `<= self.level()`.
    pub fn at(&self, level: u8) -> u8 {
        debug_assert!(level <= self.level());
        self.indices[level as usize]
    }

    pub fn lat_index(&self, level: u8) -> u8 {
        self.at(level) / TILING as u8
    }

    pub fn lon_index(&self, level: u8) -> u8 {
        self.at(level) % TILING as u8
    }

    pub fn last_index(&self) -> u8 {
        debug_assert!(self.count > 0);
        self.indices[(self.count - 1) as usize]
    }

    /// Drop the deepest level, in place.
    pub fn one_up(&mut self) {
        debug_assert!(self.count > 0);
        self.count -= 1;
    }

    /// A sub-range `[first, first+len)` of this index's levels, as a new
    /// (shorter) `TileIndex`.
    pub fn mid(&self, first: u8, len: u8) -> TileIndex {
        debug_assert!((first + len) as usize <= self.count as usize);
        let mut result = TileIndex::new();
        for i in first..first + len {
            result.append_linear_index(self.indices[i as usize]);
        }
        result
    }

    /// Whether `a` and `b` agree on every level up to and including
    /// `up_to_level`.
    pub fn indices_equal(a: &TileIndex, b: &TileIndex, up_to_level: u8) -> bool {
        debug_assert!(a.level() >= up_to_level);
        debug_assert!(b.level() >= up_to_level);
        (0..=up_to_level).all(|i| a.at(i) == b.at(i))
    }

    pub fn to_int_vec(&self) -> Vec<u8> {
        self.indices[..self.count as usize].to_vec()
    }

    pub fn from_int_vec(values: &[u8]) -> TileIndex {
        let mut result = TileIndex::new();
        for &v in values {
            result.append_linear_index(v);
        }
        result
    }

    /// Compute the full tile-index path of `coordinate` down to `level`.
    ///
    /// At each level the current cell's lat/lon division is rounded to an
    /// integer index and clamped into `[0, TILING)`; this clamp is what
    /// keeps a coordinate sitting exactly on a tile boundary (or at a pole,
    /// or on the antimeridian) from ever producing an out-of-range index,
    /// and the clamp at one level never leaks into the computation of the
    /// next (the rectangle update always uses the clamped index).
    pub fn from_coordinates(coordinate: &GeoCoordinate, level: u8) -> TileIndex {
        debug_assert!(level <= MAX_LEVEL);

        let mut tile_lat_bl: f64 = -90.0;
        let mut tile_lon_bl: f64 = -180.0;
        let mut tile_lat_height: f64 = 180.0;
        let mut tile_lon_width: f64 = 360.0;

        let mut result = TileIndex::new();
        if !coordinate.has_coordinates() {
            return result;
        }

        for _ in 0..=level {
            let d_lat = tile_lat_height / TILING as f64;
            let d_lon = tile_lon_width / TILING as f64;

            let mut lat_index = ((coordinate.lat() - tile_lat_bl) / d_lat).floor() as i32;
            let mut lon_index = ((coordinate.lon() - tile_lon_bl) / d_lon).floor() as i32;

            if lat_index < 0 {
                lat_index = 0;
            } else if lat_index >= TILING {
                lat_index = TILING - 1;
            }
            if lon_index < 0 {
                lon_index = 0;
            } else if lon_index >= TILING {
                lon_index = TILING - 1;
            }

            result.append_lat_lon_index(lat_index as u8, lon_index as u8);

            tile_lat_bl += lat_index as f64 * d_lat;
            tile_lon_bl += lon_index as f64 * d_lon;
            tile_lat_height = d_lat;
            tile_lon_width = d_lon;
        }

        result
    }

    /// The south-west corner of the cell this index addresses.
    pub fn to_coordinates(&self) -> GeoCoordinate {
        self.to_coordinates_corner(Corner::SouthWest)
    }

    /// Any corner of the cell this index addresses.
    pub fn to_coordinates_corner(&self, corner: Corner) -> GeoCoordinate {
        let mut tile_lat_bl: f64 = -90.0;
        let mut tile_lon_bl: f64 = -180.0;
        let mut tile_lat_height: f64 = 180.0;
        let mut tile_lon_width: f64 = 360.0;

        for l in 0..self.count {
            let d_lat = tile_lat_height / TILING as f64;
            let d_lon = tile_lon_width / TILING as f64;

            let lat_index = self.lat_index(l);
            let lon_index = self.lon_index(l);

            tile_lat_bl += lat_index as f64 * d_lat;
            tile_lon_bl += lon_index as f64 * d_lon;
            tile_lat_height = d_lat;
            tile_lon_width = d_lon;
        }

        let (lat, lon) = match corner {
            Corner::SouthWest => (tile_lat_bl, tile_lon_bl),
            Corner::NorthWest => (tile_lat_bl + tile_lat_height, tile_lon_bl),
            Corner::SouthEast => (tile_lat_bl, tile_lon_bl + tile_lon_width),
            Corner::NorthEast => (tile_lat_bl + tile_lat_height, tile_lon_bl + tile_lon_width),
        };
        GeoCoordinate::new(lat, lon)
    }
}
