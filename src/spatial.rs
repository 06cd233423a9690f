//! Uniform-bucket spatial hashing for proximity queries.
//!
//! Points are bucketed by their truncated cell coordinates. A query visits the
//! 3×3×3 block of cells (27 buckets) around the query's own cell and returns
//! everything stored there, unfiltered; ranking the candidates is up to the
//! caller.
//!
//! # Choosing a cell size
//!
//! The cell size should be close to the expected nearest-neighbor distance.
//! Too small and the 27-cell window is often empty; too large and every query
//! degrades toward a linear scan.
//!
//! ```ignore
//! let mut grid = SpatialGrid::new(2.0);
//! grid.add(Vec3::new(0.5, 0.0, 0.0), "a");
//! grid.add(Vec3::new(50.0, 0.0, 0.0), "b");
//!
//! let near = grid.nearby(Vec3::ZERO);
//! assert_eq!(near.len(), 1);
//! ```

use std::collections::HashMap;

use glam::Vec3;

/// Integer cell coordinate used as the bucket key.
pub type CellKey = (i32, i32, i32);

/// Cell size used when a caller supplies a non-positive or non-finite one.
const FALLBACK_CELL_SIZE: f32 = 1.0;

/// Uniform spatial hash over 3D points carrying a payload `T`.
#[derive(Clone, Debug)]
pub struct SpatialGrid<T> {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<CellKey, Vec<(Vec3, T)>>,
    len: usize,
}

impl<T> SpatialGrid<T> {
    /// Create an empty grid with the given cell edge length.
    ///
    /// A non-positive cell size is replaced with `1.0` and a warning is logged.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            log::warn!(
                "SpatialGrid cell size {} is not positive, using {}",
                cell_size,
                FALLBACK_CELL_SIZE
            );
            FALLBACK_CELL_SIZE
        };

        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    /// Edge length of each cell in world units.
    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of stored entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the grid holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of occupied buckets.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Bucket key for a world position.
    #[inline]
    pub fn cell_of(&self, position: Vec3) -> CellKey {
        let scaled = (position * self.inv_cell_size).floor();
        (scaled.x as i32, scaled.y as i32, scaled.z as i32)
    }

    /// Insert a point with its payload.
    pub fn add(&mut self, position: Vec3, data: T) {
        let key = self.cell_of(position);
        self.cells.entry(key).or_default().push((position, data));
        self.len += 1;
    }

    /// Remove every entry. Bucket storage is dropped as well.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.len = 0;
    }

    /// Visit every entry in the 27 cells around `position`.
    pub fn for_each_nearby<F>(&self, position: Vec3, visit: F)
    where
        F: FnMut(Vec3, &T),
    {
        self.for_each_within_rings(position, 1, visit);
    }

    /// Visit every entry in the `(2 * rings + 1)^3` block of cells around
    /// `position`. `rings = 1` is the standard 27-cell neighborhood.
    pub fn for_each_within_rings<F>(&self, position: Vec3, rings: u32, mut visit: F)
    where
        F: FnMut(Vec3, &T),
    {
        let (cx, cy, cz) = self.cell_of(position);
        let r = rings as i32;
        for dz in -r..=r {
            for dy in -r..=r {
                for dx in -r..=r {
                    if let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                        for (point, data) in bucket {
                            visit(*point, data);
                        }
                    }
                }
            }
        }
    }

    /// Iterate over every stored entry in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (Vec3, &T)> + '_ {
        self.cells
            .values()
            .flat_map(|bucket| bucket.iter().map(|(p, d)| (*p, d)))
    }
}

impl<T: Clone> SpatialGrid<T> {
    /// Entries in the 27 cells around `position`.
    ///
    /// Returns an empty list when nothing is stored nearby; callers that need
    /// an answer regardless should fall back to scanning their own data.
    pub fn nearby(&self, position: Vec3) -> Vec<(Vec3, T)> {
        self.nearby_within_rings(position, 1)
    }

    /// Entries in the `(2 * rings + 1)^3` block of cells around `position`.
    pub fn nearby_within_rings(&self, position: Vec3, rings: u32) -> Vec<(Vec3, T)> {
        let mut out = Vec::new();
        self.for_each_within_rings(position, rings, |p, d| out.push((p, d.clone())));
        out
    }
}

impl<T> Default for SpatialGrid<T> {
    fn default() -> Self {
        Self::new(FALLBACK_CELL_SIZE)
    }
}
