use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::catalog::{Shape, SliceCatalog};
use crate::grid::Grid;

/// owner-map sentinel for a cell no rectangle covers
const NO_OWNER: usize = usize::MAX;

/// a placement map that cannot be realized on the grid. produced when
/// re-deriving occupancy from an untrusted source (checkpoint reload,
/// recombination assembly checks, tests).
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("anchor {anchor} refers to shape index {shape}, which is outside the catalog")]
    UnknownShape { anchor: usize, shape: usize },
    #[error("rectangle anchored at {anchor} extends past the grid boundary")]
    OutOfBounds { anchor: usize },
    #[error("rectangles anchored at {first} and {second} overlap")]
    Overlap { first: usize, second: usize },
    #[error("rectangle anchored at {anchor} holds fewer than {min} cells of each label")]
    Contents { anchor: usize, min: usize },
    #[error("derived occupancy state disagrees with the placement map")]
    StateDrift,
}

/// one candidate solution: a set of non-overlapping valid rectangles.
///
/// `placements` is the genome (anchor cell id of the top-left corner mapped
/// to a shape index in the catalog). `owner` and `empty` are derived state
/// kept consistent with `placements` by every mutating operation: `owner`
/// maps each cell to the anchor of the rectangle covering it, `empty` is the
/// set of uncovered cells. grid dimensions are carried so cell arithmetic
/// never needs the grid itself.
///
/// `empty` is an ordered set so that uniform sampling from it iterates in a
/// fixed order; with seeded RNGs this keeps whole runs reproducible.
#[derive(Clone, Debug)]
pub struct Partition {
    rows: usize,
    cols: usize,
    placements: HashMap<usize, usize>,
    owner: Vec<usize>,
    empty: BTreeSet<usize>,
}

impl Partition {
    /// a partition with every cell uncovered
    pub fn new_blank(grid: &Grid) -> Partition {
        let n = grid.cell_count();
        Partition {
            rows: grid.rows(),
            cols: grid.cols(),
            placements: HashMap::new(),
            owner: vec![NO_OWNER; n],
            empty: (0..n).collect(),
        }
    }

    /// rebuild a partition from a bare placement map, re-deriving occupancy
    /// and checking every invariant. this is the only door through which
    /// untrusted placement data (a reloaded checkpoint) may enter.
    pub fn from_placements(
        placements: HashMap<usize, usize>,
        grid: &Grid,
        catalog: &SliceCatalog,
    ) -> Result<Partition, LayoutError> {
        let mut part = Partition::new_blank(grid);
        let min = grid.min_per_label();

        let mut anchors: Vec<usize> = placements.keys().copied().collect();
        anchors.sort_unstable();
        for anchor in anchors {
            let k = placements[&anchor];
            let shape = catalog
                .try_get(k)
                .ok_or(LayoutError::UnknownShape { anchor, shape: k })?;
            if !part.shape_in_bounds(anchor, shape) {
                return Err(LayoutError::OutOfBounds { anchor });
            }
            if let Some(first) = part.first_collision(anchor, shape) {
                return Err(LayoutError::Overlap {
                    first,
                    second: anchor,
                });
            }
            if !content_satisfied(grid, anchor, shape) {
                return Err(LayoutError::Contents { anchor, min });
            }
            part.place(anchor, k, shape);
        }
        Ok(part)
    }

    /// re-derive occupancy from the current placement map and confirm it
    /// matches the state this partition actually carries. catches both an
    /// invalid placement map and drift between the map and the derived
    /// owner/empty pair.
    pub fn validate(&self, grid: &Grid, catalog: &SliceCatalog) -> Result<(), LayoutError> {
        let rebuilt = Partition::from_placements(self.placements.clone(), grid, catalog)?;
        if rebuilt.owner != self.owner || rebuilt.empty != self.empty {
            return Err(LayoutError::StateDrift);
        }
        Ok(())
    }

    /// commit a rectangle. the caller has already established that it is in
    /// bounds, collision-free and content-satisfying.
    pub fn place(&mut self, anchor: usize, k: usize, shape: Shape) {
        debug_assert!(self.shape_in_bounds(anchor, shape));
        debug_assert!(self.first_collision(anchor, shape).is_none());
        self.placements.insert(anchor, k);
        for pos in cells_of(anchor, shape, self.cols) {
            self.owner[pos] = anchor;
            self.empty.remove(&pos);
        }
    }

    /// remove the rectangle anchored at `anchor`, returning its cells to the
    /// empty set. no-op when nothing is anchored there.
    pub fn remove(&mut self, anchor: usize, catalog: &SliceCatalog) -> Option<usize> {
        let k = self.placements.remove(&anchor)?;
        let shape = catalog.get(k);
        for pos in cells_of(anchor, shape, self.cols) {
            self.owner[pos] = NO_OWNER;
            self.empty.insert(pos);
        }
        Some(k)
    }

    #[inline]
    pub fn owner_of(&self, pos: usize) -> Option<usize> {
        match self.owner[pos] {
            NO_OWNER => None,
            anchor => Some(anchor),
        }
    }

    #[inline]
    pub fn is_empty_cell(&self, pos: usize) -> bool {
        self.owner[pos] == NO_OWNER
    }

    #[inline]
    pub fn empty_cells(&self) -> &BTreeSet<usize> {
        &self.empty
    }

    #[inline]
    pub fn placements(&self) -> &HashMap<usize, usize> {
        &self.placements
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.empty.is_empty()
    }

    /// covered cell count; the integer fitness used for ordering
    #[inline]
    pub fn score(&self) -> usize {
        self.rows * self.cols - self.empty.len()
    }

    /// covered fraction as a percentage, for human-readable logging
    pub fn efficiency(&self) -> f64 {
        100.0 * (self.score() as f64) / ((self.rows * self.cols) as f64)
    }

    /// true when the whole footprint of `shape` anchored at `anchor` stays
    /// inside the grid
    pub fn shape_in_bounds(&self, anchor: usize, shape: Shape) -> bool {
        let x = anchor % self.cols;
        let y = anchor / self.cols;
        x + shape.width <= self.cols && y + shape.height <= self.rows
    }

    /// anchor of the first already-placed rectangle the footprint would
    /// overlap, if any. caller guarantees the footprint is in bounds.
    pub fn first_collision(&self, anchor: usize, shape: Shape) -> Option<usize> {
        for pos in cells_of(anchor, shape, self.cols) {
            if self.owner[pos] != NO_OWNER {
                return Some(self.owner[pos]);
            }
        }
        None
    }
}

/// row-major cell ids covered by `shape` anchored (top-left) at `anchor`
pub fn cells_of(anchor: usize, shape: Shape, cols: usize) -> impl Iterator<Item = usize> {
    let x = anchor % cols;
    let y = anchor / cols;
    (y..y + shape.height).flat_map(move |row| (x..x + shape.width).map(move |col| row * cols + col))
}

/// true when the rectangle holds at least `min_per_label` cells of each label
pub fn content_satisfied(grid: &Grid, anchor: usize, shape: Shape) -> bool {
    use crate::grid::Label;

    let min = grid.min_per_label();
    let (x0, y0) = grid.coords(anchor);
    let mut a = 0;
    let mut b = 0;
    for y in y0..y0 + shape.height {
        for x in x0..x0 + shape.width {
            match grid.label(x, y) {
                Label::A => a += 1,
                Label::B => b += 1,
            }
            if a >= min && b >= min {
                return true;
            }
        }
    }
    a >= min && b >= min
}
