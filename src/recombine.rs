use rand::Rng;

use crate::catalog::{Shape, SliceCatalog};
use crate::fill::fill;
use crate::grid::Grid;
use crate::partition::Partition;

/// which side of the split a whole rectangle falls on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zone {
    First,
    Second,
}

/// the seven distinguishable two-way splits of the four quadrants formed by
/// a vertical line at `s_x` and a horizontal line at `s_y`. complements are
/// omitted (swapping the zones of `Left` already covers "right"), as are
/// single-quadrant patterns already expressible by zone swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitPattern {
    Left,
    Upper,
    UpperLeft,
    UpperRight,
    BottomLeft,
    BottomRight,
    Cross,
}

impl SplitPattern {
    pub const ALL: [SplitPattern; 7] = [
        SplitPattern::Left,
        SplitPattern::Upper,
        SplitPattern::UpperLeft,
        SplitPattern::UpperRight,
        SplitPattern::BottomLeft,
        SplitPattern::BottomRight,
        SplitPattern::Cross,
    ];

    /// classify a rectangle against the split lines. `None` means the
    /// rectangle straddles a line the pattern cares about and belongs to
    /// neither zone; straddlers are dropped by both children, never cut.
    ///
    /// the boundary convention is strict-less-than for the first half and
    /// greater-or-equal for the second, applied to the full column/row span
    /// of the rectangle.
    pub fn classify(self, x: usize, y: usize, shape: Shape, s_x: usize, s_y: usize) -> Option<Zone> {
        // all covered columns < s_x, resp. >= s_x
        let cols_first = x + shape.width - 1 < s_x;
        let cols_second = x >= s_x;
        // all covered rows < s_y, resp. >= s_y
        let rows_first = y + shape.height - 1 < s_y;
        let rows_second = y >= s_y;

        match self {
            SplitPattern::Left => {
                if cols_first {
                    Some(Zone::First)
                } else if cols_second {
                    Some(Zone::Second)
                } else {
                    None
                }
            }
            SplitPattern::Upper => {
                if rows_first {
                    Some(Zone::First)
                } else if rows_second {
                    Some(Zone::Second)
                } else {
                    None
                }
            }
            SplitPattern::UpperLeft => {
                if cols_first && rows_first {
                    Some(Zone::First)
                } else if cols_second || rows_second {
                    Some(Zone::Second)
                } else {
                    None
                }
            }
            SplitPattern::UpperRight => {
                if cols_second && rows_first {
                    Some(Zone::First)
                } else if cols_first || rows_second {
                    Some(Zone::Second)
                } else {
                    None
                }
            }
            SplitPattern::BottomLeft => {
                if cols_first && rows_second {
                    Some(Zone::First)
                } else if cols_second || rows_first {
                    Some(Zone::Second)
                } else {
                    None
                }
            }
            SplitPattern::BottomRight => {
                if cols_second && rows_second {
                    Some(Zone::First)
                } else if cols_first || rows_first {
                    Some(Zone::Second)
                } else {
                    None
                }
            }
            SplitPattern::Cross => {
                if (cols_second && rows_second) || (cols_first && rows_first) {
                    Some(Zone::First)
                } else if (cols_second && rows_first) || (cols_first && rows_second) {
                    Some(Zone::Second)
                } else {
                    None
                }
            }
        }
    }
}

/// bucket a parent's placements into the pattern's two zones, dropping
/// straddlers
fn split_zones(
    parent: &Partition,
    grid: &Grid,
    catalog: &SliceCatalog,
    s_x: usize,
    s_y: usize,
    pattern: SplitPattern,
) -> (Vec<(usize, usize)>, Vec<(usize, usize)>) {
    let mut first = Vec::new();
    let mut second = Vec::new();
    for (&anchor, &k) in parent.placements() {
        let (x, y) = grid.coords(anchor);
        match pattern.classify(x, y, catalog.get(k), s_x, s_y) {
            Some(Zone::First) => first.push((anchor, k)),
            Some(Zone::Second) => second.push((anchor, k)),
            None => {}
        }
    }
    (first, second)
}

/// assemble a child from carried placements, re-deriving occupancy from
/// scratch. the zone bipartition makes cross-parent collisions impossible
/// for zone-respecting pieces, but the pieces came from two maps that were
/// never jointly checked, so each insertion is re-verified and a conflicting
/// later placement is discarded rather than trusted.
fn assemble(
    pieces: impl IntoIterator<Item = (usize, usize)>,
    grid: &Grid,
    catalog: &SliceCatalog,
) -> Partition {
    let mut child = Partition::new_blank(grid);
    for (anchor, k) in pieces {
        let shape = catalog.get(k);
        if child.shape_in_bounds(anchor, shape) && child.first_collision(anchor, shape).is_none() {
            child.place(anchor, k, shape);
        }
    }
    child
}

/// deterministic core of recombination: split both parents at the given
/// lines, cross the zones, and assemble two children. no re-fill here; the
/// public operator adds it.
pub fn recombine_at(
    a: &Partition,
    b: &Partition,
    grid: &Grid,
    catalog: &SliceCatalog,
    s_x: usize,
    s_y: usize,
    pattern: SplitPattern,
) -> (Partition, Partition) {
    let (a_first, a_second) = split_zones(a, grid, catalog, s_x, s_y, pattern);
    let (b_first, b_second) = split_zones(b, grid, catalog, s_x, s_y, pattern);

    let c = assemble(a_first.into_iter().chain(b_second), grid, catalog);
    let d = assemble(b_first.into_iter().chain(a_second), grid, catalog);
    (c, d)
}

/// quadrant recombination: draw random split lines `s_x in [1, cols-1]`,
/// `s_y in [1, rows-1]` and a random pattern, cross the parents' zones into
/// two children, then greedily fill each child's remaining space. parents
/// are left untouched.
pub fn recombine<R: Rng + ?Sized>(
    a: &Partition,
    b: &Partition,
    grid: &Grid,
    catalog: &SliceCatalog,
    rng: &mut R,
) -> (Partition, Partition) {
    // a grid this thin has no interior split line; fall back to plain copies
    if grid.cols() < 2 || grid.rows() < 2 {
        return (a.clone(), b.clone());
    }

    let s_x = rng.random_range(1..grid.cols());
    let s_y = rng.random_range(1..grid.rows());
    let pattern = SplitPattern::ALL[rng.random_range(0..SplitPattern::ALL.len())];

    let (mut c, mut d) = recombine_at(a, b, grid, catalog, s_x, s_y, pattern);
    fill(&mut c, grid, catalog, rng);
    fill(&mut d, grid, catalog, rng);
    (c, d)
}
