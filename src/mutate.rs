use rand::Rng;

use crate::catalog::SliceCatalog;
use crate::fill::fill;
use crate::grid::Grid;
use crate::partition::Partition;

/// fixed-size visited set over cell ids, one bit per cell
struct VisitedSet {
    words: Vec<u64>,
}

impl VisitedSet {
    fn new(cells: usize) -> VisitedSet {
        VisitedSet {
            words: vec![0; cells.div_ceil(64)],
        }
    }

    /// returns false when the cell was already marked
    fn insert(&mut self, pos: usize) -> bool {
        let word = &mut self.words[pos / 64];
        let bit = 1u64 << (pos % 64);
        let fresh = *word & bit == 0;
        *word |= bit;
        fresh
    }

    fn contains(&self, pos: usize) -> bool {
        self.words[pos / 64] & (1 << (pos % 64)) != 0
    }
}

/// anchors of every rectangle adjacent to the connected empty region that
/// contains `seed`. iterative stack traversal over the 4-connected cell
/// graph: the frontier continues only through empty cells; the first time an
/// occupied cell is reached its owner is recorded and that branch stops.
pub fn adjacent_slices(part: &Partition, grid: &Grid, seed: usize) -> Vec<usize> {
    let mut visited = VisitedSet::new(grid.cell_count());
    let mut stack = vec![seed];
    let mut doomed = Vec::new();

    while let Some(pos) = stack.pop() {
        if !visited.insert(pos) {
            continue;
        }
        if let Some(anchor) = part.owner_of(pos) {
            if !doomed.contains(&anchor) {
                doomed.push(anchor);
            }
            continue;
        }

        let (x, y) = grid.coords(pos);
        if x + 1 < grid.cols() {
            push_unvisited(&mut stack, &visited, grid.pos(x + 1, y));
        }
        if x > 0 {
            push_unvisited(&mut stack, &visited, grid.pos(x - 1, y));
        }
        if y + 1 < grid.rows() {
            push_unvisited(&mut stack, &visited, grid.pos(x, y + 1));
        }
        if y > 0 {
            push_unvisited(&mut stack, &visited, grid.pos(x, y - 1));
        }
    }

    doomed
}

fn push_unvisited(stack: &mut Vec<usize>, visited: &VisitedSet, pos: usize) {
    if !visited.contains(pos) {
        stack.push(pos);
    }
}

/// local-repair mutation: clear the neighborhood around a random empty
/// pocket, then greedily re-pack it.
///
/// each level picks a uniformly random empty seed cell and removes every
/// rectangle adjacent to the seed's connected empty region; a single re-fill
/// pass runs after the last level. higher `levels` widen the disruption
/// radius. a fully covered partition has no seed to pick from and is
/// returned unchanged.
pub fn mutate<R: Rng + ?Sized>(
    part: &mut Partition,
    grid: &Grid,
    catalog: &SliceCatalog,
    levels: u32,
    rng: &mut R,
) {
    if part.is_full() {
        return;
    }

    for _ in 0..levels.max(1) {
        let empty = part.empty_cells();
        if empty.is_empty() {
            break;
        }
        let nth = rng.random_range(0..empty.len());
        let seed = match empty.iter().nth(nth) {
            Some(&pos) => pos,
            None => break,
        };

        for anchor in adjacent_slices(part, grid, seed) {
            part.remove(anchor, catalog);
        }
    }

    fill(part, grid, catalog, rng);
}
