use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::SliceCatalog;
use crate::grid::Grid;
use crate::partition::{content_satisfied, Partition};

/// greedy constructive pass: extend a valid (possibly partial) partition
/// until no further rectangle can be legally added.
///
/// anchors are visited once, in row-major order. at each empty anchor the
/// catalog is tried in a fresh uniformly random permutation and the first
/// shape that fits, avoids occupied cells and satisfies the content
/// constraint is committed. the random order is what makes repeated fills
/// produce structurally different partitions from the same starting state,
/// which is the diversity the population search feeds on. no backtracking,
/// no error paths: the only observable outcome is the coverage reached.
pub fn fill<R: Rng + ?Sized>(
    part: &mut Partition,
    grid: &Grid,
    catalog: &SliceCatalog,
    rng: &mut R,
) {
    if catalog.is_empty() {
        return;
    }

    // one scratch permutation, reshuffled per anchor
    let mut order: Vec<usize> = (0..catalog.len()).collect();

    for anchor in 0..grid.cell_count() {
        if !part.is_empty_cell(anchor) {
            continue;
        }
        if is_isolated(part, grid, anchor) {
            continue;
        }

        order.shuffle(rng);
        for &k in &order {
            let shape = catalog.get(k);
            if part.shape_in_bounds(anchor, shape)
                && part.first_collision(anchor, shape).is_none()
                && content_satisfied(grid, anchor, shape)
            {
                part.place(anchor, k, shape);
                break;
            }
        }
    }
}

/// pruning pre-check: a rectangle's top-left corner needs free space
/// extending right and down, so an empty cell whose right neighbor is
/// blocked (occupied or boundary) and whose lower neighbor is blocked can
/// never anchor anything. the catalog holds no 1x1 shapes (area floor is
/// `2 * min_per_label >= 2`), which is what makes the rule exact.
pub fn is_isolated(part: &Partition, grid: &Grid, anchor: usize) -> bool {
    let (x, y) = grid.coords(anchor);
    let right_blocked = x + 1 >= grid.cols() || !part.is_empty_cell(grid.pos(x + 1, y));
    let down_blocked = y + 1 >= grid.rows() || !part.is_empty_cell(grid.pos(x, y + 1));
    right_blocked && down_blocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn checkerboard(rows: usize, cols: usize, min: usize, max: usize) -> (Grid, SliceCatalog) {
        let mut text = format!("{rows} {cols} {min} {max}\n");
        for y in 0..rows {
            for x in 0..cols {
                text.push(if (x + y) % 2 == 0 { 'A' } else { 'B' });
            }
            text.push('\n');
        }
        let grid = Grid::parse(&text).unwrap();
        let catalog = SliceCatalog::generate(min, max);
        (grid, catalog)
    }

    #[test]
    fn test_fill_produces_valid_partition() {
        let (grid, catalog) = checkerboard(8, 8, 1, 5);
        for seed in 0..20 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut part = Partition::new_blank(&grid);
            fill(&mut part, &grid, &catalog, &mut rng);
            part.validate(&grid, &catalog).unwrap();
            assert!(part.score() > 0);
        }
    }

    #[test]
    fn test_fill_is_idempotent_on_maximal_partition() {
        let (grid, catalog) = checkerboard(8, 8, 1, 5);
        let mut rng = Pcg32::seed_from_u64(7);
        let mut part = Partition::new_blank(&grid);
        fill(&mut part, &grid, &catalog, &mut rng);

        let before = part.placements().clone();
        fill(&mut part, &grid, &catalog, &mut rng);
        assert_eq!(part.placements(), &before);
    }

    #[test]
    fn test_two_by_two_unique_cover() {
        // with L=2 the only catalog shape that fits the grid at all is the
        // full 2x2, and its two A's and two B's satisfy the content
        // constraint, so every fill reaches 100%
        let grid = Grid::parse("2 2 2 4\nAB\nAB\n").unwrap();
        let catalog = SliceCatalog::generate(grid.min_per_label(), grid.max_area());
        let mut rng = Pcg32::seed_from_u64(0);
        let mut part = Partition::new_blank(&grid);
        fill(&mut part, &grid, &catalog, &mut rng);
        assert_eq!(part.placements().len(), 1);
        assert_eq!(part.score(), 4);
        assert!((part.efficiency() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_by_two_loose_parameters_still_fully_covered() {
        // with L=1 the catalog also holds dominoes; the A/B columns rule out
        // the vertical ones, so any maximal fill still lands on 100%
        let grid = Grid::parse("2 2 1 4\nAB\nAB\n").unwrap();
        let catalog = SliceCatalog::generate(1, 4);
        for seed in 0..20 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut part = Partition::new_blank(&grid);
            fill(&mut part, &grid, &catalog, &mut rng);
            assert_eq!(part.score(), 4, "seed {seed}");
        }
    }

    #[test]
    fn test_single_label_grid_stays_empty() {
        // no rectangle can ever hold a B cell
        let grid = Grid::parse("1 4 1 2\nAAAA\n").unwrap();
        let catalog = SliceCatalog::generate(1, 2);
        for seed in 0..10 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut part = Partition::new_blank(&grid);
            fill(&mut part, &grid, &catalog, &mut rng);
            assert_eq!(part.score(), 0);
        }
    }

    #[test]
    fn test_empty_catalog_is_a_no_op() {
        // max_area below 2 * min_per_label leaves nothing to place
        let (grid, catalog) = checkerboard(4, 4, 3, 5);
        assert!(catalog.is_empty());
        let mut rng = Pcg32::seed_from_u64(0);
        let mut part = Partition::new_blank(&grid);
        fill(&mut part, &grid, &catalog, &mut rng);
        assert_eq!(part.score(), 0);
    }

    #[test]
    fn test_isolated_cells_truly_have_no_placement() {
        // exhaustive check of the pruning rule: wherever the pre-check fires,
        // no catalog shape may be placeable from that anchor
        let (grid, catalog) = checkerboard(6, 6, 1, 6);
        let mut rng = Pcg32::seed_from_u64(42);
        let mut part = Partition::new_blank(&grid);
        fill(&mut part, &grid, &catalog, &mut rng);

        // remove one rectangle so some empty pocket exists next to occupancy
        let first = part.placements().keys().next().copied();
        if let Some(anchor) = first {
            part.remove(anchor, &catalog);
        }

        for anchor in 0..grid.cell_count() {
            if !part.is_empty_cell(anchor) || !is_isolated(&part, &grid, anchor) {
                continue;
            }
            for k in 0..catalog.len() {
                let shape = catalog.get(k);
                let placeable = part.shape_in_bounds(anchor, shape)
                    && part.first_collision(anchor, shape).is_none()
                    && content_satisfied(&grid, anchor, shape);
                assert!(
                    !placeable,
                    "isolated anchor {anchor} accepts shape {}x{}",
                    shape.width, shape.height
                );
            }
        }
    }

    #[test]
    fn test_bottom_right_corner_is_isolated_on_blank_grid() {
        let (grid, _) = checkerboard(3, 3, 1, 4);
        let part = Partition::new_blank(&grid);
        assert!(is_isolated(&part, &grid, grid.pos(2, 2)));
        assert!(!is_isolated(&part, &grid, grid.pos(0, 0)));
    }
}
