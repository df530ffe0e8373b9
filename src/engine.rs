use std::sync::atomic::{AtomicBool, Ordering};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::catalog::SliceCatalog;
use crate::fill::fill;
use crate::grid::Grid;
use crate::mutate::mutate;
use crate::partition::Partition;
use crate::recombine::recombine;
use crate::settings::SearchSettings;

/// the population search loop.
///
/// owns the grid, the shared shape catalog, the master RNG and the current
/// population (always sorted descending by score). one `step` is one
/// generation: elite carry-over, recombination children, mutated copies,
/// optional fresh randoms, re-sort. offspring batches run on rayon with a
/// per-task `Pcg32` seeded from the master stream, so results do not depend
/// on scheduling and a run is reproducible from its seed.
pub struct Engine {
    grid: Grid,
    catalog: SliceCatalog,
    settings: SearchSettings,
    rng: Pcg32,
    population: Vec<Partition>,
    generation: u64,
}

impl Engine {
    /// fresh start: P blank individuals, each filled with its own seeded RNG
    pub fn new(grid: Grid, settings: SearchSettings) -> Engine {
        let catalog = SliceCatalog::generate(grid.min_per_label(), grid.max_area());
        let mut rng = Pcg32::seed_from_u64(settings.seed);

        let seeds: Vec<u64> = (0..settings.population).map(|_| rng.random()).collect();
        let mut population: Vec<Partition> = seeds
            .par_iter()
            .map(|&seed| {
                let mut task_rng = Pcg32::seed_from_u64(seed);
                let mut part = Partition::new_blank(&grid);
                fill(&mut part, &grid, &catalog, &mut task_rng);
                part
            })
            .collect();
        sort_by_score(&mut population);

        Engine {
            grid,
            catalog,
            settings,
            rng,
            population,
            generation: 0,
        }
    }

    /// resume from a reloaded (already re-validated) population. a short
    /// file is padded with fresh random individuals, a long one is cut to
    /// the top P by coverage.
    pub fn resume(grid: Grid, settings: SearchSettings, mut population: Vec<Partition>) -> Engine {
        let catalog = SliceCatalog::generate(grid.min_per_label(), grid.max_area());
        let mut rng = Pcg32::seed_from_u64(settings.seed);

        let p = settings.population;
        if population.len() < p {
            warn!(
                loaded = population.len(),
                target = p,
                "checkpoint smaller than population, padding with fresh individuals"
            );
            let missing = p - population.len();
            let seeds: Vec<u64> = (0..missing).map(|_| rng.random()).collect();
            let fresh: Vec<Partition> = seeds
                .par_iter()
                .map(|&seed| {
                    let mut task_rng = Pcg32::seed_from_u64(seed);
                    let mut part = Partition::new_blank(&grid);
                    fill(&mut part, &grid, &catalog, &mut task_rng);
                    part
                })
                .collect();
            population.extend(fresh);
        } else if population.len() > p {
            warn!(
                loaded = population.len(),
                target = p,
                "checkpoint larger than population, keeping the best individuals"
            );
            sort_by_score(&mut population);
            population.truncate(p);
        }
        sort_by_score(&mut population);

        Engine {
            grid,
            catalog,
            settings,
            rng,
            population,
            generation: 0,
        }
    }

    #[inline]
    pub fn population(&self) -> &[Partition] {
        &self.population
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn catalog(&self) -> &SliceCatalog {
        &self.catalog
    }

    /// the current best individual (population is kept sorted)
    pub fn best(&self) -> &Partition {
        &self.population[0]
    }

    /// advance one generation
    pub fn step(&mut self) {
        let plan = self.settings.plan();
        let elites = plan.elites.min(self.population.len());
        let grid = &self.grid;
        let catalog = &self.catalog;
        let pool = &self.population[..elites];

        // recombination children. pair indices and per-task seeds are drawn
        // from the master stream up front; the batch itself is order
        // independent
        let mut next: Vec<Partition> = Vec::with_capacity(self.settings.population + elites);
        if elites >= 2 {
            let pair_jobs: Vec<(usize, usize, u64)> = (0..plan.pairs)
                .map(|_| {
                    let first = self.rng.random_range(0..elites);
                    let mut second = self.rng.random_range(0..elites - 1);
                    if second >= first {
                        second += 1;
                    }
                    (first, second, self.rng.random())
                })
                .collect();
            let children: Vec<(Partition, Partition)> = pair_jobs
                .par_iter()
                .map(|&(first, second, seed)| {
                    let mut task_rng = Pcg32::seed_from_u64(seed);
                    recombine(&pool[first], &pool[second], grid, catalog, &mut task_rng)
                })
                .collect();
            for (c, d) in children {
                next.push(c);
                next.push(d);
            }
        }

        // elite carry-over, unmodified
        next.extend_from_slice(pool);

        // mutated copies, sampled from the pool built so far
        let min_levels = self.settings.min_mutation_levels.max(1);
        let max_levels = self.settings.max_mutation_levels.max(min_levels);
        let mutant_jobs: Vec<(usize, u32, u64)> = (0..plan.mutants)
            .map(|_| {
                (
                    self.rng.random_range(0..next.len()),
                    self.rng.random_range(min_levels..=max_levels),
                    self.rng.random(),
                )
            })
            .collect();
        let mutants: Vec<Partition> = mutant_jobs
            .par_iter()
            .map(|&(idx, levels, seed)| {
                let mut task_rng = Pcg32::seed_from_u64(seed);
                let mut copy = next[idx].clone();
                mutate(&mut copy, grid, catalog, levels, &mut task_rng);
                copy
            })
            .collect();
        next.extend(mutants);

        // fresh random injection
        if plan.randoms > 0 {
            let seeds: Vec<u64> = (0..plan.randoms).map(|_| self.rng.random()).collect();
            let fresh: Vec<Partition> = seeds
                .par_iter()
                .map(|&seed| {
                    let mut task_rng = Pcg32::seed_from_u64(seed);
                    let mut part = Partition::new_blank(grid);
                    fill(&mut part, grid, catalog, &mut task_rng);
                    part
                })
                .collect();
            next.extend(fresh);
        }

        sort_by_score(&mut next);
        self.population = next;
        self.generation += 1;
    }

    /// run until the generation budget is exhausted or `stop` is raised.
    /// `on_generation` fires after every step; checkpointing and any other
    /// I/O belong there, outside the hot loop.
    pub fn run(&mut self, stop: &AtomicBool, mut on_generation: impl FnMut(&Engine)) {
        while self.generation < self.settings.generations {
            if stop.load(Ordering::Relaxed) {
                info!(generation = self.generation, "stop requested, ending search");
                break;
            }
            self.step();
            let best = self.best();
            info!(
                generation = self.generation,
                best_score = best.score(),
                best_efficiency = best.efficiency(),
                population = self.population.len(),
                "generation complete"
            );
            on_generation(self);
        }
    }
}

fn sort_by_score(population: &mut [Partition]) {
    // stable sort: equal scores keep their insertion order
    population.sort_by(|a, b| b.score().cmp(&a.score()));
}
