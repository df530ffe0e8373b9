use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::catalog::SliceCatalog;
use crate::grid::Grid;
use crate::partition::{LayoutError, Partition};

/// a population on disk: one list of `(anchor, shape_index)` pairs per
/// individual, order-independent on load
type SavedPopulation = Vec<Vec<(usize, usize)>>;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("individual {index} in checkpoint is invalid: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: LayoutError,
    },
}

fn placement_pairs(part: &Partition) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize)> = part
        .placements()
        .iter()
        .map(|(&anchor, &k)| (anchor, k))
        .collect();
    pairs.sort_unstable();
    pairs
}

/// write the whole population's placement maps as JSON
pub fn save_population(path: &Path, population: &[Partition]) -> Result<(), CheckpointError> {
    let data: SavedPopulation = population.iter().map(placement_pairs).collect();
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer(file, &data)?;
    Ok(())
}

/// reload a saved population. every individual's occupancy is re-derived
/// from its placement map and checked against all partition invariants; a
/// single bad individual fails the whole load, and the caller decides
/// whether to fall back to a fresh population.
pub fn load_population(
    path: &Path,
    grid: &Grid,
    catalog: &SliceCatalog,
) -> Result<Vec<Partition>, CheckpointError> {
    let file = BufReader::new(File::open(path)?);
    let data: SavedPopulation = serde_json::from_reader(file)?;

    let mut population = Vec::with_capacity(data.len());
    for (index, pairs) in data.into_iter().enumerate() {
        let placements: HashMap<usize, usize> = pairs.into_iter().collect();
        let part = Partition::from_placements(placements, grid, catalog)
            .map_err(|source| CheckpointError::Invalid { index, source })?;
        population.push(part);
    }
    Ok(population)
}

/// write one individual's placement map as JSON (the per-generation best)
pub fn save_best(path: &Path, part: &Partition) -> Result<(), CheckpointError> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer(file, &placement_pairs(part))?;
    Ok(())
}

/// append one `(generation, best_efficiency)` sample to the convergence log
pub fn append_convergence(
    path: &Path,
    generation: u64,
    efficiency: f64,
) -> Result<(), CheckpointError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{generation}; {efficiency:.4}")?;
    Ok(())
}
