mod catalog;
mod checkpoint;
mod engine;
mod fill;
mod grid;
mod mutate;
mod partition;
mod recombine;
mod settings;

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use tracing::{debug, error, info};

use crate::catalog::SliceCatalog;
use crate::engine::Engine;
use crate::grid::Grid;
use crate::settings::SearchSettings;

/// evolutionary search for a high-coverage rectangle partition of a
/// two-label grid
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// grid description file (`rows cols L H` header, then label rows)
    input: PathBuf,

    /// directory for checkpoints, the best layout and the convergence log
    #[arg(long, default_value = "results")]
    out_dir: PathBuf,

    /// JSON settings file; missing fields fall back to defaults
    #[arg(long)]
    settings: Option<PathBuf>,

    /// override the generation budget
    #[arg(long)]
    generations: Option<u64>,

    /// override the population size
    #[arg(long)]
    population: Option<usize>,

    /// override the master RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// resume from a population checkpoint instead of starting fresh
    #[arg(long)]
    resume: Option<PathBuf>,

    /// override generations between population checkpoints (0 = only at exit)
    #[arg(long)]
    checkpoint_interval: Option<u64>,
}

fn load_settings(cli: &Cli) -> Result<SearchSettings, Box<dyn Error>> {
    let mut settings = match &cli.settings {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => SearchSettings::default(),
    };
    if let Some(generations) = cli.generations {
        settings.generations = generations;
    }
    if let Some(population) = cli.population {
        settings.population = population;
    }
    if let Some(seed) = cli.seed {
        settings.seed = seed;
    }
    if let Some(interval) = cli.checkpoint_interval {
        settings.checkpoint_interval = interval;
    }
    Ok(settings.checked()?)
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    let grid = Grid::load(&cli.input)?;
    info!(
        rows = grid.rows(),
        cols = grid.cols(),
        min_per_label = grid.min_per_label(),
        max_area = grid.max_area(),
        "grid loaded"
    );

    fs::create_dir_all(&cli.out_dir)?;

    let mut engine = match &cli.resume {
        Some(path) => {
            // a corrupt checkpoint is fatal for this file by design; start a
            // fresh run or point at a good checkpoint instead
            let catalog = SliceCatalog::generate(grid.min_per_label(), grid.max_area());
            let population = checkpoint::load_population(path, &grid, &catalog)?;
            info!(loaded = population.len(), path = %path.display(), "resuming from checkpoint");
            Engine::resume(grid, settings.clone(), population)
        }
        None => Engine::new(grid, settings.clone()),
    };

    info!(
        population = engine.population().len(),
        generations = settings.generations,
        shapes = engine.catalog().len(),
        seed = settings.seed,
        best_efficiency = engine.best().efficiency(),
        "search starting"
    );

    let convergence = cli.out_dir.join("convergence.log");
    let best_path = cli.out_dir.join("best.json");
    let interval = settings.checkpoint_interval;
    let out_dir = cli.out_dir.clone();

    // the stop flag is part of the engine contract: an embedding wrapper may
    // raise it between generations. the CLI itself only stops on budget
    // exhaustion.
    let stop = AtomicBool::new(false);
    let mut io_failure: Option<checkpoint::CheckpointError> = None;

    engine.run(&stop, |e| {
        let generation = e.generation();
        let best = e.best();
        if let Err(err) = checkpoint::append_convergence(&convergence, generation, best.efficiency())
        {
            io_failure.get_or_insert(err);
        }
        if interval > 0 && generation % interval == 0 {
            let path = out_dir.join(format!("population_G{generation:05}.json"));
            debug!(path = %path.display(), "writing population checkpoint");
            if let Err(err) = checkpoint::save_population(&path, e.population()) {
                io_failure.get_or_insert(err);
            }
            if let Err(err) = checkpoint::save_best(&best_path, best) {
                io_failure.get_or_insert(err);
            }
        }
    });
    if let Some(err) = io_failure {
        return Err(err.into());
    }

    let final_path = cli.out_dir.join("population_final.json");
    checkpoint::save_population(&final_path, engine.population())?;
    checkpoint::save_best(&best_path, engine.best())?;

    let best = engine.best();
    info!(
        generations = engine.generation(),
        best_score = best.score(),
        best_efficiency = best.efficiency(),
        rectangles = best.placements().len(),
        "search finished"
    );
    Ok(())
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // name rayon's workers once at startup so traces read well
    let _ = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("rayon-{i}"))
        .build_global();

    match run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            std::process::ExitCode::FAILURE
        }
    }
}
