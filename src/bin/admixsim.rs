use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use admixsim::output::{RunSummary, write_segments};
use admixsim::*;
use admixsim::logger::MinimalLogger;
use anyhow::{Result, anyhow};
use clap::Parser;
use log::LevelFilter;
use rand::Rng;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(about = "Simulate ancestry segments of an admixed population")]
struct Args {
    /// Demographic model file
    #[arg(short, long)]
    model: PathBuf,
    /// Chromosome length in Morgans
    #[arg(short, long, default_value_t = 1.0)]
    length: f64,
    /// Number of haplotypes to write (whole final population if omitted)
    #[arg(short = 'n', long)]
    samples: Option<usize>,
    /// Random seed (random if omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Prefix for the `.seg` and `.json` output files
    #[arg(short, long, default_value = "admixsim")]
    output: String,
    /// Only read and validate the model
    #[arg(long)]
    check: bool,
    #[arg(short, long)]
    verbose: bool,
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    MinimalLogger::init(if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    let model = DemographicModel::from_file(&args.model)?;
    log::info!(
        "Model: {} source populations, {} generations",
        model.k(),
        model.t()
    );
    if args.check {
        print!("{model}");
        return Ok(());
    }

    let random_seed = args
        .seed
        .unwrap_or_else(|| rand::rng().random_range(1..u64::MAX));
    let params = Parameters {
        random_seed,
        chromosome_length: args.length,
    };
    log::info!("{:?}", params);

    let mut sim: AdmixtureSimulation = AdmixtureSimulation::initialize(model, params)?;
    let mut tracker = SimpleTracker::counts_only();
    sim.run(&mut tracker)?;

    let params = sim.params.clone();
    let model = sim.model.clone();
    let mut rng = sim.rng.clone();
    let population = sim.finalize(&mut tracker)?;
    let haplotypes = match args.samples {
        Some(n) => population.sample(n, &mut rng),
        None => population.into_chromosomes(),
    };

    // ── Output ────────────────────────────────────────────────────────────────
    let seg_path = format!("{}.seg", args.output);
    let file = File::create(&seg_path).map_err(|e| anyhow!("Can't create {seg_path}: {e}"))?;
    write_segments(BufWriter::new(file), &haplotypes)
        .map_err(|e| anyhow!("Can't write {seg_path}: {e}"))?;

    let json_path = format!("{}.json", args.output);
    let file = File::create(&json_path).map_err(|e| anyhow!("Can't create {json_path}: {e}"))?;
    let summary = RunSummary::new(&params, &model, &tracker.records, &haplotypes);
    summary
        .write_json(BufWriter::new(file))
        .map_err(|e| anyhow!("Can't write {json_path}: {e}"))?;

    if let Some(generation) = summary.first_empty_generation {
        log::error!(
            "Population is empty from generation {generation}: no chromosomes were founded or inherited"
        );
    }

    log::info!(
        "Wrote {} haplotypes to {seg_path} and summary to {json_path}",
        haplotypes.len()
    );
    Ok(())
}
