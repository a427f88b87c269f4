pub mod error;
pub mod genome;
pub mod logger;
pub mod model;
pub mod output;
pub mod population;

pub use error::ModelError;
pub use genome::{AncestryLabel, Chromosome, ChromosomePair, Segment};
pub use model::DemographicModel;
pub use population::{EvolvingPopulation, Population};

use anyhow::{Result, ensure};
use indicatif::ProgressBar;
use rand::SeedableRng;
use rand::distr::{Distribution, Uniform};
use rand::prelude::*;
use rand::rngs::SmallRng;
use serde::Serialize;

// ── Parameters ────────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct Parameters {
    pub random_seed: u64,
    /// Genetic length in Morgans of every founder chromosome.
    pub chromosome_length: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        let mut rng = rand::rng();
        let random_seed = rng.random_range(1..u64::MAX);
        Self {
            random_seed,
            chromosome_length: 1.0,
        }
    }
}

// ── Generation plan ───────────────────────────────────────────────────────────

/// How the haplotypes of one generation split into fresh founders and
/// chromosomes carried over from the previous generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationPlan {
    pub generation: usize,
    /// Twice the effective size.
    pub haplotypes: usize,
    /// `founded[j]` = floor(haplotypes × proportion of source j).
    pub founded: Vec<usize>,
    /// Haplotypes not covered by `founded`, including truncation losses.
    pub shortfall: usize,
}

impl GenerationPlan {
    pub fn for_generation(model: &DemographicModel, t: usize) -> Self {
        let haplotypes = model.effective_sizes()[t] * 2;
        let founded: Vec<usize> = model.admixture_proportions()[t]
            .iter()
            .map(|&p| (haplotypes as f64 * p).floor() as usize)
            .collect();
        let shortfall = haplotypes.saturating_sub(founded.iter().sum());
        Self {
            generation: t,
            haplotypes,
            founded,
            shortfall,
        }
    }

    pub fn total_founded(&self) -> usize {
        self.founded.iter().sum()
    }

    /// Chromosomes to draw from the previous generation; none in generation 0.
    pub fn inherited(&self) -> usize {
        if self.generation == 0 {
            0
        } else {
            self.shortfall
        }
    }
}

// ── Tracker trait ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub effective_size: usize,
    /// Fresh founder chromosomes per source population.
    pub founded: Vec<usize>,
    /// Chromosomes sampled from the previous generation.
    pub inherited: usize,
    /// Size of the pool handed to the evolution step.
    pub candidates: usize,
    /// Chromosomes after the evolution step.
    pub evolved: usize,
    /// Ancestry labels drawn for the fresh founders, in drawing order.
    #[serde(skip)]
    pub founder_labels: Vec<AncestryLabel>,
}

/// Trait for recording per-generation statistics.
pub trait TrackerTrait<P: EvolvingPopulation = Population> {
    /// Called after each generation has been evolved.
    fn record_generation(
        &mut self,
        sim: &AdmixtureSimulation<P>,
        record: GenerationRecord,
    ) -> Result<()>;
    /// Called once at the end of the simulation.
    fn finalize(&mut self, sim: &AdmixtureSimulation<P>) -> Result<()>;
}

/// Default implementation that just collects all records.
pub struct SimpleTracker {
    pub records: Vec<GenerationRecord>,
    keep_founder_labels: bool,
}

impl Default for SimpleTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleTracker {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            keep_founder_labels: true,
        }
    }

    /// Keeps the per-generation counts but drops `founder_labels`, which grow
    /// with the number of fresh founders in every generation.
    pub fn counts_only() -> Self {
        Self {
            records: Vec::new(),
            keep_founder_labels: false,
        }
    }
}

impl<P: EvolvingPopulation> TrackerTrait<P> for SimpleTracker {
    fn record_generation(
        &mut self,
        _sim: &AdmixtureSimulation<P>,
        mut record: GenerationRecord,
    ) -> Result<()> {
        if !self.keep_founder_labels {
            record.founder_labels = Vec::new();
        }
        self.records.push(record);
        Ok(())
    }

    fn finalize(&mut self, _sim: &AdmixtureSimulation<P>) -> Result<()> {
        Ok(())
    }
}

// ── Simulator ─────────────────────────────────────────────────────────────────

/// Runs the admixture schedule one generation at a time.
///
/// Each generation draws carried-over chromosomes from the previous
/// generation, founds fresh single-segment chromosomes from every source
/// population, and hands the combined pool to the population's evolution step.
pub struct AdmixtureSimulation<P: EvolvingPopulation = Population> {
    pub params: Parameters,
    pub model: DemographicModel,
    pub rng: SmallRng,
    population: P,
    /// Number of generations already simulated.
    generation: usize,
}

impl<P: EvolvingPopulation> AdmixtureSimulation<P> {
    // ── Construction ──────────────────────────────────────────────────────────

    pub fn initialize(model: DemographicModel, params: Parameters) -> Result<Self> {
        ensure!(
            params.chromosome_length.is_finite() && params.chromosome_length > 0.0,
            "Chromosome length must be a positive number of Morgans, got {}",
            params.chromosome_length
        );
        let rng = SmallRng::seed_from_u64(params.random_seed);
        Ok(Self {
            params,
            model,
            rng,
            population: P::default(),
            generation: 0,
        })
    }

    pub fn population(&self) -> &P {
        &self.population
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn is_complete(&self) -> bool {
        self.generation >= self.model.t()
    }

    // ── Founding ──────────────────────────────────────────────────────────────

    /// Fresh full-length chromosomes from source population `j`, each labelled
    /// with a uniformly drawn founder haplotype.
    pub fn found_chromosomes(&mut self, j: usize, count: usize) -> Result<Vec<Chromosome>> {
        let founder = Uniform::new(0usize, self.model.founder_haplotype_counts()[j])?;
        let length = self.params.chromosome_length;
        Ok((0..count)
            .map(|_| {
                let label = AncestryLabel::new(j, founder.sample(&mut self.rng));
                Chromosome::founder(length, label)
            })
            .collect())
    }

    // ── Generation loop ───────────────────────────────────────────────────────

    pub fn step(&mut self, tracker: &mut dyn TrackerTrait<P>) -> Result<()> {
        ensure!(
            !self.is_complete(),
            "All {} generations have already been simulated",
            self.model.t()
        );
        let t = self.generation;
        let plan = GenerationPlan::for_generation(&self.model, t);
        let effective_size = self.model.effective_sizes()[t];

        let mut candidates = if plan.inherited() > 0 {
            self.population.sample(plan.inherited(), &mut self.rng)
        } else {
            Vec::new()
        };
        let inherited = candidates.len();

        for (j, &count) in plan.founded.iter().enumerate() {
            if count > 0 {
                let founded = self.found_chromosomes(j, count)?;
                candidates.extend(founded);
            }
        }
        let founder_labels: Vec<AncestryLabel> = candidates[inherited..]
            .iter()
            .map(|chr| chr.segments()[0].label)
            .collect();
        let num_candidates = candidates.len();
        if num_candidates == 0 {
            log::warn!(
                "Generation {}: no chromosomes founded or inherited (Ne = {effective_size})",
                t + 1
            );
        }

        let mut next = P::from_chromosomes(candidates);
        next.evolve(effective_size, &mut self.rng)?;
        self.population = next;

        log::debug!(
            "Generation {}: Ne = {effective_size}, founded {:?}, inherited {inherited}, {} chromosomes",
            t + 1,
            plan.founded,
            self.population.len()
        );

        let record = GenerationRecord {
            generation: t,
            effective_size,
            founded: plan.founded,
            inherited,
            candidates: num_candidates,
            evolved: self.population.len(),
            founder_labels,
        };
        self.generation += 1;
        tracker.record_generation(self, record)
    }

    pub fn run(&mut self, tracker: &mut dyn TrackerTrait<P>) -> Result<()> {
        let bar = ProgressBar::new((self.model.t() - self.generation) as u64);
        while !self.is_complete() {
            bar.inc(1);
            self.step(tracker)?;
        }
        bar.finish();
        Ok(())
    }

    // ── Finalization ──────────────────────────────────────────────────────────

    pub fn finalize(self, tracker: &mut dyn TrackerTrait<P>) -> Result<P> {
        tracker.finalize(&self)?;
        Ok(self.population)
    }
}
