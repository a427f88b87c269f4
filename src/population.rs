//! The population-evolution collaborator used by the simulation driver.
//!
//! The driver only needs to build a population from chromosomes, draw
//! chromosomes out of it and advance it by one generation, so those three
//! operations form the [`EvolvingPopulation`] trait. [`Population`] is a
//! Wright-Fisher implementation with crossing over.

use anyhow::Result;
use rand::Rng;
use rand::distr::{Distribution, Uniform};
use rand_distr::Poisson;

use crate::genome::{Chromosome, ChromosomePair};

pub trait EvolvingPopulation: Default {
    fn from_chromosomes(chromosomes: Vec<Chromosome>) -> Self;

    fn chromosomes(&self) -> &[Chromosome];

    /// Draw `n` chromosomes from the population.
    fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Chromosome>;

    /// Replace the population with the next generation of `effective_size`
    /// diploid individuals.
    fn evolve<R: Rng + ?Sized>(&mut self, effective_size: usize, rng: &mut R) -> Result<()>;

    fn len(&self) -> usize {
        self.chromosomes().len()
    }

    fn is_empty(&self) -> bool {
        self.chromosomes().is_empty()
    }
}

/// A pool of haploid chromosomes under random mating.
#[derive(Clone, Debug, Default)]
pub struct Population {
    chromosomes: Vec<Chromosome>,
}

impl Population {
    /// Genetic length (Morgans) of the longest chromosome.
    pub fn chromosome_length(&self) -> f64 {
        self.chromosomes
            .iter()
            .map(Chromosome::length)
            .fold(0.0, f64::max)
    }

    pub fn into_chromosomes(self) -> Vec<Chromosome> {
        self.chromosomes
    }
}

fn draw_breakpoints<R: Rng + ?Sized>(
    rec_poisson: Option<&Poisson<f64>>,
    length: f64,
    rng: &mut R,
) -> Result<Vec<f64>> {
    let num_bp = match rec_poisson {
        Some(dist) => dist.sample(rng) as usize,
        None => 0,
    };
    if num_bp == 0 {
        return Ok(vec![]);
    }
    let bp_dist = Uniform::new(0.0f64, length)?;
    let mut breakpoints: Vec<f64> = (0..num_bp).map(|_| bp_dist.sample(rng)).collect();
    breakpoints.sort_unstable_by(f64::total_cmp);
    breakpoints.dedup();
    Ok(breakpoints)
}

impl EvolvingPopulation for Population {
    fn from_chromosomes(chromosomes: Vec<Chromosome>) -> Self {
        Self { chromosomes }
    }

    fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    /// Uniform draws with replacement. An empty population yields nothing.
    fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Chromosome> {
        if self.chromosomes.is_empty() {
            return Vec::new();
        }
        (0..n)
            .map(|_| self.chromosomes[rng.random_range(0..self.chromosomes.len())].clone())
            .collect()
    }

    /// Each of the `effective_size` offspring individuals picks two distinct
    /// parental chromosomes, crosses them over at Poisson(length) uniform
    /// breakpoints, and keeps both recombinants.
    fn evolve<R: Rng + ?Sized>(&mut self, effective_size: usize, rng: &mut R) -> Result<()> {
        let n = self.chromosomes.len();
        if n == 0 {
            log::warn!("Evolving an empty population; the next generation is empty too");
            return Ok(());
        }

        let length = self.chromosome_length();
        let rec_poisson = if length > 0.0 {
            Some(Poisson::new(length)?)
        } else {
            None
        };
        let uniform_parent = Uniform::new(0usize, n)?;

        let mut offspring = Vec::with_capacity(2 * effective_size);
        for _ in 0..effective_size {
            let pa = uniform_parent.sample(rng);
            let mut pb = uniform_parent.sample(rng);
            while pb == pa && n > 1 {
                pb = uniform_parent.sample(rng);
            }
            let breakpoints = draw_breakpoints(rec_poisson.as_ref(), length, rng)?;
            let (x, y) = ChromosomePair::new(&self.chromosomes[pa], &self.chromosomes[pb])
                .recombine(&breakpoints);
            offspring.push(x);
            offspring.push(y);
        }

        self.chromosomes = offspring;
        Ok(())
    }
}
