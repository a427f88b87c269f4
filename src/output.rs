//! Writing simulated haplotypes and a summary of the run.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::genome::Chromosome;
use crate::model::DemographicModel;
use crate::{GenerationRecord, Parameters};

pub const SEGMENT_HEADER: &str = "haplotype\tstart\tend\tlabel\tpopulation\tfounder";

/// One line per ancestry segment. Haplotypes and populations are 1-indexed.
pub fn write_segments<W: Write>(mut writer: W, chromosomes: &[Chromosome]) -> Result<()> {
    writeln!(writer, "{SEGMENT_HEADER}")?;
    for (h, chr) in chromosomes.iter().enumerate() {
        for seg in chr.segments() {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}",
                h + 1,
                seg.start,
                seg.end,
                seg.label,
                seg.label.population() + 1,
                seg.label.founder()
            )?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Mean fraction of the genome inherited from each of the `k` source populations.
pub fn mean_ancestry(chromosomes: &[Chromosome], k: usize) -> Vec<f64> {
    let mut totals = vec![0.0; k];
    let mut genome = 0.0;
    for chr in chromosomes {
        for (total, l) in totals.iter_mut().zip(chr.ancestry_lengths(k)) {
            *total += l;
        }
        genome += chr.length();
    }
    if genome > 0.0 {
        for total in &mut totals {
            *total /= genome;
        }
    }
    totals
}

#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub random_seed: u64,
    pub chromosome_length: f64,
    pub source_populations: usize,
    pub generations: usize,
    pub final_haplotypes: usize,
    /// First generation (1-indexed) that evolved to no chromosomes at all.
    pub first_empty_generation: Option<usize>,
    pub mean_ancestry: Vec<f64>,
    pub records: &'a [GenerationRecord],
}

impl<'a> RunSummary<'a> {
    pub fn new(
        params: &Parameters,
        model: &DemographicModel,
        records: &'a [GenerationRecord],
        chromosomes: &[Chromosome],
    ) -> Self {
        Self {
            random_seed: params.random_seed,
            chromosome_length: params.chromosome_length,
            source_populations: model.k(),
            generations: model.t(),
            final_haplotypes: chromosomes.len(),
            first_empty_generation: records
                .iter()
                .find(|r| r.evolved == 0)
                .map(|r| r.generation + 1),
            mean_ancestry: mean_ancestry(chromosomes, model.k()),
            records,
        }
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
