use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while reading or validating a demographic model.
///
/// Line numbers and generation indices are 1-indexed, matching what a user sees
/// in an editor. Each message is complete on its own line: I/O failures are
/// folded into the message rather than exposed as a source.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Can't open model file {}: {error}", .path.display())]
    Io { path: PathBuf, error: std::io::Error },
    #[error("Failed to read model input: {0}")]
    Read(std::io::Error),
    #[error("Uninitialized number of ancestral population haplotypes (line {line})")]
    UninitializedFounders { line: usize },
    #[error("Unexpected second '//' marker on line {line}")]
    DuplicateMarker { line: usize },
    #[error("Missing '//' marker separating founder counts from generations")]
    MissingMarker,
    #[error("No generations given after the '//' marker")]
    NoGenerations,
    #[error("Line {line}: cannot read {expected} from '{token}'")]
    InvalidToken {
        line: usize,
        token: String,
        expected: &'static str,
    },
    #[error(
        "The size of ancestral haplotypes must be positive (population {population} has {count})"
    )]
    NonPositiveFounderCount { population: usize, count: i64 },
    #[error("Population size must be positive (generation {generation} has {size})")]
    NonPositiveEffectiveSize { generation: usize, size: i64 },
    #[error(
        "Generation {generation} lists {found} admixture proportions but there are {expected} ancestral populations"
    )]
    ProportionCount {
        generation: usize,
        expected: usize,
        found: usize,
    },
    #[error(
        "Admixture proportion must be between 0 and 1 (generation {generation}, population {population}: {value})"
    )]
    ProportionOutOfRange {
        generation: usize,
        population: usize,
        value: f64,
    },
    #[error("The admixture proportion of initial generation must sum to 1 (sum is {sum})")]
    InitialSumNotOne { sum: f64 },
    #[error("The sum of admixture proportion in generation {generation} is larger than 1 ({sum})")]
    SumExceedsOne { generation: usize, sum: f64 },
}

impl From<std::io::Error> for ModelError {
    fn from(error: std::io::Error) -> Self {
        ModelError::Read(error)
    }
}
