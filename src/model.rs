//! Reading and validating the demographic model of an admixed population.
//!
//! A model file lists the number of founder haplotypes available in each
//! ancestral (source) population, then a `//` marker, then one line per
//! generation holding the effective population size followed by the fraction
//! of that generation's haplotypes newly drawn from each source population.
//!
//! ```text
//! # 2 source populations
//! 100 100
//! //
//! # gen  Ne    p1   p2
//! 1000   0.5  0.5
//! 2000   0.1  0.0
//! ```
//!
//! A [`DemographicModel`] can only be obtained through parsing, which always
//! validates, so any model value handed to the simulation is well formed.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::error::ModelError;
use crate::genome::LABEL_STRIDE;

/// The validated, immutable demographic schedule.
#[derive(Clone, Debug, PartialEq)]
pub struct DemographicModel {
    founder_haplotype_counts: Vec<usize>,
    effective_sizes: Vec<usize>,
    admixture_proportions: Vec<Vec<f64>>,
}

/// Values as they appear in the input, before any rule has been checked.
#[derive(Debug, Default)]
struct RawModel {
    founders: Vec<i64>,
    sizes: Vec<i64>,
    proportions: Vec<Vec<f64>>,
}

impl DemographicModel {
    // ── Construction ──────────────────────────────────────────────────────────

    /// Read and validate a model file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|error| ModelError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read and validate a model from any line-oriented source.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ModelError> {
        let raw = RawModel::scan(reader)?;
        raw.validate()
    }

    /// Parse a model held in memory.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        Self::from_reader(text.as_bytes())
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    /// Number of ancestral source populations.
    pub fn k(&self) -> usize {
        self.founder_haplotype_counts.len()
    }

    /// Number of generations to simulate.
    pub fn t(&self) -> usize {
        self.effective_sizes.len()
    }

    pub fn founder_haplotype_counts(&self) -> &[usize] {
        &self.founder_haplotype_counts
    }

    pub fn effective_sizes(&self) -> &[usize] {
        &self.effective_sizes
    }

    /// `admixture_proportions()[t][j]` is the fraction of generation `t` drawn
    /// fresh from source population `j`.
    pub fn admixture_proportions(&self) -> &[Vec<f64>] {
        &self.admixture_proportions
    }

    /// Fraction of generation `t` carried over from generation `t - 1`.
    ///
    /// Always zero for generation 0.
    pub fn inherited_fraction(&self, t: usize) -> f64 {
        let admixed: f64 = self.admixture_proportions[t].iter().sum();
        (1.0 - admixed).max(0.0)
    }
}

impl FromStr for DemographicModel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DemographicModel {
    /// Writes the model back out in the input format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let founders: Vec<String> = self
            .founder_haplotype_counts
            .iter()
            .map(|n| n.to_string())
            .collect();
        writeln!(f, "{}", founders.join(" "))?;
        writeln!(f, "//")?;
        for (ne, row) in self.effective_sizes.iter().zip(&self.admixture_proportions) {
            write!(f, "{ne}")?;
            for p in row {
                write!(f, " {p}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

fn parse_token<T: FromStr>(
    token: &str,
    line: usize,
    expected: &'static str,
) -> Result<T, ModelError> {
    token.parse().map_err(|_| ModelError::InvalidToken {
        line,
        token: token.to_string(),
        expected,
    })
}

impl RawModel {
    fn scan<R: BufRead>(reader: R) -> Result<Self, ModelError> {
        let mut raw = RawModel::default();
        let mut in_generations = false;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;

            if line.starts_with('#') {
                continue;
            }
            let data = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line.as_str(),
            };

            if data.starts_with("//") {
                if in_generations {
                    return Err(ModelError::DuplicateMarker { line: line_no });
                }
                if raw.founders.is_empty() {
                    return Err(ModelError::UninitializedFounders { line: line_no });
                }
                in_generations = true;
                continue;
            }

            let mut tokens = data.split_whitespace();
            let Some(first) = tokens.next() else {
                continue;
            };

            if in_generations {
                let ne = parse_token(first, line_no, "an effective population size")?;
                let row = tokens
                    .map(|tok| parse_token(tok, line_no, "an admixture proportion"))
                    .collect::<Result<Vec<f64>, _>>()?;
                raw.sizes.push(ne);
                raw.proportions.push(row);
            } else {
                for tok in std::iter::once(first).chain(tokens) {
                    raw.founders
                        .push(parse_token(tok, line_no, "a founder haplotype count")?);
                }
            }
        }

        if !in_generations {
            return Err(ModelError::MissingMarker);
        }
        if raw.sizes.is_empty() {
            return Err(ModelError::NoGenerations);
        }
        Ok(raw)
    }

    // ── Validation ────────────────────────────────────────────────────────────

    fn validate(self) -> Result<DemographicModel, ModelError> {
        self.check_founders()?;
        self.check_sizes()?;
        self.check_proportions()?;

        if let Some((population, n)) = self.collision_population() {
            log::warn!(
                "Population {population} has {n} founder haplotypes; its ancestry label codes overlap those of the next population"
            );
        }

        Ok(DemographicModel {
            founder_haplotype_counts: self.founders.iter().map(|&n| n as usize).collect(),
            effective_sizes: self.sizes.iter().map(|&n| n as usize).collect(),
            admixture_proportions: self.proportions,
        })
    }

    /// First population (1-indexed) whose founder count reaches past its
    /// label code range, with that count.
    fn collision_population(&self) -> Option<(usize, i64)> {
        self.founders
            .iter()
            .position(|&n| n > LABEL_STRIDE as i64)
            .map(|j| (j + 1, self.founders[j]))
    }

    fn check_founders(&self) -> Result<(), ModelError> {
        match self.founders.iter().position(|&n| n <= 0) {
            Some(j) => Err(ModelError::NonPositiveFounderCount {
                population: j + 1,
                count: self.founders[j],
            }),
            None => Ok(()),
        }
    }

    fn check_sizes(&self) -> Result<(), ModelError> {
        match self.sizes.iter().position(|&n| n <= 0) {
            Some(t) => Err(ModelError::NonPositiveEffectiveSize {
                generation: t + 1,
                size: self.sizes[t],
            }),
            None => Ok(()),
        }
    }

    fn check_proportions(&self) -> Result<(), ModelError> {
        let k = self.founders.len();
        for (t, row) in self.proportions.iter().enumerate() {
            if row.len() != k {
                return Err(ModelError::ProportionCount {
                    generation: t + 1,
                    expected: k,
                    found: row.len(),
                });
            }

            let mut sum = 0.0;
            for (j, &p) in row.iter().enumerate() {
                if !(0.0..=1.0).contains(&p) {
                    return Err(ModelError::ProportionOutOfRange {
                        generation: t + 1,
                        population: j + 1,
                        value: p,
                    });
                }
                sum += p;
            }

            if t == 0 && sum != 1.0 {
                return Err(ModelError::InitialSumNotOne { sum });
            }
            if sum > 1.0 {
                return Err(ModelError::SumExceedsOne {
                    generation: t + 1,
                    sum,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_WAY: &str = "\
# 2 source populations
100 100
//
# gen  Ne    p1   p2
1000   0.5  0.5
2000   0.1  0.0
";

    fn model_with_generations(rows: &str) -> Result<DemographicModel, ModelError> {
        DemographicModel::parse(&format!("10 10\n//\n{rows}"))
    }

    #[test]
    fn test_parse_two_way_model() {
        let model = DemographicModel::parse(TWO_WAY).unwrap();
        assert_eq!(model.k(), 2);
        assert_eq!(model.t(), 2);
        assert_eq!(model.founder_haplotype_counts(), &[100, 100]);
        assert_eq!(model.effective_sizes(), &[1000, 2000]);
        assert_eq!(model.admixture_proportions()[0], vec![0.5, 0.5]);
        assert_eq!(model.admixture_proportions()[1], vec![0.1, 0.0]);
        for row in model.admixture_proportions() {
            assert_eq!(row.len(), model.k());
        }
    }

    #[test]
    fn test_founders_span_several_lines() {
        let model = DemographicModel::parse("5 6\n7\n//\n10 0.2 0.3 0.5\n").unwrap();
        assert_eq!(model.founder_haplotype_counts(), &[5, 6, 7]);
        assert_eq!(model.k(), 3);
    }

    #[test]
    fn test_inline_comments_are_stripped() {
        let plain = DemographicModel::parse("100 100\n//\n10 0.5 0.5\n").unwrap();
        let commented =
            DemographicModel::parse("100 100 # ten each\n# comment\n//\n10 0.5 0.5 # gen 1\n")
                .unwrap();
        assert_eq!(plain, commented);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let model = DemographicModel::parse("\n3\n\n//\n\n10 1.0\n   \n20 0.5\n").unwrap();
        assert_eq!(model.t(), 2);
        assert_eq!(model.effective_sizes(), &[10, 20]);
    }

    #[test]
    fn test_marker_before_founders_fails() {
        let err = DemographicModel::parse("# nothing yet\n//\n10 1.0\n").unwrap_err();
        assert!(matches!(err, ModelError::UninitializedFounders { line: 2 }));
    }

    #[test]
    fn test_missing_marker_fails() {
        let err = DemographicModel::parse("10 10\n").unwrap_err();
        assert!(matches!(err, ModelError::MissingMarker));
    }

    #[test]
    fn test_second_marker_fails() {
        let err = DemographicModel::parse("10\n//\n10 1.0\n//\n").unwrap_err();
        assert!(matches!(err, ModelError::DuplicateMarker { line: 4 }));
    }

    #[test]
    fn test_no_generations_fails() {
        let err = DemographicModel::parse("10 10\n//\n# empty\n").unwrap_err();
        assert!(matches!(err, ModelError::NoGenerations));
    }

    #[test]
    fn test_unreadable_token_reports_line() {
        let err = model_with_generations("10 0.5 half\n").unwrap_err();
        match err {
            ModelError::InvalidToken { line, token, .. } => {
                assert_eq!(line, 3);
                assert_eq!(token, "half");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(DemographicModel::parse("10 x\n//\n10 1.0\n").is_err());
        assert!(model_with_generations("10.5 0.5 0.5\n").is_err());
    }

    #[test]
    fn test_initial_generation_must_sum_to_one() {
        assert!(model_with_generations("10 0.5 0.5\n").is_ok());
        assert!(matches!(
            model_with_generations("10 0.5 0.499\n").unwrap_err(),
            ModelError::InitialSumNotOne { .. }
        ));
        assert!(matches!(
            model_with_generations("10 0.5 0.501\n").unwrap_err(),
            ModelError::InitialSumNotOne { .. }
        ));
    }

    #[test]
    fn test_later_generation_sum_limit() {
        for row in ["0.0 0.0", "0.3 0.2", "0.5 0.5", "1.0 0.0"] {
            assert!(
                model_with_generations(&format!("10 0.5 0.5\n10 {row}\n")).is_ok(),
                "{row} should pass"
            );
        }
        let err = model_with_generations("10 0.5 0.5\n10 0.75 0.75\n").unwrap_err();
        assert!(matches!(err, ModelError::SumExceedsOne { generation: 2, .. }));
        assert!(err.to_string().contains("generation 2"));
    }

    #[test]
    fn test_proportion_range() {
        assert!(matches!(
            model_with_generations("10 -0.1 1.1\n").unwrap_err(),
            ModelError::ProportionOutOfRange {
                generation: 1,
                population: 1,
                ..
            }
        ));
        assert!(matches!(
            model_with_generations("10 0.5 0.5\n10 0.0 1.1\n").unwrap_err(),
            ModelError::ProportionOutOfRange {
                generation: 2,
                population: 2,
                ..
            }
        ));
        assert!(model_with_generations("10 0.5 0.5\n10 NaN 0.0\n").is_err());
    }

    #[test]
    fn test_row_length_must_match_k() {
        let err = model_with_generations("10 1.0\n").unwrap_err();
        assert!(matches!(
            err,
            ModelError::ProportionCount {
                generation: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_positivity_rules() {
        assert!(matches!(
            DemographicModel::parse("10 0\n//\n10 0.5 0.5\n").unwrap_err(),
            ModelError::NonPositiveFounderCount {
                population: 2,
                count: 0
            }
        ));
        assert!(matches!(
            model_with_generations("0 0.5 0.5\n").unwrap_err(),
            ModelError::NonPositiveEffectiveSize {
                generation: 1,
                size: 0
            }
        ));
        assert!(matches!(
            model_with_generations("10 0.5 0.5\n-5 0.1 0.1\n").unwrap_err(),
            ModelError::NonPositiveEffectiveSize {
                generation: 2,
                size: -5
            }
        ));
    }

    #[test]
    fn test_founders_checked_before_proportions() {
        let err = DemographicModel::parse("0 10\n//\n0 2.0 0.5\n").unwrap_err();
        assert!(matches!(err, ModelError::NonPositiveFounderCount { .. }));
    }

    #[test]
    fn test_inherited_fraction() {
        let model = DemographicModel::parse(TWO_WAY).unwrap();
        assert_eq!(model.inherited_fraction(0), 0.0);
        assert!((model.inherited_fraction(1) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_display_reparses_to_same_model() {
        let model = DemographicModel::parse(TWO_WAY).unwrap();
        let text = model.to_string();
        assert!(text.starts_with("100 100\n//\n"));
        assert_eq!(text.parse::<DemographicModel>().unwrap(), model);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = DemographicModel::from_file("does/not/exist.model").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.model"));
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_collision_population() {
        let raw = RawModel {
            founders: vec![10, 10_001],
            ..Default::default()
        };
        assert_eq!(raw.collision_population(), Some((2, 10_001)));

        // 10000 founders use indices 0..=9999 and stay within their own range
        let raw = RawModel {
            founders: vec![10_000, 5],
            ..Default::default()
        };
        assert_eq!(raw.collision_population(), None);
    }

    #[test]
    fn test_large_founder_count_is_accepted() {
        let model = DemographicModel::parse("5000000000\n//\n10 1.0\n").unwrap();
        assert_eq!(model.founder_haplotype_counts(), &[5_000_000_000]);
    }
}
