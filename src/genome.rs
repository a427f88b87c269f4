//! Chromosomes as mosaics of ancestry segments.

use std::fmt;

/// Spacing between the label codes of consecutive source populations.
pub const LABEL_STRIDE: u64 = 10_000;

/// Identifies the founder haplotype a stretch of genome descends from.
///
/// The numeric code written to output is `(population + 1) * 10000 + founder`.
/// Founder indices at or above 10000 give codes that overlap the next
/// population's range; the label itself keeps both indices exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AncestryLabel {
    population: usize,
    founder: usize,
}

impl AncestryLabel {
    pub fn new(population: usize, founder: usize) -> Self {
        Self {
            population,
            founder,
        }
    }

    /// Zero-based source population index.
    pub fn population(self) -> usize {
        self.population
    }

    /// Founder haplotype index within the source population.
    pub fn founder(self) -> usize {
        self.founder
    }

    pub fn code(self) -> u64 {
        (self.population as u64 + 1) * LABEL_STRIDE + self.founder as u64
    }
}

impl fmt::Display for AncestryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Half-open genomic interval `[start, end)` in Morgans with a single ancestry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub label: AncestryLabel,
}

impl Segment {
    pub fn new(start: f64, end: f64, label: AncestryLabel) -> Self {
        Self { start, end, label }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// A haploid chromosome: contiguous, sorted segments starting at 0.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Chromosome {
    segments: Vec<Segment>,
}

impl Chromosome {
    /// A chromosome inherited in one piece from a single founder.
    pub fn founder(length: f64, label: AncestryLabel) -> Self {
        Self {
            segments: vec![Segment::new(0.0, length, label)],
        }
    }

    /// Build from ordered segments, merging neighbours that share a label.
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut merged: Vec<Segment> = Vec::new();
        for seg in segments {
            if seg.end <= seg.start {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.label == seg.label && last.end == seg.start => {
                    last.end = seg.end;
                }
                _ => merged.push(seg),
            }
        }
        Self { segments: merged }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Right end of the last segment.
    pub fn length(&self) -> f64 {
        self.segments.last().map_or(0.0, |s| s.end)
    }

    pub fn label_at(&self, position: f64) -> Option<AncestryLabel> {
        let i = self.segments.partition_point(|s| s.end <= position);
        self.segments
            .get(i)
            .filter(|s| s.start <= position)
            .map(|s| s.label)
    }

    /// Total length contributed by each of the `k` source populations.
    pub fn ancestry_lengths(&self, k: usize) -> Vec<f64> {
        let mut lengths = vec![0.0; k];
        for seg in &self.segments {
            if let Some(l) = lengths.get_mut(seg.label.population()) {
                *l += seg.length();
            }
        }
        lengths
    }

    /// Append the parts of this chromosome falling in `[start, end)` to `out`.
    fn copy_range(&self, start: f64, end: f64, out: &mut Vec<Segment>) {
        let lo = self.segments.partition_point(|s| s.end <= start);
        for seg in &self.segments[lo..] {
            if seg.start >= end {
                break;
            }
            out.push(Segment::new(seg.start.max(start), seg.end.min(end), seg.label));
        }
    }
}

/// Two homologous chromosomes held together for crossing over.
#[derive(Clone, Copy, Debug)]
pub struct ChromosomePair<'a> {
    pub first: &'a Chromosome,
    pub second: &'a Chromosome,
}

impl<'a> ChromosomePair<'a> {
    pub fn new(first: &'a Chromosome, second: &'a Chromosome) -> Self {
        Self { first, second }
    }

    /// Cross over at the given sorted breakpoints and return both recombinants.
    ///
    /// The first recombinant starts on `first`; each breakpoint switches template.
    pub fn recombine(&self, breakpoints: &[f64]) -> (Chromosome, Chromosome) {
        let length = self.first.length().max(self.second.length());
        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut cur = self.first;
        let mut other = self.second;
        let mut start = 0.0f64;

        for &x in breakpoints {
            cur.copy_range(start, x, &mut left);
            other.copy_range(start, x, &mut right);
            std::mem::swap(&mut cur, &mut other);
            start = x;
        }
        cur.copy_range(start, length, &mut left);
        other.copy_range(start, length, &mut right);

        (
            Chromosome::from_segments(left),
            Chromosome::from_segments(right),
        )
    }
}
