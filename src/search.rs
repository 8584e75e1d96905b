//! Candidate quantization search.
//!
//! Each trial scales the standard tables to a *level* (1-100, same
//! formula as libjpeg quality), encodes the pre-transformed blocks, decodes
//! the result and measures its distortion against the reference. The
//! search keeps an open window `(lo, hi)` where `lo` is the largest level
//! seen failing and `hi` the smallest level seen passing, and narrows it
//! until it is empty or the trial budget runs out.

use tracing::{debug, warn};

use crate::decode::decode_jpeg;
use crate::error::{Error, Result};
use crate::jpeg::quantize::QuantizationTables;
use crate::jpeg::{encode_blocks, BlockImage};
use crate::metric::DistortionMetric;
use crate::pixels::PixelBuffer;

/// Highest candidate level (all-ones tables).
pub const MAX_LEVEL: u8 = 100;

/// Distortion budget at quality 0.
pub const MAX_THRESHOLD: f64 = 0.05;

/// Distortion budget for a quality setting.
///
/// `0.05 * ((100 - q) / 100)^1.5`: zero at 100, [`MAX_THRESHOLD`] at 0,
/// strictly decreasing in between.
pub fn distortion_threshold(quality: u8) -> f64 {
    let slack = (100 - quality.min(100)) as f64 / 100.0;
    MAX_THRESHOLD * slack.powf(1.5)
}

/// Most aggressive level the search may try for `quality`.
pub fn search_floor(quality: u8) -> u8 {
    (quality.min(100) / 2).max(1)
}

/// Tuning for one search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Requested quality, 0-100.
    pub quality: u8,
    /// Trial budget, at least 1.
    pub max_iterations: u32,
    /// Fail instead of falling back when nothing meets the budget.
    pub strict: bool,
    /// Build optimized Huffman tables for each candidate.
    pub optimize_huffman: bool,
    /// Levels evaluated per round; 1 is a plain bisection.
    pub probes_per_round: u8,
    /// Lower bound on the floor, e.g. the level an input JPEG was
    /// encoded at. 1 leaves the quality floor alone.
    pub min_level: u8,
}

impl SearchParams {
    pub fn new(quality: u8) -> Self {
        Self {
            quality,
            max_iterations: 16,
            strict: false,
            optimize_huffman: true,
            probes_per_round: 1,
            min_level: 1,
        }
    }
}

/// One evaluated trial.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizationCandidate {
    /// Level the tables were scaled to.
    pub level: u8,
    /// `[luminance, chrominance]` steps in natural order.
    pub tables: [[u16; 64]; 2],
    /// Size of `bytes`.
    pub encoded_size: usize,
    /// Distance of the decoded candidate from the reference.
    pub distortion: f64,
    bytes: Vec<u8>,
}

impl QuantizationCandidate {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Smaller output wins, then lower distortion.
    fn beats(&self, other: &QuantizationCandidate) -> bool {
        (self.encoded_size, self.distortion) < (other.encoded_size, other.distortion)
    }
}

/// Outcome of a search, returned next to the chosen bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchReport {
    pub quality: u8,
    /// Distortion budget derived from `quality`.
    pub threshold: f64,
    /// Level of the returned candidate.
    pub level: u8,
    pub distortion: f64,
    pub encoded_size: usize,
    /// Trials evaluated.
    pub iterations: u32,
    /// The window closed before the budget ran out.
    pub converged: bool,
    /// False when the result is a best-effort fallback over budget.
    pub target_met: bool,
}

struct SearchState {
    /// Smallest passing candidate so far.
    current_best: Option<QuantizationCandidate>,
    /// Lowest-distortion candidate overall, for the fallback.
    least_distorted: Option<QuantizationCandidate>,
    target: f64,
    iteration_count: u32,
    converged: bool,
    /// Largest failing level (exclusive bound).
    lo: u8,
    /// Smallest passing level (exclusive bound).
    hi: u8,
}

impl SearchState {
    fn new(target: f64, floor: u8) -> Self {
        Self {
            current_best: None,
            least_distorted: None,
            target,
            iteration_count: 0,
            converged: false,
            lo: floor - 1,
            hi: MAX_LEVEL + 1,
        }
    }

    fn window_is_empty(&self) -> bool {
        self.hi.saturating_sub(self.lo) <= 1
    }

    /// Up to `count` levels spread evenly across the open window.
    fn next_levels(&self, count: u8) -> Vec<u8> {
        let span = (self.hi - self.lo) as u32;
        let count = (count as u32).min(span - 1).max(1);
        let mut levels: Vec<u8> = (1..=count)
            .map(|i| (self.lo as u32 + i * span / (count + 1)) as u8)
            .filter(|&l| l > self.lo && l < self.hi)
            .collect();
        levels.dedup();
        levels
    }

    /// Fold one trial into the window and the running bests.
    fn record(&mut self, candidate: QuantizationCandidate) {
        self.iteration_count += 1;
        let passed = candidate.distortion <= self.target;
        debug!(
            level = candidate.level,
            size = candidate.encoded_size,
            distortion = candidate.distortion,
            passed,
            "evaluated candidate"
        );

        if passed {
            self.hi = self.hi.min(candidate.level);
        } else if candidate.level < self.hi {
            self.lo = self.lo.max(candidate.level);
        }

        if self
            .least_distorted
            .as_ref()
            .is_none_or(|best| candidate.distortion < best.distortion)
        {
            self.least_distorted = Some(candidate.clone());
        }
        if passed
            && self
                .current_best
                .as_ref()
                .is_none_or(|best| candidate.beats(best))
        {
            self.current_best = Some(candidate);
        }
    }
}

/// Encode `blocks` at `level` and measure the decoded result.
fn evaluate(
    reference: &PixelBuffer,
    blocks: &BlockImage,
    metric: &dyn DistortionMetric,
    optimize_huffman: bool,
    level: u8,
) -> Result<QuantizationCandidate> {
    let tables = QuantizationTables::with_quality(level);
    let bytes = encode_blocks(blocks, &tables, optimize_huffman);
    let decoded = decode_jpeg(&bytes)?;
    let distortion = metric.distance(reference, &decoded)?;
    Ok(QuantizationCandidate {
        level,
        tables: tables.as_matrix(),
        encoded_size: bytes.len(),
        distortion,
        bytes,
    })
}

#[cfg(feature = "parallel")]
fn evaluate_round(
    reference: &PixelBuffer,
    blocks: &BlockImage,
    metric: &dyn DistortionMetric,
    optimize_huffman: bool,
    levels: &[u8],
) -> Result<Vec<QuantizationCandidate>> {
    use rayon::prelude::*;
    levels
        .par_iter()
        .map(|&level| evaluate(reference, blocks, metric, optimize_huffman, level))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate_round(
    reference: &PixelBuffer,
    blocks: &BlockImage,
    metric: &dyn DistortionMetric,
    optimize_huffman: bool,
    levels: &[u8],
) -> Result<Vec<QuantizationCandidate>> {
    levels
        .iter()
        .map(|&level| evaluate(reference, blocks, metric, optimize_huffman, level))
        .collect()
}

/// Search for the smallest candidate whose distortion against `reference`
/// stays within the budget for `params.quality`.
///
/// `blocks` must be the transform of `reference`.
///
/// # Errors
/// - [`Error::InvalidQuality`] / [`Error::InvalidOption`] for bad params.
/// - [`Error::DistortionUnreachable`] in strict mode when no trial passes.
/// - Decode or metric errors from a trial.
pub fn search(
    reference: &PixelBuffer,
    blocks: &BlockImage,
    metric: &dyn DistortionMetric,
    params: &SearchParams,
) -> Result<(QuantizationCandidate, SearchReport)> {
    if params.quality > 100 {
        return Err(Error::InvalidQuality(params.quality));
    }
    if params.max_iterations == 0 {
        return Err(Error::InvalidOption("max_iterations must be at least 1"));
    }

    let target = distortion_threshold(params.quality);
    let floor = search_floor(params.quality).max(params.min_level.min(MAX_LEVEL));
    let mut state = SearchState::new(target, floor);
    let mut levels = vec![params.quality.clamp(floor, MAX_LEVEL)];

    loop {
        let budget = params.max_iterations - state.iteration_count;
        levels.truncate(budget as usize);
        for candidate in evaluate_round(reference, blocks, metric, params.optimize_huffman, &levels)? {
            state.record(candidate);
        }

        if state.window_is_empty() {
            state.converged = true;
            debug!(
                iterations = state.iteration_count,
                lo = state.lo,
                hi = state.hi,
                "search converged"
            );
            break;
        }
        if state.iteration_count >= params.max_iterations {
            debug!(iterations = state.iteration_count, "search budget exhausted");
            break;
        }
        levels = state.next_levels(params.probes_per_round.max(1));
    }

    let iterations = state.iteration_count;
    let converged = state.converged;
    let (chosen, target_met) = match (state.current_best, state.least_distorted) {
        (Some(best), _) => (best, true),
        (None, Some(fallback)) => {
            if params.strict {
                return Err(Error::DistortionUnreachable {
                    threshold: target,
                    best_distortion: fallback.distortion,
                    iterations,
                });
            }
            warn!(
                quality = params.quality,
                threshold = target,
                distortion = fallback.distortion,
                "no candidate met the distortion target; returning least distorted"
            );
            (fallback, false)
        }
        // At least one trial always runs.
        (None, None) => return Err(Error::InvalidOption("max_iterations must be at least 1")),
    };

    let report = SearchReport {
        quality: params.quality,
        threshold: target,
        level: chosen.level,
        distortion: chosen.distortion,
        encoded_size: chosen.encoded_size,
        iterations,
        converged,
        target_met,
    };
    Ok((chosen, report))
}
