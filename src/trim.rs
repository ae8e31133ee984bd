//! Two phase search for trim coordinates.
//!
//! The coarse scan walks outwards from the middle of the read and stops at the
//! first position whose average quality drops below a threshold. It only ever
//! finds one contiguous good region around the middle. The fine sweep then
//! enumerates windows between the coarse boundaries and a looser trimming limit
//! and scores each by its mean expected error per position.
use crate::error::Error;
use crate::{Result, MAX_PHRED};
use log::{debug, warn};
use std::fmt;

/// Default phred threshold of the coarse scan
pub const DEFAULT_THRESHOLD: u8 = 30;
/// Default share of the read the coarse scan may remove at either end before warning
pub const DEFAULT_OBVIOUS_MAX_TRIM: f64 = 0.1;
/// Default share of the read the fine sweep may remove at either end
pub const DEFAULT_FINE_MAX_TRIM: f64 = 0.2;

/// Non-fatal conditions raised by the coarse scan that an operator should review
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TrimWarning {
    /// Neither end had a position below the threshold
    NoTrimming,
    /// Left boundary removes more than the allowed share of the read
    LeftTooHigh {
        /// Chosen boundary
        left: usize,
        /// Largest boundary within the allowed share
        limit: usize,
    },
    /// Right boundary removes more than the allowed share of the read
    RightTooLow {
        /// Chosen boundary
        right: usize,
        /// Smallest boundary within the allowed share
        limit: usize,
    },
}

impl fmt::Display for TrimWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrimWarning::NoTrimming => write!(f, "No obvious trimming performed"),
            TrimWarning::LeftTooHigh { left, limit } => write!(
                f,
                "Trim left value {} might be too high, expected at most {}",
                left, limit
            ),
            TrimWarning::RightTooLow { right, limit } => write!(
                f,
                "Trim right value {} might be too low, expected at least {}",
                right, limit
            ),
        }
    }
}

/// Result of the coarse scan, `[left, right)` being the region kept
#[derive(Debug, Clone, PartialEq)]
pub struct ObviousTrim {
    /// First position kept
    pub left: usize,
    /// One past the last position kept
    pub right: usize,
    /// Guardrails tripped by the chosen boundaries
    pub warnings: Vec<TrimWarning>,
}

/// Number of positions corresponding to `fraction` of `length`
pub fn trim_bound(length: usize, fraction: f64) -> usize {
    (length as f64 * fraction).round() as usize
}

fn check_fraction(name: &str, fraction: f64) -> Result<()> {
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return Err(Error::validation(format!(
            "{} must be within [0, 1], got {}",
            name, fraction
        )));
    }
    Ok(())
}

/// Scans average quality scores outwards from the middle for the first positions below
/// `threshold`.
///
/// The left boundary is one past the first low position left of the middle (0 if none) and
/// the right boundary is the first low position right of it (the length if none).
pub fn obvious_trim(scores: &[f64], threshold: u8, max_trim: f64) -> Result<ObviousTrim> {
    if threshold > MAX_PHRED {
        return Err(Error::validation(format!(
            "threshold must be between 0 and {}, got {}",
            MAX_PHRED, threshold
        )));
    }
    check_fraction("max trim", max_trim)?;
    if scores.is_empty() {
        return Err(Error::validation("no average quality scores to scan"));
    }
    if let Some(score) = scores
        .iter()
        .find(|s| !s.is_finite() || **s < 0.0 || **s > f64::from(MAX_PHRED))
    {
        return Err(Error::validation(format!(
            "average scores must be between 0 and {}, got {}",
            MAX_PHRED, score
        )));
    }

    let length = scores.len();
    let mid = length / 2;
    let threshold = f64::from(threshold);

    let left = (0..=mid)
        .rev()
        .find(|i| scores[*i] < threshold)
        .map_or(0, |i| i + 1);
    let right = (mid..length)
        .find(|i| scores[*i] < threshold)
        .unwrap_or(length);
    debug!("Coarse scan from {} gave [{}, {})", mid, left, right);

    let mut warnings = Vec::new();
    if left == 0 && right == length {
        warnings.push(TrimWarning::NoTrimming);
    }

    let bound = trim_bound(length, max_trim);
    if left > bound {
        warnings.push(TrimWarning::LeftTooHigh { left, limit: bound });
    }
    if right < length - bound {
        warnings.push(TrimWarning::RightTooLow {
            right,
            limit: length - bound,
        });
    }

    for warning in &warnings {
        warn!("{}", warning);
    }

    Ok(ObviousTrim {
        left,
        right,
        warnings,
    })
}

/// A window `[left, right)` with its length and mean per-position expected error
#[derive(Debug, Clone, PartialEq)]
pub struct TrimCandidate {
    /// First position kept
    pub left: usize,
    /// One past the last position kept
    pub right: usize,
    /// Read length after trimming
    pub length: usize,
    /// Mean of the average expected error over the window
    pub avg_expected_error: f64,
}

impl TrimCandidate {
    /// Scores `[left, right)` against the per-position expected errors.
    ///
    /// `None` for empty windows and for windows running past the end of the reads.
    pub fn new(expected_errors: &[f64], left: usize, right: usize) -> Option<Self> {
        if right <= left || right > expected_errors.len() {
            return None;
        }
        let length = right - left;
        let sum: f64 = expected_errors[left..right].iter().sum();
        Some(Self {
            left,
            right,
            length,
            avg_expected_error: sum / length as f64,
        })
    }
}

/// Enumerates windows around the coarse boundaries.
///
/// Lefts run from `obvious.0` up to `round(len * max_trim)`, rights from
/// `len - round(len * max_trim)` up to `obvious.1`, and every pairing of the two is scored,
/// which covers moving either boundary alone as well as both together. Empty windows are
/// skipped. The coarse window itself is always part of the table.
pub fn fine_sweep(
    expected_errors: &[f64],
    obvious: (usize, usize),
    max_trim: f64,
) -> Result<Vec<TrimCandidate>> {
    check_fraction("max trim", max_trim)?;
    if let Some(ee) = expected_errors
        .iter()
        .find(|ee| !ee.is_finite() || **ee < 0.0)
    {
        return Err(Error::validation(format!(
            "expected errors must be non-negative, got {}",
            ee
        )));
    }

    let length = expected_errors.len();
    let (left, right) = obvious;
    if left > length || right > length {
        return Err(Error::validation(format!(
            "window [{}, {}) lies outside of reads of length {}",
            left, right, length
        )));
    }

    let bound = trim_bound(length, max_trim);
    let lefts = left..=left.max(bound);
    let rights = right.min(length - bound)..=right;

    let candidates: Vec<TrimCandidate> = lefts
        .flat_map(|l| {
            rights
                .clone()
                .filter_map(move |r| TrimCandidate::new(expected_errors, l, r))
        })
        .collect();

    debug!(
        "Fine sweep produced {} candidates from [{}, {})",
        candidates.len(),
        left,
        right
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: [f64; 11] = [
        15.0, 20.0, 22.0, 30.0, 30.0, 40.0, 30.0, 30.0, 25.0, 20.0, 15.0,
    ];

    #[test]
    fn scans_from_the_middle() {
        let trim = obvious_trim(&KNOWN, 30, 0.1).unwrap();
        assert_eq!((trim.left, trim.right), (3, 8));
        assert_eq!(
            trim.warnings,
            vec![
                TrimWarning::LeftTooHigh { left: 3, limit: 1 },
                TrimWarning::RightTooLow {
                    right: 8,
                    limit: 10
                },
            ]
        );
    }

    #[test]
    fn no_obvious_trimming() {
        let scores = [30.0, 31.0, 35.0, 40.0, 41.0, 42.0, 38.0, 36.0, 33.0, 30.0, 30.0];
        let trim = obvious_trim(&scores, 30, 0.1).unwrap();
        assert_eq!((trim.left, trim.right), (0, 11));
        assert_eq!(trim.warnings, vec![TrimWarning::NoTrimming]);
    }

    #[test]
    fn only_the_middle_region_is_found() {
        // a second dip at the start is never reached
        let scores = [10.0, 35.0, 35.0, 20.0, 35.0, 35.0, 35.0, 35.0, 35.0, 35.0];
        let trim = obvious_trim(&scores, 30, 0.5).unwrap();
        assert_eq!((trim.left, trim.right), (4, 10));
        assert!(trim.warnings.is_empty());
    }

    #[test]
    fn within_limits_has_no_warnings() {
        let mut scores = vec![35.0; 20];
        scores[0] = 12.0;
        scores[19] = 12.0;
        let trim = obvious_trim(&scores, 30, 0.1).unwrap();
        assert_eq!((trim.left, trim.right), (1, 19));
        assert!(trim.warnings.is_empty());
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(matches!(
            obvious_trim(&[20.0, 50.0, 2.0], 30, 0.1),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            obvious_trim(&[20.0, 30.0], 43, 0.1),
            Err(Error::Validation(_))
        ));
        assert!(obvious_trim(&[20.0, f64::NAN], 30, 0.1).is_err());
        assert!(obvious_trim(&[], 30, 0.1).is_err());
        assert!(obvious_trim(&[20.0, 30.0], 30, 1.5).is_err());
    }

    #[test]
    fn sweeps_around_obvious_window() {
        let ee: Vec<f64> = (0..10).map(|i| i as f64 / 100.0).collect();
        let candidates = fine_sweep(&ee, (1, 9), 0.2).unwrap();

        // lefts 1..=2, rights 8..=9
        let windows: Vec<(usize, usize)> = candidates.iter().map(|c| (c.left, c.right)).collect();
        assert_eq!(windows, vec![(1, 8), (1, 9), (2, 8), (2, 9)]);

        let first = &candidates[0];
        assert_eq!(first.length, 7);
        let expected: f64 = ee[1..8].iter().sum::<f64>() / 7.0;
        assert!((first.avg_expected_error - expected).abs() < 1e-12);
    }

    #[test]
    fn coarse_window_beyond_fine_limit() {
        let ee = vec![0.01; 10];
        let candidates = fine_sweep(&ee, (4, 5), 0.2).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!((candidates[0].left, candidates[0].right), (4, 5));
    }

    #[test]
    fn skips_empty_windows() {
        let ee = vec![0.01; 10];
        // coarse scan can cross over when the middle itself is low
        assert!(fine_sweep(&ee, (6, 5), 0.2).unwrap().is_empty());
        assert!(TrimCandidate::new(&ee, 3, 3).is_none());
    }

    #[test]
    fn candidate_must_fit_reads() {
        let ee = vec![0.01; 10];
        assert!(TrimCandidate::new(&ee, 2, 11).is_none());
        let full = TrimCandidate::new(&ee, 2, 10).unwrap();
        assert_eq!(full.length, 8);
    }

    #[test]
    fn rejects_window_outside_reads() {
        let ee = vec![0.01; 10];
        assert!(matches!(
            fine_sweep(&ee, (0, 11), 0.2),
            Err(Error::Validation(_))
        ));
        assert!(fine_sweep(&[0.1, -0.1], (0, 2), 0.2).is_err());
    }
}
