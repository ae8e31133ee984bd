//! End-to-end estimate of trim parameters and the tab separated tables it produces.
use crate::error::Error;
use crate::maxee::{
    self, BudgetCount, ClassifiedCandidate, ExpectedErrorSum, CANDIDATE_COLUMNS,
    DEFAULT_MAX_EXPECTED_ERROR,
};
use crate::reader::{FastqReader, PositionStats};
use crate::trim::{
    self, ObviousTrim, TrimCandidate, DEFAULT_FINE_MAX_TRIM, DEFAULT_OBVIOUS_MAX_TRIM,
    DEFAULT_THRESHOLD,
};
use crate::{expected_error, Result};
use log::{info, warn};
use std::io::Write;

/// Parameters of the trim estimate
#[derive(Debug, Clone, PartialEq)]
pub struct TrimConfig {
    /// Phred threshold of the coarse scan
    pub threshold: u8,
    /// Share of the read the coarse scan may remove at either end before warning
    pub obvious_max_trim: f64,
    /// Share of the read the fine sweep may remove at either end
    pub fine_max_trim: f64,
    /// Largest summed expected error a read may carry
    pub max_expected_error: f64,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            obvious_max_trim: DEFAULT_OBVIOUS_MAX_TRIM,
            fine_max_trim: DEFAULT_FINE_MAX_TRIM,
            max_expected_error: DEFAULT_MAX_EXPECTED_ERROR,
        }
    }
}

/// Everything computed by [`estimate`]
#[derive(Debug, Clone, PartialEq)]
pub struct TrimReport {
    /// Per position averages the search was based on
    pub positions: Vec<PositionStats>,
    /// Coarse boundaries and their warnings
    pub obvious: ObviousTrim,
    /// Every window of the fine sweep with its read counts
    pub candidates: Vec<ClassifiedCandidate>,
}

/// Runs the coarse scan, the fine sweep and the error budget classification over `reader`
pub fn estimate(reader: &FastqReader, config: &TrimConfig) -> Result<TrimReport> {
    if config.obvious_max_trim > config.fine_max_trim {
        warn!(
            "Obvious trimming may remove {} of the read but the fine sweep only {}, which is not recommended",
            config.obvious_max_trim, config.fine_max_trim
        );
    }

    info!("Averaging quality per position...");
    let positions = reader.position_stats()?;
    let averages: Vec<f64> = positions.iter().map(|p| p.average_quality).collect();
    let expected_errors: Vec<f64> = averages.iter().copied().map(expected_error).collect();

    let obvious = trim::obvious_trim(&averages, config.threshold, config.obvious_max_trim)?;
    info!(
        "Obvious trimming keeps positions [{}, {})",
        obvious.left, obvious.right
    );

    let sweep = trim::fine_sweep(
        &expected_errors,
        (obvious.left, obvious.right),
        config.fine_max_trim,
    )?;
    let candidates = maxee::classify(reader.records()?, &sweep, config.max_expected_error)?;

    Ok(TrimReport {
        positions,
        obvious,
        candidates,
    })
}

/// A row of a tab separated table
pub trait TsvRow {
    /// Column names
    fn header() -> Vec<&'static str>;
    /// Tab joined fields without a trailing newline
    fn to_tsv_row(&self) -> String;
}

impl TsvRow for TrimCandidate {
    fn header() -> Vec<&'static str> {
        CANDIDATE_COLUMNS.to_vec()
    }

    fn to_tsv_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.left, self.right, self.length, self.avg_expected_error
        )
    }
}

impl TsvRow for ClassifiedCandidate {
    fn header() -> Vec<&'static str> {
        let mut header = TrimCandidate::header();
        header.extend_from_slice(&["ReadsUnderMaxEE", "ReadsOverMaxEE"]);
        header
    }

    fn to_tsv_row(&self) -> String {
        let BudgetCount { under, over } = self.counts;
        format!("{}\t{}\t{}", self.candidate.to_tsv_row(), under, over)
    }
}

impl TsvRow for ExpectedErrorSum {
    fn header() -> Vec<&'static str> {
        vec!["NoTrimming", "ObviousTrimming"]
    }

    fn to_tsv_row(&self) -> String {
        format!("{}\t{}", self.untrimmed, self.trimmed)
    }
}

impl TsvRow for PositionStats {
    fn header() -> Vec<&'static str> {
        vec![
            "Position",
            "AverageQuality",
            "AverageExpectedError",
            "AmbiguousBases",
        ]
    }

    fn to_tsv_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.position, self.average_quality, self.average_expected_error, self.ambiguous_bases
        )
    }
}

/// Writes a header line followed by one line per row
pub fn write_tsv<W, T, I>(mut wtr: W, rows: I) -> Result<()>
where
    W: Write,
    T: TsvRow,
    I: IntoIterator<Item = Result<T>>,
{
    writeln!(wtr, "{}", T::header().join("\t"))?;
    for row in rows {
        writeln!(wtr, "{}", row?.to_tsv_row())?;
    }
    wtr.flush().map_err(Error::from)
}
