//! Counting reads against a maximum cumulative expected error.
use crate::error::Error;
use crate::record::Record;
use crate::trim::TrimCandidate;
use crate::Result;
use log::{debug, info};
use rayon::prelude::*;
use std::io::BufRead;

/// Default maximum summed expected error a read may carry, matching common denoiser settings
pub const DEFAULT_MAX_EXPECTED_ERROR: f64 = 2.0;
/// Columns every candidate table starts with
pub const CANDIDATE_COLUMNS: [&str; 4] =
    ["LeftIndex", "RightIndex", "ReadLength", "AvgEEPerPosition"];

const CHUNK_SIZE: usize = 8192;

/// Reads within and above the expected error budget for one window
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct BudgetCount {
    /// Reads whose summed expected error is at most the budget
    pub under: usize,
    /// Reads whose summed expected error exceeds the budget
    pub over: usize,
}

impl BudgetCount {
    /// Number of reads classified
    pub fn total(&self) -> usize {
        self.under + self.over
    }
}

/// A trim candidate together with its error budget classification
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedCandidate {
    /// The scored window
    pub candidate: TrimCandidate,
    /// Read counts on either side of the budget
    pub counts: BudgetCount,
}

/// Classifies every record against `max_ee` once per candidate window.
///
/// Records are gathered in chunks and every chunk is tallied across the rayon pool. For each
/// window `under + over` equals the number of records. Windows running past the end of a
/// shorter read are summed over the bases that exist.
pub fn classify<I>(
    records: I,
    candidates: &[TrimCandidate],
    max_ee: f64,
) -> Result<Vec<ClassifiedCandidate>>
where
    I: IntoIterator<Item = Result<Record>>,
{
    if !max_ee.is_finite() || max_ee < 0.0 {
        return Err(Error::validation(format!(
            "maximum expected error must be a non-negative number, got {}",
            max_ee
        )));
    }
    if let Some(c) = candidates
        .iter()
        .find(|c| c.right <= c.left || c.length != c.right - c.left)
    {
        return Err(Error::validation(format!(
            "candidate [{}, {}) with length {} is not a valid window",
            c.left, c.right, c.length
        )));
    }

    info!(
        "Classifying reads against a maximum expected error of {} for {} windows",
        max_ee,
        candidates.len()
    );
    let mut totals = vec![BudgetCount::default(); candidates.len()];
    let mut chunk = Vec::with_capacity(CHUNK_SIZE);
    for record in records {
        chunk.push(record?);
        if chunk.len() == CHUNK_SIZE {
            tally(&chunk, candidates, max_ee, &mut totals);
            chunk.clear();
        }
    }
    tally(&chunk, candidates, max_ee, &mut totals);

    Ok(candidates
        .iter()
        .cloned()
        .zip(totals)
        .map(|(candidate, counts)| ClassifiedCandidate { candidate, counts })
        .collect())
}

fn tally(chunk: &[Record], candidates: &[TrimCandidate], max_ee: f64, totals: &mut [BudgetCount]) {
    if chunk.is_empty() {
        return;
    }

    let counts = chunk
        .par_iter()
        .fold(
            || vec![BudgetCount::default(); candidates.len()],
            |mut counts, record| {
                let prefix = record.expected_error_prefix_sums();
                let last = prefix.len() - 1;
                for (count, candidate) in counts.iter_mut().zip(candidates) {
                    let end = candidate.right.min(last);
                    let start = candidate.left.min(end);
                    if prefix[end] - prefix[start] <= max_ee {
                        count.under += 1;
                    } else {
                        count.over += 1;
                    }
                }
                counts
            },
        )
        .reduce(
            || vec![BudgetCount::default(); candidates.len()],
            |mut a, b| {
                merge(&mut a, &b);
                a
            },
        );

    merge(totals, &counts);
    debug!("Tallied a chunk of {} records", chunk.len());
}

fn merge(into: &mut [BudgetCount], from: &[BudgetCount]) {
    for (a, b) in into.iter_mut().zip(from) {
        a.under += b.under;
        a.over += b.over;
    }
}

/// Summed expected error of a read without trimming and within the coarse window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedErrorSum {
    /// Over the whole read
    pub untrimmed: f64,
    /// Over `[left, right)`
    pub trimmed: f64,
}

/// Yields the untrimmed and `[left, right)` expected error sums of every record
pub fn expected_error_sums<I>(
    records: I,
    left: usize,
    right: usize,
) -> impl Iterator<Item = Result<ExpectedErrorSum>>
where
    I: IntoIterator<Item = Result<Record>>,
{
    records.into_iter().map(move |record| {
        let record = record?;
        Ok(ExpectedErrorSum {
            untrimmed: record.expected_error_sum(0..record.len()),
            trimmed: record.expected_error_sum(left..right),
        })
    })
}

/// Loads a tab separated candidate table, checking that it starts with [`CANDIDATE_COLUMNS`].
///
/// Further columns, such as counts of an earlier classification, are ignored.
pub fn read_candidates<R: BufRead>(rdr: R) -> Result<Vec<TrimCandidate>> {
    let mut lines = rdr.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(Error::validation("candidate table is empty")),
    };

    let columns: Vec<&str> = header.trim_end().split('\t').collect();
    if columns.len() < CANDIDATE_COLUMNS.len() || columns[..4] != CANDIDATE_COLUMNS[..] {
        return Err(Error::validation(format!(
            "candidate table columns {:?} do not start with {:?}",
            columns, CANDIDATE_COLUMNS
        )));
    }

    let mut candidates = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = i + 2;
        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        if fields.len() < CANDIDATE_COLUMNS.len() {
            return Err(Error::validation(format!(
                "row {} has {} columns, expected at least {}",
                row,
                fields.len(),
                CANDIDATE_COLUMNS.len()
            )));
        }

        let index = |field: &str| {
            field.parse::<usize>().map_err(|_| {
                Error::validation(format!("row {}: `{}` is not a position", row, field))
            })
        };
        let left = index(fields[0])?;
        let right = index(fields[1])?;
        let length = index(fields[2])?;
        let avg_expected_error = fields[3].parse::<f64>().map_err(|_| {
            Error::validation(format!("row {}: `{}` is not a number", row, fields[3]))
        })?;

        candidates.push(TrimCandidate {
            left,
            right,
            length,
            avg_expected_error,
        });
    }
    Ok(candidates)
}
