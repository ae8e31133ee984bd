//! Subsetting of large read sets without loading them into memory.
use crate::error::Error;
use crate::reader::{FastqReader, Records};
use crate::record::Record;
use crate::search::{binary_search, DEFAULT_MAX_ROUNDS};
use crate::Result;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Draws exactly `n` records uniformly without replacement using reservoir sampling.
///
/// Every record ends up in the sample with probability `n / N`, `N` being the stream length.
/// Fails if the stream yields fewer than `n` records.
pub fn reservoir_sample<I>(records: I, n: usize, seed: Option<u64>) -> Result<Vec<Record>>
where
    I: IntoIterator<Item = Result<Record>>,
{
    let mut rng = rng_from(seed);
    let mut reservoir = Vec::with_capacity(n);
    let mut seen = 0usize;

    for (i, record) in records.into_iter().enumerate() {
        let record = record?;
        seen += 1;
        if i < n {
            reservoir.push(record);
        } else {
            let j = rng.gen_range(0..=i);
            if j < n {
                reservoir[j] = record;
            }
        }
    }

    if seen < n {
        return Err(Error::validation(format!(
            "requested {} records but the stream ended after {}",
            n, seen
        )));
    }

    debug!("Kept {} of {} records in the reservoir", n, seen);
    Ok(reservoir)
}

/// Lazily yields roughly `fraction` of the records of `reader`.
///
/// The total is counted first (reusing a cached count), `round(N * fraction)` distinct indices
/// are drawn and sorted, and a fresh traversal keeps the records at those indices.
pub fn fraction_sample(
    reader: &FastqReader,
    fraction: f64,
    seed: Option<u64>,
) -> Result<FractionSample<'_>> {
    if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
        return Err(Error::validation(format!(
            "fraction must be within (0, 1], got {}",
            fraction
        )));
    }

    let total = reader.total_reads()?;
    let amount = (total as f64 * fraction).round() as usize;
    let mut rng = rng_from(seed);
    let mut indices = rand::seq::index::sample(&mut rng, total, amount.min(total)).into_vec();
    indices.sort_unstable();
    info!("Sampling {} of {} records", indices.len(), total);

    let records = if indices.is_empty() {
        None
    } else {
        Some(reader.records()?)
    };

    Ok(FractionSample {
        records,
        last: indices.last().copied().unwrap_or(0),
        indices,
        position: 0,
    })
}

/// Iterator returned by [`fraction_sample`]
#[derive(Debug)]
pub struct FractionSample<'a> {
    records: Option<Records<'a>>,
    indices: Vec<usize>,
    last: usize,
    position: usize,
}

impl FractionSample<'_> {
    /// Sorted positions of the records that will be yielded
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl Iterator for FractionSample<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.position > self.last {
                // past the last drawn index, release the file handle
                self.records = None;
            }
            let record = self.records.as_mut()?.next()?;
            let position = self.position;
            self.position += 1;

            let record = match record {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };

            match binary_search(position, &self.indices, true, DEFAULT_MAX_ROUNDS) {
                Ok(_) => return Some(Ok(record)),
                Err(Error::TargetNotFound(_)) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
