//! Lazy, validating FASTQ reader.
//!
//! Every traversal opens its own handle on the file and drops it when the
//! [`Records`] iterator is dropped, so derived queries always reflect the file
//! as it is on disk at the time they are called.
use crate::error::Error;
use crate::record::{Direction, Record, SEPARATOR_SENTINEL};
use crate::{expected_error, Result, AMBIGUOUS_NUCLEOTIDES, MAX_PHRED, NUCLEOTIDES, PHRED_OFFSET};
use bio::alphabets::Alphabet;
use log::{debug, info};
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Extension every input must carry, optionally followed by `.gz`
pub const FASTQ_EXTENSION: &str = ".fastq";

/// Reader over a FASTQ file on disk
#[derive(Debug)]
pub struct FastqReader {
    path: PathBuf,
    scale: Option<usize>,
    check_quality: bool,
    mate_suffix: bool,
    count: OnceLock<usize>,
}

impl FastqReader {
    /// Creates a reader for `path`, which must be an existing regular file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::FileNotFound(path));
        }

        Ok(Self {
            path,
            scale: None,
            check_quality: true,
            mate_suffix: true,
            count: OnceLock::new(),
        })
    }

    /// Caps every record at `scale` bases before anything downstream sees it
    pub fn with_scale(mut self, scale: Option<usize>) -> Self {
        self.scale = scale;
        self
    }

    /// Toggles validation of quality characters against the accepted phred range
    pub fn with_quality_check(mut self, check_quality: bool) -> Self {
        self.check_quality = check_quality;
        self
    }

    /// Toggles parsing of the `<name>.<mate>` header suffix into a [`Direction`]
    pub fn with_mate_suffix(mut self, mate_suffix: bool) -> Self {
        self.mate_suffix = mate_suffix;
        self
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a full traversal has already cached the number of records
    pub fn is_counted(&self) -> bool {
        self.count.get().is_some()
    }

    /// Starts a fresh traversal of the file.
    ///
    /// The extension and emptiness checks happen here rather than in [`FastqReader::new`]
    /// as the format cannot be confirmed without opening the file.
    pub fn records(&self) -> Result<Records<'_>> {
        self.check_extension()?;
        if std::fs::metadata(&self.path)?.len() == 0 {
            return Err(Error::EmptyFile(self.path.clone()));
        }

        let (rdr, format) = niffler::from_path(&self.path)?;
        debug!("Opened {} with compression {:?}", self.path.display(), format);
        let rdr: Box<dyn Read> = rdr;
        let mut rdr = BufReader::new(rdr);
        if rdr.fill_buf()?.is_empty() {
            return Err(Error::EmptyFile(self.path.clone()));
        }

        Ok(Records {
            reader: self,
            rdr,
            buf: Vec::new(),
            alphabet: Alphabet::new(NUCLEOTIDES.iter().chain(AMBIGUOUS_NUCLEOTIDES.iter())),
            parsed: 0,
            finished: false,
        })
    }

    /// Total number of records, traversing the file only if no traversal has completed yet
    pub fn total_reads(&self) -> Result<usize> {
        if let Some(count) = self.count.get() {
            return Ok(*count);
        }

        info!("Counting reads in {}...", self.path.display());
        let mut count = 0;
        for record in self.records()? {
            record?;
            count += 1;
        }
        Ok(*self.count.get_or_init(|| count))
    }

    /// Loads every record into memory
    pub fn to_vec(&self) -> Result<Vec<Record>> {
        self.records()?.collect()
    }

    /// Lazily yields records whose header marks them as forward mates
    pub fn forward_reads(&self) -> Result<impl Iterator<Item = Result<Record>> + '_> {
        self.reads_in_direction(Direction::Forward)
    }

    /// Lazily yields records whose header marks them as reverse mates
    pub fn reverse_reads(&self) -> Result<impl Iterator<Item = Result<Record>> + '_> {
        self.reads_in_direction(Direction::Reverse)
    }

    fn reads_in_direction(
        &self,
        direction: Direction,
    ) -> Result<impl Iterator<Item = Result<Record>> + '_> {
        Ok(self.records()?.filter(move |record| match record {
            Ok(record) => record.direction() == direction,
            Err(_) => true,
        }))
    }

    /// Phred scores with one row per record and one column per position
    pub fn quality_matrix(&self) -> Result<Vec<Vec<u8>>> {
        let mut width = None;
        self.records()?
            .enumerate()
            .map(|(i, record)| {
                let record = record?;
                check_width(&mut width, &record, i + 1)?;
                Ok(record.phred_scores().collect())
            })
            .collect()
    }

    /// Average phred score of every position across all records
    pub fn average_score_per_position(&self) -> Result<Vec<f64>> {
        let mut width = None;
        let mut sums: Vec<u64> = Vec::new();
        let mut n = 0usize;

        for (i, record) in self.records()?.enumerate() {
            let record = record?;
            check_width(&mut width, &record, i + 1)?;
            if sums.is_empty() {
                sums = vec![0; record.len()];
            }
            for (sum, q) in sums.iter_mut().zip(record.phred_scores()) {
                *sum += u64::from(q);
            }
            n += 1;
        }

        debug!("Averaged {} positions over {} records", sums.len(), n);
        Ok(sums
            .into_iter()
            .map(|sum| sum as f64 / n as f64)
            .collect())
    }

    /// Expected error of the average phred score of every position
    pub fn average_expected_error_per_position(&self) -> Result<Vec<f64>> {
        Ok(self
            .average_score_per_position()?
            .into_iter()
            .map(expected_error)
            .collect())
    }

    /// Summed expected error of every record over its whole length
    pub fn expected_error_per_sequence(&self) -> Result<Vec<f64>> {
        self.records()?
            .map(|record| record.map(|r| r.expected_error_sum(0..r.len())))
            .collect()
    }

    /// Number of records carrying an IUPAC ambiguity code at every position
    pub fn ambiguous_bases_per_position(&self) -> Result<Vec<usize>> {
        let mut counts: Vec<usize> = Vec::new();
        for record in self.records()? {
            let record = record?;
            if counts.len() < record.len() {
                counts.resize(record.len(), 0);
            }
            for (count, base) in counts.iter_mut().zip(record.sequence().bytes()) {
                if AMBIGUOUS_NUCLEOTIDES.contains(&base) {
                    *count += 1;
                }
            }
        }
        Ok(counts)
    }

    /// Per position summary used for reporting and plotting
    pub fn position_stats(&self) -> Result<Vec<PositionStats>> {
        let averages = self.average_score_per_position()?;
        let ambiguous = self.ambiguous_bases_per_position()?;

        Ok(averages
            .into_iter()
            .enumerate()
            .map(|(position, average_quality)| PositionStats {
                position,
                average_quality,
                average_expected_error: expected_error(average_quality),
                ambiguous_bases: ambiguous.get(position).copied().unwrap_or(0),
            })
            .collect())
    }

    fn check_extension(&self) -> Result<()> {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let name = name.strip_suffix(".gz").unwrap_or(&name);

        if name.ends_with(FASTQ_EXTENSION) {
            Ok(())
        } else {
            Err(Error::NotFastq(self.path.clone()))
        }
    }

    fn cache_count(&self, count: usize) {
        if self.count.set(count).is_ok() {
            debug!("Cached {} records for {}", count, self.path.display());
        }
    }
}

/// Summary of a single position across all records
#[derive(Debug, Clone, PartialEq)]
pub struct PositionStats {
    /// 0-based position in the read
    pub position: usize,
    /// Mean phred score
    pub average_quality: f64,
    /// Expected error of the mean phred score
    pub average_expected_error: f64,
    /// Records with an ambiguity code at this position
    pub ambiguous_bases: usize,
}

fn check_width(width: &mut Option<usize>, record: &Record, index: usize) -> Result<()> {
    match *width {
        None => {
            *width = Some(record.len());
            Ok(())
        }
        Some(expected) if expected == record.len() => Ok(()),
        Some(expected) => Err(Error::format(
            index,
            format!(
                "length {} differs from the {} of the first record, set a scale to truncate reads",
                record.len(),
                expected
            ),
        )),
    }
}

/// A single traversal over the records of a [`FastqReader`].
///
/// Stops after the first error. Running to the end caches the record count on the reader.
pub struct Records<'a> {
    reader: &'a FastqReader,
    rdr: BufReader<Box<dyn Read>>,
    buf: Vec<u8>,
    alphabet: Alphabet,
    parsed: usize,
    finished: bool,
}

impl fmt::Debug for Records<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Records")
            .field("path", &self.reader.path)
            .field("parsed", &self.parsed)
            .field("finished", &self.finished)
            .finish()
    }
}

impl Records<'_> {
    /// Next line without its line terminator, `None` at the end of the file
    fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        if self.rdr.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        if self.buf.ends_with(b"\n") {
            self.buf.pop();
            if self.buf.ends_with(b"\r") {
                self.buf.pop();
            }
        }

        String::from_utf8(self.buf.clone()).map(Some).map_err(|e| {
            Error::format(self.parsed + 1, format!("line is not valid UTF-8: {}", e))
        })
    }

    fn next_block(&mut self) -> Result<Option<Vec<String>>> {
        let mut block = Vec::with_capacity(4);
        while block.len() < 4 {
            match self.next_line()? {
                Some(line) => {
                    // blank lines are only tolerated between records
                    if block.is_empty() && line.trim().is_empty() {
                        continue;
                    }
                    block.push(line);
                }
                None if block.is_empty() => return Ok(None),
                None => {
                    return Err(Error::format(
                        self.parsed + 1,
                        format!("truncated record with {} of 4 lines", block.len()),
                    ))
                }
            }
        }
        Ok(Some(block))
    }

    fn parse_block(&self, mut block: Vec<String>) -> Result<Record> {
        let quality = block.pop().unwrap_or_default();
        let separator = block.pop().unwrap_or_default();
        let sequence = block.pop().unwrap_or_default();
        let header = block.pop().unwrap_or_default();

        if !separator.starts_with(SEPARATOR_SENTINEL) {
            return Err(Error::format(
                0,
                format!("separator line `{}` does not start with `+`", separator),
            ));
        }

        let mut record = Record::new(header, sequence, quality, self.reader.mate_suffix)?;

        if let Some(base) = record
            .sequence()
            .bytes()
            .find(|base| !self.alphabet.is_word(&[*base]))
        {
            return Err(Error::format(
                0,
                format!("sequence contains invalid nucleotide `{}`", base as char),
            ));
        }

        if self.reader.check_quality {
            let max = PHRED_OFFSET + MAX_PHRED;
            if let Some(q) = record
                .quality()
                .bytes()
                .find(|q| *q < PHRED_OFFSET || *q > max)
            {
                return Err(Error::format(
                    0,
                    format!(
                        "quality character `{}` outside of the accepted range `{}`..=`{}`",
                        q as char, PHRED_OFFSET as char, max as char
                    ),
                ));
            }
        }

        if let Some(scale) = self.reader.scale {
            record.truncate(scale);
        }

        Ok(record)
    }
}

impl Iterator for Records<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let parsed = self
            .next_block()
            .and_then(|block| block.map(|block| self.parse_block(block)).transpose());

        match parsed {
            Ok(Some(record)) => {
                self.parsed += 1;
                Some(Ok(record))
            }
            Ok(None) => {
                self.finished = true;
                self.reader.cache_count(self.parsed);
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e.at_record(self.parsed + 1)))
            }
        }
    }
}
