use crate::error::Error;
use crate::{expected_error, Result, PHRED_OFFSET};
use std::fmt;
use std::ops::Range;

/// Character every FASTQ header starts with
pub const HEADER_SENTINEL: char = '@';
/// Character the separator line starts with
pub const SEPARATOR_SENTINEL: char = '+';

/// Mate direction of a read as encoded by the `<name>.<mate>` header convention
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Mate `1`
    Forward,
    /// Mate `2`
    Reverse,
    /// Header carries no mate suffix
    Unknown,
}

impl Direction {
    /// Parses the mate direction from the first whitespace delimited token of a header.
    ///
    /// A token without a numeric final dot separated component has no direction.
    /// Numeric suffixes other than `1` and `2` are rejected.
    pub fn from_header(header: &str) -> std::result::Result<Self, String> {
        let token = header.split_whitespace().next().unwrap_or("");
        let suffix = match token.rfind('.') {
            Some(idx) => &token[idx + 1..],
            None => return Ok(Direction::Unknown),
        };

        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Direction::Unknown);
        }

        match suffix {
            "1" => Ok(Direction::Forward),
            "2" => Ok(Direction::Reverse),
            other => Err(format!(
                "mate suffix `{}` in header `{}` is neither 1 (forward) nor 2 (reverse)",
                other, token
            )),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
            Direction::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A single validated sequencing read
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Record {
    header: String,
    sequence: String,
    quality: String,
    direction: Direction,
}

impl Record {
    /// Creates a record, uppercasing the sequence.
    ///
    /// Fails if the header does not start with `@`, if sequence or quality contain non-ASCII
    /// characters, if their lengths differ or, when `mate_suffix` is set, if the header carries
    /// an unknown mate suffix.
    pub fn new<H, S, Q>(header: H, sequence: S, quality: Q, mate_suffix: bool) -> Result<Self>
    where
        H: Into<String>,
        S: AsRef<str>,
        Q: Into<String>,
    {
        let header = header.into();
        let sequence = sequence.as_ref().to_ascii_uppercase();
        let quality = quality.into();

        if !header.starts_with(HEADER_SENTINEL) {
            return Err(Error::format(
                0,
                format!("header `{}` does not start with `{}`", header, HEADER_SENTINEL),
            ));
        }

        // lengths and truncation below are in bytes
        for (field, value) in [("sequence", &sequence), ("quality", &quality)].iter() {
            if !value.is_ascii() {
                return Err(Error::format(
                    0,
                    format!("{} `{}` contains non-ASCII characters", field, value),
                ));
            }
        }

        if sequence.len() != quality.len() {
            return Err(Error::format(
                0,
                format!(
                    "sequence length {} does not match quality length {}",
                    sequence.len(),
                    quality.len()
                ),
            ));
        }

        let direction = if mate_suffix {
            Direction::from_header(&header).map_err(|reason| Error::format(0, reason))?
        } else {
            Direction::Unknown
        };

        Ok(Self {
            header,
            sequence,
            quality,
            direction,
        })
    }

    /// Header line including the leading `@`
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Uppercased nucleotide sequence
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Raw quality string
    pub fn quality(&self) -> &str {
        &self.quality
    }

    /// Mate direction parsed from the header
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Read length
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the read has no bases
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Caps the read at `length` bases, keeping sequence and quality in step
    pub fn truncate(&mut self, length: usize) {
        if length < self.len() {
            self.sequence.truncate(length);
            self.quality.truncate(length);
        }
    }

    /// Phred scores, one per base
    pub fn phred_scores(&self) -> impl Iterator<Item = u8> + '_ {
        self.quality.bytes().map(|q| q.saturating_sub(PHRED_OFFSET))
    }

    /// Probability of error of every base call
    pub fn expected_errors(&self) -> impl Iterator<Item = f64> + '_ {
        self.phred_scores().map(|q| expected_error(f64::from(q)))
    }

    /// Summed expected error over `window`, clamped to the read length
    pub fn expected_error_sum(&self, window: Range<usize>) -> f64 {
        let end = window.end.min(self.len());
        let start = window.start.min(end);
        self.expected_errors()
            .skip(start)
            .take(end - start)
            .sum()
    }

    /// Running sums of the expected error where element `i` covers bases `[0, i)`
    pub fn expected_error_prefix_sums(&self) -> Vec<f64> {
        let mut sums = Vec::with_capacity(self.len() + 1);
        sums.push(0.0);
        let mut total = 0.0;
        for ee in self.expected_errors() {
            total += ee;
            sums.push(total);
        }
        sums
    }
}

/// Writes the record as a 4-line FASTQ entry without a trailing newline
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}\n{}",
            self.header, self.sequence, SEPARATOR_SENTINEL, self.quality
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercases_sequence() {
        let record = Record::new("@read.1 1 length=4", "acgt", "IIII", true).unwrap();
        assert_eq!(record.sequence(), "ACGT");
        assert_eq!(record.len(), 4);
        assert_eq!(record.direction(), Direction::Forward);
    }

    #[test]
    fn parses_mate_direction() {
        assert_eq!(
            Direction::from_header("@test_fastq.test.2 5 length=50"),
            Ok(Direction::Reverse)
        );
        assert_eq!(Direction::from_header("@M00123:1:000"), Ok(Direction::Unknown));
        assert_eq!(Direction::from_header("@sample.r1"), Ok(Direction::Unknown));
        assert!(Direction::from_header("@SRR1591840.7 7 length=250").is_err());
    }

    #[test]
    fn mate_suffix_can_be_ignored() {
        let record = Record::new("@SRR1591840.7", "A", "I", false).unwrap();
        assert_eq!(record.direction(), Direction::Unknown);
        assert!(Record::new("@SRR1591840.7", "A", "I", true).is_err());
    }

    #[test]
    fn rejects_missing_sentinel() {
        match Record::new("read.1", "ACGT", "IIII", true) {
            Err(Error::Format { reason, .. }) => assert!(reason.contains("does not start")),
            other => panic!("expected a format error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(Record::new("@read.1", "ACGT", "III", true).is_err());
    }

    #[test]
    fn rejects_non_ascii() {
        assert!(matches!(
            Record::new("@read.1", "AA", "\u{e9}", true),
            Err(Error::Format { .. })
        ));
        assert!(Record::new("@read.1", "\u{e9}", "II", true).is_err());
    }

    #[test]
    fn truncation_keeps_fields_in_step() {
        let mut record = Record::new("@read.1", "ACGTACGT", "IIII####", true).unwrap();
        record.truncate(5);
        assert_eq!(record.sequence(), "ACGTA");
        assert_eq!(record.quality(), "IIII#");
        assert_eq!(record.len(), record.quality().len());

        record.truncate(10);
        assert_eq!(record.len(), 5);
    }

    #[test]
    fn expected_error_of_bases() {
        // '+' is Q10, '5' is Q20
        let record = Record::new("@read.1", "AAA", "+5+", true).unwrap();
        let errors: Vec<f64> = record.expected_errors().collect();
        assert!((errors[0] - 0.1).abs() < 1e-12);
        assert!((errors[1] - 0.01).abs() < 1e-12);
        assert!((record.expected_error_sum(0..3) - 0.21).abs() < 1e-12);
        assert!((record.expected_error_sum(1..10) - 0.11).abs() < 1e-12);

        let prefix = record.expected_error_prefix_sums();
        assert_eq!(prefix.len(), 4);
        assert!((prefix[3] - prefix[1] - 0.11).abs() < 1e-12);
    }

    #[test]
    fn displays_as_fastq() {
        let record = Record::new("@read.2 x", "ACG", "III", true).unwrap();
        assert_eq!(record.to_string(), "@read.2 x\nACG\n+\nIII");
    }
}
