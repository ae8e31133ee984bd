#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]

//! Estimation of quality trimming parameters for amplicon reads.
//!
//! Reads are streamed from a FASTQ file, averaged per position and scanned from
//! the middle outwards for an obvious low quality region. Windows around that
//! region are then swept and every candidate is scored by the average expected
//! error per position and by how many reads stay within a maximum expected
//! error budget, which is what the downstream denoiser filters on.
//!

pub mod error;
pub mod maxee;
pub mod reader;
pub mod record;
pub mod report;
pub mod sampling;
pub mod search;
pub mod trim;

pub use crate::error::Error;
pub use crate::reader::FastqReader;
pub use crate::record::{Direction, Record};

/// Offset of the Sanger/Illumina 1.8+ quality encoding
pub const PHRED_OFFSET: u8 = 33;
/// Highest quality score accepted anywhere in the crate
pub const MAX_PHRED: u8 = 42;
/// Unambiguous nucleotides, `U` included for RNA amplicons
pub const NUCLEOTIDES: &[u8] = b"ACGTU";
/// IUPAC ambiguity codes accepted in sequences
pub const AMBIGUOUS_NUCLEOTIDES: &[u8] = b"NRYKMSWBDHV";

/// Crate wide result type
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Converts a phred score into the probability of the base call being wrong
pub fn expected_error(phred: f64) -> f64 {
    10f64.powf(-phred / 10.0)
}
