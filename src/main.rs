#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]

//! Estimates quality trimming parameters of amplicon reads prior to denoising.
mod cli;

use crate::cli::Command;
use log::{info, warn};
use smartdada::error::Error;
use smartdada::maxee::{self, expected_error_sums};
use smartdada::report::{self, write_tsv, TsvRow};
use smartdada::{sampling, Record, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use structopt::StructOpt;

fn main() -> Result<()> {
    let opt = cli::SmartDada::from_args();
    opt.set_logging();

    rayon::ThreadPoolBuilder::new()
        .num_threads(opt.threads)
        .build_global()
        .map_err(|_| Error::ThreadError)?;

    let config = opt.cmd.trim_config();
    match opt.cmd {
        Command::Trim {
            input,
            output,
            ee_output,
            positions_output,
            ..
        } => {
            let reader = input.reader()?;
            let config = config.unwrap_or_default();
            let trim = report::estimate(&reader, &config)?;

            for warning in &trim.obvious.warnings {
                eprintln!("Warning: {}", warning);
            }
            println!("{}\t{}", trim.obvious.left, trim.obvious.right);

            write_table(&output, trim.candidates.into_iter().map(Ok))?;
            if let Some(path) = positions_output {
                write_table(&path, trim.positions.into_iter().map(Ok))?;
            }
            if let Some(path) = ee_output {
                let (left, right) = (trim.obvious.left, trim.obvious.right);
                let sums = expected_error_sums(reader.records()?, left, right);
                write_table(&path, sums)?;
            }
        }
        Command::Classify {
            input,
            windows,
            max_ee,
            output,
        } => {
            let reader = input.reader()?;
            let candidates = maxee::read_candidates(BufReader::new(File::open(&windows)?))?;
            info!("Loaded {} candidate windows", candidates.len());
            let classified = maxee::classify(reader.records()?, &candidates, max_ee)?;
            write_table(&output, classified.into_iter().map(Ok))?;
        }
        Command::Subsample {
            input,
            n,
            fraction,
            seed,
            output,
        } => {
            let reader = input.reader()?;
            match (n, fraction) {
                (Some(n), _) => {
                    let sample = sampling::reservoir_sample(reader.records()?, n, seed)?;
                    write_fastq(&output, sample.into_iter().map(Ok))?;
                }
                (None, Some(fraction)) => {
                    write_fastq(&output, sampling::fraction_sample(&reader, fraction, seed)?)?;
                }
                (None, None) => {
                    return Err(Error::Validation(
                        "either a number or a fraction of reads is required".to_string(),
                    ))
                }
            }
        }
        Command::Split {
            input,
            forward,
            reverse,
        } => {
            let reader = input.reader()?;
            let n_forward = write_fastq(&forward, reader.forward_reads()?)?;
            let n_reverse = write_fastq(&reverse, reader.reverse_reads()?)?;
            if n_forward + n_reverse == 0 {
                warn!("No read carried a mate suffix, both outputs are empty");
            }
        }
    }

    Ok(())
}

fn write_table<T, I>(path: &Path, rows: I) -> Result<()>
where
    T: TsvRow,
    I: IntoIterator<Item = Result<T>>,
{
    info!("Writing {}...", path.display());
    write_tsv(BufWriter::new(File::create(path)?), rows)
}

fn write_fastq<I>(path: &Path, records: I) -> Result<usize>
where
    I: IntoIterator<Item = Result<Record>>,
{
    info!("Writing {}...", path.display());
    let mut wtr = BufWriter::new(File::create(path)?);
    let mut written = 0;
    for record in records {
        writeln!(wtr, "{}", record?)?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}
