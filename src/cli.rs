use log::LevelFilter;
use smartdada::report::TrimConfig;
use smartdada::FastqReader;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "smartdada",
    about = "Estimates where amplicon reads should be truncated before denoising"
)]
pub(crate) struct SmartDada {
    #[structopt(
        short,
        long,
        help = "Increase logging verbosity, repeat for more detail",
        parse(from_occurrences),
        global = true
    )]
    pub verbose: u8,
    #[structopt(
        short,
        long,
        help = "Number of threads used to classify reads",
        default_value = "1",
        global = true
    )]
    pub threads: usize,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, StructOpt)]
pub(crate) struct Input {
    #[structopt(help = "FASTQ file, optionally gzipped", parse(from_os_str))]
    pub fastq: PathBuf,
    #[structopt(long, help = "Truncate every read to this many bases before any calculation")]
    pub scale: Option<usize>,
    #[structopt(long, help = "Skip validation of quality characters")]
    pub no_quality_check: bool,
    #[structopt(
        long,
        help = "Do not read the mate direction from the final `.1`/`.2` of read names"
    )]
    pub no_mate_suffix: bool,
}

impl Input {
    pub fn reader(&self) -> smartdada::Result<FastqReader> {
        Ok(FastqReader::new(&self.fastq)?
            .with_scale(self.scale)
            .with_quality_check(!self.no_quality_check)
            .with_mate_suffix(!self.no_mate_suffix))
    }
}

#[derive(Debug, StructOpt)]
pub(crate) enum Command {
    /// Estimate trim parameters and write the candidate windows
    Trim {
        #[structopt(flatten)]
        input: Input,
        #[structopt(
            long,
            help = "Phred score threshold for obvious trimming",
            default_value = "30"
        )]
        threshold: u8,
        #[structopt(
            long,
            help = "Max share of the read removed at either end by obvious trimming",
            default_value = "0.1"
        )]
        obvious_max_trim: f64,
        #[structopt(
            long,
            help = "Max share of the read removed at either end by the fine sweep",
            default_value = "0.2"
        )]
        fine_max_trim: f64,
        #[structopt(
            long,
            help = "Maximum summed expected error of a read",
            default_value = "2.0"
        )]
        max_ee: f64,
        #[structopt(
            short,
            long,
            help = "Output file of the candidate windows",
            default_value = "parameter_info.tsv",
            parse(from_os_str)
        )]
        output: PathBuf,
        #[structopt(
            long,
            help = "Output file of per read expected error sums",
            parse(from_os_str)
        )]
        ee_output: Option<PathBuf>,
        #[structopt(
            long,
            help = "Output file of per position quality statistics",
            parse(from_os_str)
        )]
        positions_output: Option<PathBuf>,
    },
    /// Re-classify an existing candidate table against another error budget
    Classify {
        #[structopt(flatten)]
        input: Input,
        #[structopt(short, long, help = "Candidate table", parse(from_os_str))]
        windows: PathBuf,
        #[structopt(
            long,
            help = "Maximum summed expected error of a read",
            default_value = "2.0"
        )]
        max_ee: f64,
        #[structopt(short, long, help = "Output file", parse(from_os_str))]
        output: PathBuf,
    },
    /// Write a random subset of the reads
    Subsample {
        #[structopt(flatten)]
        input: Input,
        #[structopt(
            short,
            long,
            help = "Exact number of reads to keep",
            required_unless = "fraction",
            conflicts_with = "fraction"
        )]
        n: Option<usize>,
        #[structopt(short, long, help = "Share of reads to keep, within (0, 1]")]
        fraction: Option<f64>,
        #[structopt(short, long, help = "Seed of the random number generator")]
        seed: Option<u64>,
        #[structopt(short, long, help = "Output FASTQ", parse(from_os_str))]
        output: PathBuf,
    },
    /// Split reads into forward and reverse files by their mate suffix
    Split {
        #[structopt(flatten)]
        input: Input,
        #[structopt(long, help = "Output FASTQ of forward reads", parse(from_os_str))]
        forward: PathBuf,
        #[structopt(long, help = "Output FASTQ of reverse reads", parse(from_os_str))]
        reverse: PathBuf,
    },
}

impl Command {
    pub fn trim_config(&self) -> Option<TrimConfig> {
        match self {
            Command::Trim {
                threshold,
                obvious_max_trim,
                fine_max_trim,
                max_ee,
                ..
            } => Some(TrimConfig {
                threshold: *threshold,
                obvious_max_trim: *obvious_max_trim,
                fine_max_trim: *fine_max_trim,
                max_expected_error: *max_ee,
            }),
            _ => None,
        }
    }
}

impl SmartDada {
    pub fn set_logging(&self) {
        let level = match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        env_logger::Builder::new().filter_level(level).init();
    }
}
