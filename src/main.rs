use clap::Parser;
use log::info;
use rayon::ThreadPoolBuilder;
use seedlap::batch::{load_batch, OverlapBatch};
use seedlap::edit_distance::{AlignMode, BioAligner};
use seedlap::params::OverlapParams;
use seedlap::pipeline::{evaluate_candidates, EvaluatedOverlap, Refinement};
use seedlap::sequence::IndexMetadata;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::Path;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Path to the candidate batch file.
    #[clap(short = 'b', long, value_parser)]
    batch_file: String,

    /// Number of threads for parallel processing (defaults to all available cores).
    #[clap(short = 't', long, value_parser)]
    num_threads: Option<NonZeroUsize>,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Overlap acceptance thresholds
#[derive(Parser, Debug)]
struct ThresholdOpts {
    /// Minimum number of anchors surviving the colinearity filter
    #[clap(long, value_parser, default_value_t = 4)]
    min_num_seeds: i64,

    /// Minimum fraction of the better-covered span covered by seeds
    #[clap(long, value_parser, default_value_t = 0.1)]
    min_percent_cov_bases: f64,

    /// Tolerated error rate for span length ratios and anchor distances
    #[clap(short = 'e', long, value_parser, default_value_t = 0.45)]
    error_rate: f64,

    /// Maximum overhang in bases; negative means unconstrained
    #[clap(long, value_parser, default_value_t = -1, allow_hyphen_values = true)]
    max_allowed_overhang: i64,

    /// Maximum overhang as a fraction of the sequence length
    #[clap(long, value_parser, default_value_t = 0.1)]
    overhang_percent: f64,

    /// Minimum span of the overlap on both sequences
    #[clap(short = 'l', long, value_parser, default_value_t = 100)]
    min_overlap_len: i64,

    /// Minimum length of both the read and the target
    #[clap(long, value_parser, default_value_t = 0)]
    min_read_len: i64,

    /// Minimum covered bases on both sequences
    #[clap(long, value_parser, default_value_t = 0)]
    min_num_anchor_bases: i64,
}

impl From<&ThresholdOpts> for OverlapParams {
    fn from(opts: &ThresholdOpts) -> Self {
        OverlapParams {
            min_num_seeds: opts.min_num_seeds,
            min_percent_cov_bases: opts.min_percent_cov_bases,
            error_rate: opts.error_rate,
            max_allowed_overhang: opts.max_allowed_overhang,
            overhang_percent: opts.overhang_percent,
            min_overlap_len: opts.min_overlap_len,
            min_read_len: opts.min_read_len,
            min_num_anchor_bases: opts.min_num_anchor_bases,
        }
    }
}

/// Command-line tool for validating seed-chain overlaps between long reads.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Filter, validate and optionally refine every candidate in a batch
    Evaluate {
        #[clap(flatten)]
        common: CommonOpts,

        #[clap(flatten)]
        thresholds: ThresholdOpts,

        /// Compute the edit distance of accepted overlaps (global or infix)
        #[clap(long, value_parser)]
        edit_distance: Option<AlignMode>,

        /// Output file for accepted overlaps (TSV); stdout if not given
        #[clap(short = 'o', long, value_parser)]
        output_file: Option<String>,

        /// Output file for the reasons of rejected candidates
        #[clap(long, value_parser)]
        rejected: Option<String>,
    },
    /// Print batch statistics
    Summary {
        #[clap(flatten)]
        common: CommonOpts,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Evaluate {
            common,
            thresholds,
            edit_distance,
            output_file,
            rejected,
        } => {
            let batch = initialize(&common)?;
            let params = OverlapParams::from(&thresholds);
            let refinement = edit_distance.map(|mode| Refinement {
                aligner: &BioAligner,
                mode,
            });

            let hits = batch.seed_hits();
            let results = evaluate_candidates(
                &batch.reference,
                &batch.reads,
                &hits,
                &batch.candidates,
                &params,
                refinement.as_ref(),
            )
            .map_err(|e| io::Error::other(format!("Edit distance refinement failed: {e}")))?;

            write_accepted(&batch, &results, output_file.as_deref())?;
            if let Some(path) = rejected {
                write_rejected(&results, &path)?;
            }
        }
        Args::Summary { common } => {
            let batch = initialize(&common)?;
            print_summary(&batch);
        }
    }

    Ok(())
}

/// Initialize logging and the thread pool, then load the batch
fn initialize(common: &CommonOpts) -> io::Result<OverlapBatch> {
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let num_threads = common
        .num_threads
        .map(NonZeroUsize::get)
        .unwrap_or_else(num_cpus::get);
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .map_err(|e| io::Error::other(format!("Failed to build thread pool: {e}")))?;
    info!("Using {} threads", num_threads);

    load_batch(Path::new(&common.batch_file))
}

fn open_output(path: Option<&str>) -> io::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn write_accepted(batch: &OverlapBatch, results: &[EvaluatedOverlap], path: Option<&str>) -> io::Result<()> {
    let mut writer = open_output(path)?;
    for result in results.iter().filter(|r| r.is_accepted()) {
        writeln!(
            writer,
            "{}",
            result
                .overlap
                .to_tsv_line(&batch.reference, result.read_len, result.edit_distance)
        )?;
    }
    writer.flush()
}

fn write_rejected(results: &[EvaluatedOverlap], path: &str) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for result in results.iter().filter(|r| !r.is_accepted()) {
        writeln!(writer, "{}", result.overlap.reject_reason)?;
    }
    writer.flush()
}

fn print_summary(batch: &OverlapBatch) {
    let reference = &batch.reference;
    let num_forward = reference.num_forward_sequences();
    let total_reference_length: i64 = reference.reference_lengths().iter().take(num_forward).sum();
    let total_read_length: i64 = batch.reads.iter().map(|read| read.len()).sum();

    println!("Number of reference sequences: {}", num_forward);
    println!("Strand-doubled: {}", reference.len() > num_forward);
    println!("Total reference length: {} bp", total_reference_length);
    println!("Number of reads: {}", batch.reads.len());
    println!("Total read length: {} bp", total_read_length);
    println!("Number of seed hits: {}", batch.hits.len());
    println!("Number of candidates: {}", batch.candidates.len());

    if !batch.candidates.is_empty() {
        let total_chain: usize = batch.candidates.iter().map(|c| c.chain.len()).sum();
        let max_chain = batch.candidates.iter().map(|c| c.chain.len()).max().unwrap_or(0);
        println!(
            "Mean chain length: {:.2}",
            total_chain as f64 / batch.candidates.len() as f64
        );
        println!("Max chain length: {}", max_chain);
    }
}
