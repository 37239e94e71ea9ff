use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use readsieve::filter::{FilterConfig, DEFAULT_KMER_LENGTH};
use readsieve::pipeline::DEFAULT_CHUNK_SIZE;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Filter paired-end reads by exact k-mer matches against a query sequence",
    long_about = None
)]
struct Cli {
    /// Path to fasta file containing query sequence record(s)
    #[arg(short = 'q', long = "query")]
    query: String,

    /// Path to mate 1 reads (fasta/fastq, optionally compressed)
    #[arg(short = '1', long = "in1")]
    in1: String,

    /// Path to mate 2 reads
    #[arg(short = '2', long = "in2")]
    in2: String,

    /// Path to filtered mate 1 output (- for stdout; detects .gz and .zst)
    #[arg(short = 'o', long = "out1")]
    out1: String,

    /// Path to filtered mate 2 output
    #[arg(short = 'O', long = "out2")]
    out2: String,

    /// K-mer length (1-64)
    #[arg(short = 'k', long = "kmer-length", default_value_t = DEFAULT_KMER_LENGTH)]
    kmer_length: usize,

    /// Also match reverse complements of query k-mers in both mates
    #[arg(short = 'r', long = "rc", default_value_t = false)]
    rc: bool,

    /// Force single-threaded filtering
    #[arg(short = 's', long = "single-threaded", default_value_t = false)]
    single_threaded: bool,

    /// Number of worker threads (0 = auto)
    #[arg(short = 't', long = "threads", default_value_t = 0)]
    threads: usize,

    /// Read pairs per work chunk
    #[arg(short = 'c', long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Overwrite existing output files
    #[arg(short = 'f', long = "force", default_value_t = false)]
    force: bool,

    /// Path to JSON summary file
    #[arg(long = "summary")]
    summary: Option<PathBuf>,

    /// Suppress progress reporting
    #[arg(long = "quiet", default_value_t = false)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = FilterConfig::new(cli.query, cli.in1, cli.in2, cli.out1, cli.out2)
        .with_kmer_length(cli.kmer_length)
        .with_reverse_complement(cli.rc)
        .with_single_threaded(cli.single_threaded)
        .with_threads(cli.threads)
        .with_chunk_size(cli.chunk_size)
        .with_force(cli.force)
        .with_quiet(cli.quiet);
    if let Some(summary) = cli.summary {
        config = config.with_summary(summary);
    }

    match config.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
