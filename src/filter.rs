//! Run driver: wires query loading, paired readers, the filtering
//! pipelines and output writers together for one filtering run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::io::{create_writer, read_query_records, write_record, BoxedWriter, PairedReader};
use crate::pipeline::{filter_concurrent, filter_sequential, PipelineConfig, DEFAULT_CHUNK_SIZE};
use crate::query::build_query_sets;
use crate::{FilterError, Result};

/// Default k-mer length.
pub const DEFAULT_KMER_LENGTH: usize = 40;

/// Configuration for one filtering run.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Path to the query fasta file
    pub query_path: String,

    /// Path to mate 1 input reads
    pub in1_path: String,

    /// Path to mate 2 input reads
    pub in2_path: String,

    /// Path to filtered mate 1 output (or - for stdout; detects .gz and .zst)
    pub out1_path: String,

    /// Path to filtered mate 2 output
    pub out2_path: String,

    /// K-mer length (1-64)
    pub k: usize,

    /// Also match reverse complements of query k-mers in both mates
    pub check_reverse_complement: bool,

    /// Force single-threaded filtering
    pub single_threaded: bool,

    /// Number of worker threads (0 = auto)
    pub threads: usize,

    /// Read pairs per work chunk for the concurrent pipeline
    pub chunk_size: usize,

    /// Overwrite existing output files
    pub force: bool,

    /// Path to JSON summary file
    pub summary_path: Option<PathBuf>,

    /// Suppress progress reporting
    pub quiet: bool,
}

impl FilterConfig {
    /// Create a configuration with default filtering parameters.
    pub fn new<S: Into<String>>(query: S, in1: S, in2: S, out1: S, out2: S) -> Self {
        Self {
            query_path: query.into(),
            in1_path: in1.into(),
            in2_path: in2.into(),
            out1_path: out1.into(),
            out2_path: out2.into(),
            k: DEFAULT_KMER_LENGTH,
            check_reverse_complement: false,
            single_threaded: false,
            threads: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            force: false,
            summary_path: None,
            quiet: false,
        }
    }

    /// Set the k-mer length
    pub fn with_kmer_length(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set reverse complement checking
    pub fn with_reverse_complement(mut self, check: bool) -> Self {
        self.check_reverse_complement = check;
        self
    }

    /// Force single-threaded execution
    pub fn with_single_threaded(mut self, single: bool) -> Self {
        self.single_threaded = single;
        self
    }

    /// Set the worker thread count
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Allow overwriting existing outputs
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the summary path
    pub fn with_summary<P: AsRef<Path>>(mut self, summary_path: P) -> Self {
        self.summary_path = Some(summary_path.as_ref().to_path_buf());
        self
    }

    /// Set quiet mode
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Execute the filtering operation with this configuration
    pub fn execute(&self) -> Result<()> {
        run(self)
    }
}

// JSON summary structure
#[derive(Serialize, Deserialize)]
pub struct FilterSummary {
    pub version: String,
    pub query: String,
    pub in1: String,
    pub in2: String,
    pub out1: String,
    pub out2: String,
    pub k: usize,
    pub check_reverse_complement: bool,
    pub single_threaded: bool,
    pub threads: usize,
    pub chunk_size: usize,
    pub pairs_in: u64,
    pub pairs_out: u64,
    pub pairs_out_proportion: f64,
    pub bp_in: u64,
    pub time: f64,
    pub pairs_per_second: u64,
}

#[derive(Default)]
struct RunStats {
    pairs_in: u64,
    pairs_out: u64,
    bp_in: u64,
}

/// Check input paths exist and outputs are safe to write.
fn check_paths(config: &FilterConfig) -> Result<()> {
    for path in [&config.query_path, &config.in1_path, &config.in2_path] {
        if !Path::new(path).exists() {
            return Err(FilterError::InvalidInput(format!(
                "input file does not exist: {path}"
            )));
        }
    }
    for path in [&config.out1_path, &config.out2_path] {
        if path != "-" && Path::new(path).exists() && !config.force {
            return Err(FilterError::InvalidInput(format!(
                "output file exists: {path} (use --force to overwrite)"
            )));
        }
    }
    Ok(())
}

fn update_spinner(spinner: &Option<ProgressBar>, stats: &RunStats, start: Instant) {
    if let Some(spinner) = spinner {
        let elapsed = start.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            stats.pairs_in as f64 / elapsed
        } else {
            0.0
        };
        spinner.set_message(format!(
            "Retained {}/{} pairs. {:.0} pairs/s",
            stats.pairs_out, stats.pairs_in, rate
        ));
    }
}

/// Run one filtering pass over the paired inputs.
pub fn run(config: &FilterConfig) -> Result<()> {
    let start_time = Instant::now();
    let version = env!("CARGO_PKG_VERSION").to_string();

    check_paths(config)?;

    let mode = if config.single_threaded {
        "single-threaded"
    } else {
        "concurrent"
    };
    if !config.quiet {
        eprintln!(
            "Readsieve v{}; k={}; rc={}; mode: {}",
            version, config.k, config.check_reverse_complement, mode
        );
    }

    // Build the query k-mer sets before opening any output.
    let queries = read_query_records(&config.query_path)?;
    let query_sets = build_query_sets(&queries, config.k, config.check_reverse_complement)?;
    if !config.quiet {
        eprintln!(
            "Indexed {} query k-mers in {:.2?}",
            query_sets.forward.len(),
            start_time.elapsed()
        );
    }

    let reader = PairedReader::open(&config.in1_path, &config.in2_path)?;
    let writer1: Arc<Mutex<BoxedWriter>> = Arc::new(Mutex::new(create_writer(&config.out1_path)?));
    let writer2: Arc<Mutex<BoxedWriter>> = Arc::new(Mutex::new(create_writer(&config.out2_path)?));

    // Progress bar setup if not quiet
    let spinner = if !config.quiet {
        let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_spinner()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
                .template("{msg}")
                .map_err(|e| FilterError::InvalidInput(format!("progress template: {e}")))?,
        );
        pb.set_message("Filtering");
        Some(pb)
    } else {
        None
    };

    let stats = Arc::new(Mutex::new(RunStats::default()));
    let filtering_start = Instant::now();

    // Count pairs as the producer pulls them.
    let stats_in = Arc::clone(&stats);
    let counted = reader.map(move |result| {
        if let Ok(pair) = &result {
            let mut s = stats_in.lock();
            s.pairs_in += 1;
            s.bp_in += (pair.r1.seq.len() + pair.r2.seq.len()) as u64;
        }
        result
    });

    let pairs_out = if config.single_threaded {
        let mut written = 0u64;
        for result in filter_sequential(counted, &query_sets, config.k) {
            let pair = result?;
            write_record(&mut *writer1.lock(), &pair.r1)?;
            write_record(&mut *writer2.lock(), &pair.r2)?;
            written += 1;
            let mut s = stats.lock();
            s.pairs_out = written;
            if written % 4096 == 0 {
                update_spinner(&spinner, &s, filtering_start);
            }
        }
        written
    } else {
        let pipeline = PipelineConfig {
            chunk_size: config.chunk_size,
            threads: config.threads,
            ..Default::default()
        };
        let w1 = Arc::clone(&writer1);
        let w2 = Arc::clone(&writer2);
        let sink_stats = Arc::clone(&stats);
        let sink_spinner = spinner.clone();
        filter_concurrent(counted, &query_sets, config.k, &pipeline, move |pair| {
            write_record(&mut *w1.lock(), &pair.r1)?;
            write_record(&mut *w2.lock(), &pair.r2)?;
            let mut s = sink_stats.lock();
            s.pairs_out += 1;
            if s.pairs_out % 4096 == 0 {
                update_spinner(&sink_spinner, &s, filtering_start);
            }
            Ok(())
        })?
    };

    writer1.lock().flush()?;
    writer2.lock().flush()?;
    // Remaining handles drop here, finishing any compression streams.
    drop(writer1);
    drop(writer2);

    let (pairs_in, bp_in) = {
        let s = stats.lock();
        (s.pairs_in, s.bp_in)
    };
    let total_time = start_time.elapsed();
    let filtering_time = filtering_start.elapsed();
    let pairs_per_sec = pairs_in as f64 / filtering_time.as_secs_f64().max(f64::EPSILON);
    let out_proportion = if pairs_in > 0 {
        pairs_out as f64 / pairs_in as f64
    } else {
        0.0
    };

    if let Some(spinner) = &spinner {
        spinner.finish_with_message("");
        spinner.set_draw_target(ProgressDrawTarget::hidden());
    }

    if !config.quiet {
        eprintln!(
            "Retained {}/{} pairs ({:.3}%) in {:.2?}. {:.0} pairs/s",
            pairs_out,
            pairs_in,
            out_proportion * 100.0,
            total_time,
            pairs_per_sec
        );
    }

    // Build and write JSON summary if path provided
    if let Some(summary_path) = &config.summary_path {
        let summary = FilterSummary {
            version: format!("readsieve {version}"),
            query: config.query_path.clone(),
            in1: config.in1_path.clone(),
            in2: config.in2_path.clone(),
            out1: config.out1_path.clone(),
            out2: config.out2_path.clone(),
            k: config.k,
            check_reverse_complement: config.check_reverse_complement,
            single_threaded: config.single_threaded,
            threads: config.threads,
            chunk_size: config.chunk_size,
            pairs_in,
            pairs_out,
            pairs_out_proportion: out_proportion,
            bp_in,
            time: total_time.as_secs_f64(),
            pairs_per_second: pairs_per_sec as u64,
        };

        let file = File::create(summary_path).map_err(|e| {
            FilterError::InvalidInput(format!("failed to create summary {summary_path:?}: {e}"))
        })?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &summary)
            .map_err(|e| FilterError::InvalidInput(format!("failed to write summary: {e}")))?;

        if !config.quiet {
            eprintln!("Summary saved to {summary_path:?}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_summary_round_trip() {
        let summary = FilterSummary {
            version: "readsieve 0.4.1".to_string(),
            query: "query.fa".to_string(),
            in1: "r1.fastq".to_string(),
            in2: "r2.fastq".to_string(),
            out1: "o1.fastq".to_string(),
            out2: "o2.fastq".to_string(),
            k: 40,
            check_reverse_complement: true,
            single_threaded: false,
            threads: 8,
            chunk_size: 4096,
            pairs_in: 1000,
            pairs_out: 10,
            pairs_out_proportion: 0.01,
            bp_in: 300_000,
            time: 1.5,
            pairs_per_second: 666,
        };

        let json = serde_json::to_string(&summary).unwrap();
        let parsed: FilterSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.version, "readsieve 0.4.1");
        assert_eq!(parsed.k, 40);
        assert_eq!(parsed.pairs_in, 1000);
        assert_eq!(parsed.pairs_out_proportion, 0.01);
        assert!(parsed.check_reverse_complement);
    }

    #[test]
    fn test_config_builder() {
        let config = FilterConfig::new("q.fa", "r1.fq", "r2.fq", "o1.fq", "o2.fq")
            .with_kmer_length(31)
            .with_reverse_complement(true)
            .with_threads(4)
            .with_chunk_size(128)
            .with_force(true)
            .with_quiet(true);
        assert_eq!(config.k, 31);
        assert!(config.check_reverse_complement);
        assert_eq!(config.threads, 4);
        assert_eq!(config.chunk_size, 128);
        assert!(config.force);
        assert!(config.quiet);
    }

    #[test]
    fn test_missing_input_is_rejected() {
        let config = FilterConfig::new(
            "/nonexistent/q.fa",
            "/nonexistent/r1.fq",
            "/nonexistent/r2.fq",
            "-",
            "-",
        );
        assert!(matches!(
            run(&config),
            Err(FilterError::InvalidInput(_))
        ));
    }
}
