//! # Readsieve
//!
//! Exact k-mer filtering of paired-end sequencing reads: a read pair is
//! retained when either mate contains an exact length-k substring match
//! (optionally including reverse complements) against the k-mers of one or
//! more query sequences.
//!
//! This crate provides both a library and a binary. The library exposes the
//! encoding, membership and scanning primitives alongside sequential and
//! order-preserving concurrent filtering pipelines.

pub mod filter;
pub mod io;
pub mod kmer;
pub mod kmer_set;
pub mod pipeline;
pub mod query;
pub mod scan;

// Re-export the important structures and functions for library users
pub use filter::{run as run_filter, FilterConfig, FilterSummary, DEFAULT_KMER_LENGTH};
pub use kmer::{Kmer, MAX_K};
pub use kmer_set::KmerSet;
pub use pipeline::{
    filter_concurrent, filter_sequential, pair_matches, PipelineConfig, DEFAULT_CHUNK_SIZE,
};
pub use query::{build_query_sets, QueryRecord, QuerySets};
pub use scan::{sequence_has_match, KmerWindow};

use thiserror::Error;

/// Errors surfaced by a filtering run. All variants are terminal for the
/// current run; recovery policy belongs to the caller.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Bad parameters or query sequences, detected before any scanning begins.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A record in one of the input streams could not be decoded.
    #[error("malformed record at pair {record}: {reason}")]
    MalformedRecord { record: u64, reason: String },

    /// A pipeline thread failed. Output completed before the failure has
    /// already been flushed in order.
    #[error("worker failure: {0}")]
    WorkerFailure(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FilterError>;
