//! Sequential and order-preserving concurrent filtering pipelines.
//!
//! The concurrent pipeline splits the paired stream into fixed-size chunks
//! and scans chunks on a worker pool, but emitted order always equals
//! input order: each chunk gets a bounded single-producer single-consumer
//! result slot, the slot enters a bounded FIFO *before* the chunk's work
//! is scheduled, and a single writer drains slots strictly in FIFO order,
//! blocking on slot i until it closes before touching slot i+1.
//! Computation is unordered; output is not.
//!
//! Both FIFO and slot bounds are fixed, so memory use is capped
//! independent of input size. The producer blocks when the FIFO is full
//! and a worker can never run more than one chunk ahead of the writer
//! within its own slot.

use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::io::ReadPair;
use crate::query::QuerySets;
use crate::scan::sequence_has_match;
use crate::{FilterError, Result};

/// Default read pairs per chunk for the concurrent pipeline.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Tuning for the concurrent pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Read pairs per chunk (must be at least 1).
    pub chunk_size: usize,
    /// Worker thread count (0 = available parallelism).
    pub threads: usize,
    /// Extra result slots allowed in flight beyond the worker count.
    pub queue_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            threads: 0,
            queue_depth: 2,
        }
    }
}

/// True if mate 1 hits the forward set or mate 2 hits the reverse set.
#[inline]
pub fn pair_matches(pair: &ReadPair, query: &QuerySets, k: usize) -> bool {
    sequence_has_match(&pair.r1.seq, &query.forward, k)
        || sequence_has_match(&pair.r2.seq, &query.reverse, k)
}

/// Lazy single-pass filter over a fallible pair stream, in input order.
pub struct SequentialFilter<'a, I> {
    pairs: I,
    query: &'a QuerySets,
    k: usize,
}

impl<'a, I> Iterator for SequentialFilter<'a, I>
where
    I: Iterator<Item = Result<ReadPair>>,
{
    type Item = Result<ReadPair>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.pairs.next()? {
                Ok(pair) if pair_matches(&pair, self.query, self.k) => return Some(Ok(pair)),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Single-threaded pipeline: emits, in input order, exactly the pairs
/// where either mate matches its query set.
pub fn filter_sequential<I>(pairs: I, query: &QuerySets, k: usize) -> SequentialFilter<'_, I>
where
    I: Iterator<Item = Result<ReadPair>>,
{
    SequentialFilter { pairs, query, k }
}

type Chunk = Vec<ReadPair>;

/// Enqueue the chunk's result slot, then schedule its work. The slot must
/// enter the FIFO first so the writer sees slots in chunk order no matter
/// when workers pick the chunk up.
fn dispatch_chunk(
    slot_tx: &Sender<Receiver<ReadPair>>,
    work_tx: &Sender<(Chunk, Sender<ReadPair>)>,
    chunk: Chunk,
) -> Result<()> {
    // Slot capacity equals the chunk size, so a worker cannot buffer more
    // than one chunk's worth of matches ahead of the writer.
    let (results_tx, results_rx) = bounded(chunk.len());
    slot_tx
        .send(results_rx)
        .map_err(|_| FilterError::WorkerFailure("writer stopped accepting output".to_string()))?;
    work_tx
        .send((chunk, results_tx))
        .map_err(|_| FilterError::WorkerFailure("worker pool shut down early".to_string()))?;
    Ok(())
}

/// Multi-threaded pipeline with strict output ordering.
///
/// `sink` runs on the dedicated writer thread and receives matching pairs
/// in original input order. Returns the number of pairs written. On any
/// failure, slots completed before the failure point are still drained to
/// the sink before the error is surfaced; there is no retry.
pub fn filter_concurrent<I, S>(
    mut pairs: I,
    query: &QuerySets,
    k: usize,
    config: &PipelineConfig,
    mut sink: S,
) -> Result<u64>
where
    I: Iterator<Item = Result<ReadPair>>,
    S: FnMut(&ReadPair) -> Result<()> + Send,
{
    if config.chunk_size < 1 {
        return Err(FilterError::InvalidInput(
            "chunk size must be at least 1".to_string(),
        ));
    }
    let threads = if config.threads == 0 {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        config.threads
    };
    let slot_bound = threads + config.queue_depth.max(1);

    let (slot_tx, slot_rx) = bounded::<Receiver<ReadPair>>(slot_bound);
    let (work_tx, work_rx) = bounded::<(Chunk, Sender<ReadPair>)>(slot_bound);

    thread::scope(|scope| {
        let mut workers = Vec::with_capacity(threads);
        for _ in 0..threads {
            let work_rx = work_rx.clone();
            workers.push(scope.spawn(move || {
                for (chunk, results) in work_rx.iter() {
                    for pair in chunk {
                        if pair_matches(&pair, query, k) && results.send(pair).is_err() {
                            // Writer is gone; nothing useful left to do.
                            return;
                        }
                    }
                    // Dropping `results` closes this chunk's slot.
                    drop(results);
                }
            }));
        }
        drop(work_rx);

        let writer = scope.spawn(move || -> Result<u64> {
            let mut written = 0u64;
            for slot in slot_rx.iter() {
                // Block on this slot until its worker closes it; later
                // slots are untouched until it is fully drained.
                for pair in slot.iter() {
                    sink(&pair)?;
                    written += 1;
                }
            }
            Ok(written)
        });

        let produced = (|| -> Result<()> {
            let mut chunk = Vec::with_capacity(config.chunk_size);
            for pair in pairs.by_ref() {
                chunk.push(pair?);
                if chunk.len() == config.chunk_size {
                    let full = std::mem::replace(&mut chunk, Vec::with_capacity(config.chunk_size));
                    dispatch_chunk(&slot_tx, &work_tx, full)?;
                }
            }
            if !chunk.is_empty() {
                dispatch_chunk(&slot_tx, &work_tx, chunk)?;
            }
            Ok(())
        })();

        // Closing both channels lets the workers and then the writer run
        // dry; the writer drains every already-enqueued slot first.
        drop(slot_tx);
        drop(work_tx);

        let written = writer
            .join()
            .map_err(|_| FilterError::WorkerFailure("writer thread panicked".to_string()))??;
        for worker in workers {
            worker
                .join()
                .map_err(|_| FilterError::WorkerFailure("scan worker panicked".to_string()))?;
        }
        produced?;
        Ok(written)
    })
}
