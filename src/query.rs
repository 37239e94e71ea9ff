//! Query k-mer set construction.
//!
//! Query sequences, unlike reads, must be fully resolved: any ambiguous
//! symbol anywhere in a query record is an error rather than a skip.

use std::sync::Arc;

use crate::kmer::{base_bits, Kmer, MAX_K};
use crate::kmer_set::KmerSet;
use crate::{FilterError, Result};

/// A query record: identifier plus fully resolved sequence.
#[derive(Debug, Clone)]
pub struct QueryRecord {
    pub id: String,
    pub seq: Vec<u8>,
}

/// The membership sets each mate is scanned against.
///
/// With reverse complement checking enabled both fields point at the same
/// combined, orientation-agnostic set; otherwise mate 1 is checked against
/// `forward` and mate 2 against `reverse` only, modelling mate 2 being
/// sequenced from the opposite strand.
#[derive(Debug, Clone)]
pub struct QuerySets {
    pub forward: Arc<KmerSet>,
    pub reverse: Arc<KmerSet>,
}

/// All overlapping k-mers of one query sequence in order, before
/// deduplication. Rejects empty or ambiguous sequences; a sequence shorter
/// than k yields no k-mers.
pub(crate) fn query_kmers(id: &str, seq: &[u8], k: usize) -> Result<Vec<Kmer>> {
    if seq.is_empty() {
        return Err(FilterError::InvalidInput(format!(
            "query sequence '{id}' is empty"
        )));
    }
    if let Some(pos) = seq.iter().position(|&b| base_bits(b).is_none()) {
        return Err(FilterError::InvalidInput(format!(
            "query sequence '{id}' contains ambiguous symbol '{}' at position {}",
            seq[pos] as char,
            pos + 1
        )));
    }
    if seq.len() < k {
        return Ok(Vec::new());
    }
    let mut kmers = Vec::with_capacity(seq.len() - k + 1);
    let mut current = Kmer::encode(&seq[..k])?;
    kmers.push(current);
    for &base in &seq[k..] {
        current = current.extend(base)?;
        kmers.push(current);
    }
    Ok(kmers)
}

/// Build the mate 1 / mate 2 membership sets from the query records.
pub fn build_query_sets(
    queries: &[QueryRecord],
    k: usize,
    check_reverse_complement: bool,
) -> Result<QuerySets> {
    if !(1..=MAX_K).contains(&k) {
        return Err(FilterError::InvalidInput(format!(
            "k must be between 1 and {MAX_K}, got {k}"
        )));
    }
    if queries.is_empty() {
        return Err(FilterError::InvalidInput(
            "no query sequences provided".to_string(),
        ));
    }

    let mut forward = Vec::new();
    for record in queries {
        forward.extend(query_kmers(&record.id, &record.seq, k)?);
    }
    if forward.is_empty() {
        return Err(FilterError::InvalidInput(format!(
            "no query sequence is at least {k} bases long"
        )));
    }

    let hint = forward.len();
    if check_reverse_complement {
        // One combined set shared by both mates.
        let mut set = KmerSet::with_capacity(hint * 2);
        for kmer in &forward {
            set.insert(kmer.data());
            set.insert(kmer.reverse_complement().data());
        }
        let set = Arc::new(set);
        Ok(QuerySets {
            forward: Arc::clone(&set),
            reverse: set,
        })
    } else {
        let reverse = KmerSet::from_values(
            forward.iter().map(|kmer| kmer.reverse_complement().data()),
            hint,
        );
        let forward = KmerSet::from_values(forward.iter().map(|kmer| kmer.data()), hint);
        Ok(QuerySets {
            forward: Arc::new(forward),
            reverse: Arc::new(reverse),
        })
    }
}
