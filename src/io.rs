//! Record-level input and output: compressed FASTA/FASTQ sources, paired
//! lock-step reading, and extension-aware output writers.
//!
//! The filtering core treats everything here as an external collaborator;
//! it only sees [`ReadPair`] values and never touches file formats.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

use bio::io::{fasta, fastq};
use flate2::write::GzEncoder;
use zstd::stream::write::Encoder as ZstdEncoder;

use crate::query::QueryRecord;
use crate::{FilterError, Result};

const OUTPUT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

pub type BoxedWriter = Box<dyn Write + Send>;
type Decompressed = BufReader<Box<dyn Read + Send>>;

/// One sequencing record. Identifier, description and quality are opaque
/// metadata the filter passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
}

/// Same-index records from the two paired input streams.
#[derive(Debug, Clone)]
pub struct ReadPair {
    pub r1: SeqRecord,
    pub r2: SeqRecord,
}

/// FASTA or FASTQ records from one, possibly compressed, stream.
pub enum RecordSource {
    Fasta(fasta::Records<Decompressed>),
    Fastq(fastq::Records<Decompressed>),
}

fn open_decompressed(path: &str) -> Result<Decompressed> {
    match niffler::send::from_path(path) {
        Ok((reader, _format)) => Ok(BufReader::new(reader)),
        // Files below niffler's sniff window cannot carry a compression
        // header; read them as plain bytes so an empty mate file still
        // counts as a zero-record stream.
        Err(niffler::Error::FileTooShort) => {
            let file = File::open(path).map_err(|e| {
                FilterError::InvalidInput(format!("failed to open {path}: {e}"))
            })?;
            Ok(BufReader::new(Box::new(file) as Box<dyn Read + Send>))
        }
        Err(e) => Err(FilterError::InvalidInput(format!(
            "failed to open {path}: {e}"
        ))),
    }
}

impl RecordSource {
    /// Open a sequence file, sniffing FASTA vs FASTQ from the first byte.
    pub fn open(path: &str) -> Result<Self> {
        let mut reader = open_decompressed(path)?;
        let first = reader.fill_buf()?.first().copied();
        match first {
            Some(b'>') => Ok(Self::Fasta(fasta::Reader::from_bufread(reader).records())),
            // An empty file is a valid zero-record FASTQ stream
            Some(b'@') | None => Ok(Self::Fastq(fastq::Reader::from_bufread(reader).records())),
            Some(other) => Err(FilterError::InvalidInput(format!(
                "{path} does not look like FASTA or FASTQ (starts with '{}')",
                other as char
            ))),
        }
    }
}

impl Iterator for RecordSource {
    type Item = io::Result<SeqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Fasta(records) => records.next().map(|result| {
                result.map(|rec| SeqRecord {
                    id: rec.id().to_string(),
                    desc: rec.desc().map(String::from),
                    seq: rec.seq().to_vec(),
                    qual: None,
                })
            }),
            Self::Fastq(records) => records.next().map(|result| {
                result
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
                    .map(|rec| SeqRecord {
                        id: rec.id().to_string(),
                        desc: rec.desc().map(String::from),
                        seq: rec.seq().to_vec(),
                        qual: Some(rec.qual().to_vec()),
                    })
            }),
        }
    }
}

/// Lock-step iteration over the two mate streams, yielding one
/// [`ReadPair`] per index. Iteration stops at the shorter stream if the
/// record counts differ.
pub struct PairedReader {
    r1: RecordSource,
    r2: RecordSource,
    position: u64,
}

impl PairedReader {
    pub fn open(path1: &str, path2: &str) -> Result<Self> {
        Ok(Self {
            r1: RecordSource::open(path1)?,
            r2: RecordSource::open(path2)?,
            position: 0,
        })
    }
}

impl Iterator for PairedReader {
    type Item = Result<ReadPair>;

    fn next(&mut self) -> Option<Self::Item> {
        let (r1, r2) = match (self.r1.next(), self.r2.next()) {
            (Some(r1), Some(r2)) => (r1, r2),
            // Shorter stream exhausted
            _ => return None,
        };
        self.position += 1;
        let position = self.position;
        let decode = |result: io::Result<SeqRecord>| {
            result.map_err(|e| FilterError::MalformedRecord {
                record: position,
                reason: e.to_string(),
            })
        };
        match (decode(r1), decode(r2)) {
            (Ok(r1), Ok(r2)) => Some(Ok(ReadPair { r1, r2 })),
            (Err(e), _) | (_, Err(e)) => Some(Err(e)),
        }
    }
}

/// Read all query records from a FASTA (or FASTQ) file.
pub fn read_query_records(path: &str) -> Result<Vec<QueryRecord>> {
    let mut records = Vec::new();
    for (i, result) in RecordSource::open(path)?.enumerate() {
        let record = result.map_err(|e| FilterError::MalformedRecord {
            record: i as u64 + 1,
            reason: e.to_string(),
        })?;
        records.push(QueryRecord {
            id: record.id,
            seq: record.seq,
        });
    }
    Ok(records)
}

/// Writer for the given output path; `.gz` and `.zst` select compression,
/// `-` writes to stdout.
pub fn create_writer(output_path: &str) -> Result<BoxedWriter> {
    if output_path == "-" {
        return Ok(Box::new(BufWriter::with_capacity(
            OUTPUT_BUFFER_SIZE,
            io::stdout(),
        )));
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(output_path)
        .map_err(|e| {
            FilterError::InvalidInput(format!("failed to create output file {output_path}: {e}"))
        })?;
    let buffered = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, file);

    match output_path {
        p if p.ends_with(".gz") => Ok(Box::new(GzEncoder::new(
            buffered,
            flate2::Compression::default(),
        ))),
        p if p.ends_with(".zst") => Ok(Box::new(ZstdEncoder::new(buffered, 0)?.auto_finish())),
        _ => Ok(Box::new(buffered)),
    }
}

/// Append one record to `out`, as FASTA when it carries no quality string
/// and FASTQ otherwise.
pub fn write_record<W: Write>(out: &mut W, record: &SeqRecord) -> io::Result<()> {
    out.write_all(if record.qual.is_none() { b">" } else { b"@" })?;
    out.write_all(record.id.as_bytes())?;
    if let Some(desc) = &record.desc {
        out.write_all(b" ")?;
        out.write_all(desc.as_bytes())?;
    }
    out.write_all(b"\n")?;
    out.write_all(&record.seq)?;
    match &record.qual {
        None => out.write_all(b"\n")?,
        Some(qual) => {
            out.write_all(b"\n+\n")?;
            out.write_all(qual)?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}
