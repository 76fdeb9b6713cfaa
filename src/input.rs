//! NDJSON ingestion feeding the accumulator.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::aggregate::Accumulator;
use crate::record::ResourceRecord;

/// Counters describing one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Records parsed and fed to the accumulator.
    pub records: u64,
    /// Malformed lines that were logged and skipped.
    pub skipped: u64,
}

impl IngestStats {
    fn merge(&mut self, other: IngestStats) {
        self.records += other.records;
        self.skipped += other.skipped;
    }
}

/// Feed every configured source into the accumulator, in order.
///
/// The path `-` reads stdin. A missing or unreadable file aborts the run;
/// malformed lines within a readable source do not.
pub fn ingest_paths(acc: &mut Accumulator, paths: &[PathBuf]) -> Result<IngestStats> {
    let mut totals = IngestStats::default();

    for path in paths {
        let stats = if path.as_os_str() == "-" {
            ingest_reader(acc, io::stdin().lock(), "stdin")?
        } else {
            let source = path.display().to_string();
            let file =
                File::open(path).with_context(|| format!("opening input file {source}"))?;
            ingest_reader(acc, BufReader::new(file), &source)?
        };

        totals.merge(stats);
    }

    Ok(totals)
}

/// Feed one NDJSON stream into the accumulator.
///
/// Blank lines are ignored. A line that fails to parse as a JSON object is
/// logged with its position and skipped; it never aborts the stream.
pub fn ingest_reader<R: BufRead>(
    acc: &mut Accumulator,
    reader: R,
    source: &str,
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {} of {source}", index + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match ResourceRecord::from_json_line(trimmed) {
            Ok(record) => {
                acc.add_resource(&record);
                stats.records += 1;
            }
            Err(err) => {
                stats.skipped += 1;
                tracing::warn!(
                    source,
                    line = index + 1,
                    error = %err,
                    "skipping malformed record"
                );
            }
        }
    }

    tracing::debug!(
        source,
        records = stats.records,
        skipped = stats.skipped,
        "ingested source"
    );

    Ok(stats)
}
