//! Entity files in and triple dumps out.
//!
//! Input is either a JSON array of entity objects or NDJSON with one entity
//! per line. Output is NDJSON, one tagged triple per line.

use crate::error::{Result, TripleDbError};
use crate::TripleStore;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// A record that could not be loaded. `record` is 1-based: the line number
/// for NDJSON, the element position for JSON arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadFailure {
    pub record: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub inserted: usize,
    pub failures: Vec<LoadFailure>,
}

/// Split entity-file text into (record number, entity) pairs.
///
/// A malformed JSON array fails as a whole; malformed NDJSON lines are
/// returned as failures and the remaining lines still parse.
pub fn parse_entities(text: &str) -> Result<(Vec<(usize, Value)>, Vec<LoadFailure>)> {
    if text.trim_start().starts_with('[') {
        let entities: Vec<Value> = serde_json::from_str(text).map_err(|e| TripleDbError::ParseError {
            line: e.line(),
            message: e.to_string(),
        })?;
        let numbered = entities.into_iter().enumerate().map(|(i, v)| (i + 1, v)).collect();
        return Ok((numbered, Vec::new()));
    }

    let mut entities = Vec::new();
    let mut failures = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => entities.push((i + 1, value)),
            Err(e) => {
                warn!(line = i + 1, error = %e, "skipping malformed entity line");
                failures.push(LoadFailure {
                    record: i + 1,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok((entities, failures))
}

/// Read an entity file and batch-insert it into `store`
pub fn load_file<P: AsRef<Path>>(store: &TripleStore, path: P) -> Result<LoadReport> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let report = load_str(store, &text)?;
    info!(
        path = %path.display(),
        inserted = report.inserted,
        failed = report.failures.len(),
        "loaded entity file"
    );
    Ok(report)
}

/// Batch-insert entity-file text into `store`
pub fn load_str(store: &TripleStore, text: &str) -> Result<LoadReport> {
    let (numbered, mut failures) = parse_entities(text)?;
    let (records, entities): (Vec<usize>, Vec<Value>) = numbered.into_iter().unzip();

    let batch = store.batch_insert(entities);
    for error in batch.errors {
        failures.push(LoadFailure {
            record: records[error.index],
            error: error.error,
        });
    }
    failures.sort_by_key(|f| f.record);

    Ok(LoadReport {
        inserted: batch.results.iter().filter(|r| r.is_some()).count(),
        failures,
    })
}

/// Write every triple as one tagged JSON object per line
pub fn write_triples<W: Write>(store: &TripleStore, mut writer: W) -> Result<usize> {
    let triples = store.all_triples();
    for triple in &triples {
        serde_json::to_writer(&mut writer, triple)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(triples.len())
}
