//! Event input and output as JSON lines.
//!
//! One [`Event`] per line. Blank lines are skipped; any other line that does
//! not parse fails the whole load with its 1-based line number, so a
//! truncated or hand-edited file is never half-processed.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use thiserror::Error;

use decaylab_core::domain::Event;

/// Errors from the event I/O layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("read failed at line {line}: {source}")]
    Read {
        line: usize,
        source: std::io::Error,
    },

    #[error("malformed event at line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("failed to write events: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to encode event {index}: {source}")]
    Encode {
        index: u64,
        source: serde_json::Error,
    },
}

/// Parse every event from a JSON-lines reader.
pub fn read_events<R: BufRead>(reader: R) -> Result<Vec<Event>, LoadError> {
    let mut events = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|source| LoadError::Read {
            line: line_no,
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|source| LoadError::Parse {
            line: line_no,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Load events from a JSON-lines file.
pub fn load_events(path: &Path) -> Result<Vec<Event>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let events = read_events(BufReader::new(file))?;
    info!("loaded {} events from {}", events.len(), path.display());
    Ok(events)
}

/// Serialize events as JSON lines.
pub fn write_events<W: Write>(mut writer: W, events: &[Event]) -> Result<(), LoadError> {
    for event in events {
        serde_json::to_writer(&mut writer, event).map_err(|source| LoadError::Encode {
            index: event.index,
            source,
        })?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write events to a JSON-lines file, replacing it.
pub fn save_events(path: &Path, events: &[Event]) -> Result<(), LoadError> {
    let file = File::create(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_events(BufWriter::new(file), events)?;
    info!("wrote {} events to {}", events.len(), path.display());
    Ok(())
}
