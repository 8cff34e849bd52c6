//! Writing classification records as JSON or JSON Lines.
//!
//! JSONL records are streamed as soon as they are produced. JSON output is a
//! single document, so records are held until [`OutputWriter::finish`]: one
//! record is written as an object, several as an array.

use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

use crate::error::ConfigError;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON document
    Json,
    /// One JSON object per line
    JsonLines,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Ok(Self::JsonLines),
            other => Err(ConfigError::ValidationError(format!(
                "unknown output format {other:?} (expected json or jsonl)"
            ))),
        }
    }
}

/// Serializes records to an underlying writer.
pub struct OutputWriter<W: Write, T: Serialize> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    pending: Vec<T>,
    written: usize,
}

impl<W: Write, T: Serialize> OutputWriter<W, T> {
    /// `pretty` only affects JSON; JSONL is always one record per line.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            pending: Vec::new(),
            written: 0,
        }
    }

    /// Add one record.
    pub fn push(&mut self, record: T) -> io::Result<()> {
        match self.format {
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, &record).map_err(io::Error::other)?;
                writeln!(self.writer)?;
                self.writer.flush()?;
                self.written += 1;
            }
            OutputFormat::Json => self.pending.push(record),
        }
        Ok(())
    }

    /// Write any held records and flush. Returns the number of records written.
    pub fn finish(mut self) -> io::Result<usize> {
        if self.format == OutputFormat::Json && !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            match pending.as_slice() {
                [single] => self.write_json(single)?,
                many => self.write_json(&many)?,
            }
            self.written += pending.len();
        }
        self.writer.flush()?;
        Ok(self.written)
    }

    fn write_json<S: Serialize + ?Sized>(&mut self, value: &S) -> io::Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, value).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, value).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }
}
