//! Session logging collaborator
//!
//! Records leave the pipeline through a [`RecordSink`]. [`SessionLog`] keeps
//! the most recent records in memory for a live view and appends every
//! `log_every`-th record to a JSONL file.

use crate::config::DEFAULT_LOG_EVERY;
use crate::error::MonitorError;
use crate::record::OutputRecord;
use crate::ring::RingBuffer;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Records retained in memory
pub const DEFAULT_MEMORY_SIZE: usize = 50;

/// Consumer of finished output records
pub trait RecordSink {
    /// Take a record. Must not fail; problems are logged by the sink.
    fn accept(&mut self, record: &OutputRecord);
}

/// In-memory recent-record ring with optional JSONL persistence
#[derive(Debug)]
pub struct SessionLog {
    log_every: usize,
    frame_counter: u64,
    records_written: u64,
    memory: RingBuffer<OutputRecord>,
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::in_memory(DEFAULT_LOG_EVERY, DEFAULT_MEMORY_SIZE)
    }
}

impl SessionLog {
    /// Log that only keeps recent records
    pub fn in_memory(log_every: usize, memory_size: usize) -> Self {
        Self {
            log_every: log_every.max(1),
            frame_counter: 0,
            records_written: 0,
            memory: RingBuffer::with_capacity(memory_size),
            path: None,
            writer: None,
        }
    }

    /// Open `session_<YYYYmmdd_HHMMSS>.jsonl` under `dir`
    pub fn create(dir: &Path, log_every: usize, memory_size: usize) -> Result<Self, MonitorError> {
        fs::create_dir_all(dir)?;
        let name = format!("session_{}.jsonl", Local::now().format("%Y%m%d_%H%M%S"));
        Self::open(&dir.join(name), log_every, memory_size)
    }

    /// Append to a specific file
    pub fn open(path: &Path, log_every: usize, memory_size: usize) -> Result<Self, MonitorError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!(path = %path.display(), "session log opened");

        let mut log = Self::in_memory(log_every, memory_size);
        log.path = Some(path.to_path_buf());
        log.writer = Some(BufWriter::new(file));
        Ok(log)
    }

    /// Log a record. Returns whether it was written to disk.
    pub fn log(&mut self, record: &OutputRecord) -> bool {
        self.frame_counter += 1;
        self.memory.push(record.clone());

        if self.frame_counter % self.log_every as u64 != 0 {
            return false;
        }
        let Some(writer) = self.writer.as_mut() else {
            return false;
        };

        let written = serde_json::to_string(record)
            .map_err(MonitorError::from)
            .and_then(|line| {
                writeln!(writer, "{}", line)?;
                writer.flush()?;
                Ok(())
            });
        match written {
            Ok(()) => {
                self.records_written += 1;
                true
            }
            Err(e) => {
                error!(error = %e, "failed to write session record");
                false
            }
        }
    }

    /// Most recent record, if any
    pub fn last_record(&self) -> Option<&OutputRecord> {
        self.memory.last()
    }

    /// Retained records, oldest first
    pub fn recent_records(&self) -> Vec<OutputRecord> {
        self.memory.iter().cloned().collect()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn records_seen(&self) -> u64 {
        self.frame_counter
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

impl RecordSink for SessionLog {
    fn accept(&mut self, record: &OutputRecord) {
        self.log(record);
    }
}

impl RecordSink for Vec<OutputRecord> {
    fn accept(&mut self, record: &OutputRecord) {
        self.push(record.clone());
    }
}
