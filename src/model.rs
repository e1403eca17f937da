//! Data model for file transfers, telemetry records, and session summaries.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An in-progress (or completed) bulk file transfer.
///
/// Created when a `FILE_START` marker arrives, grown by binary payloads, and
/// finalized by `FILE_END`. The declared size is advisory only; the firmware
/// does not pad or truncate to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileTransfer {
    pub file_id: u32,
    pub filename: String,
    /// Declared size from the start marker; informational, never enforced.
    pub declared_size: u64,
    pub data: Vec<u8>,
}

impl FileTransfer {
    pub fn new(file_id: u32, filename: String, declared_size: u64) -> Self {
        Self {
            file_id,
            filename,
            declared_size,
            data: Vec::new(),
        }
    }

    /// Append a received binary chunk verbatim.
    pub fn extend(&mut self, chunk: &Bytes) {
        self.data.extend_from_slice(chunk);
    }
}

/// One instantaneous INA228 power reading inside a waveform capture.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveformSample {
    pub timestamp_ms: f64,
    pub voltage_mv: f64,
    pub current_ma: f64,
}

/// One waveform capture associated with a single firmware operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveformRun {
    pub operation: Operation,
    pub operation_id: u32,
    pub samples: Vec<WaveformSample>,
}

/// Operation tag attached to power-log records and waveform runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Compression,
    Transmission,
    /// A tag this core does not know; preserved verbatim for display and
    /// artifact naming.
    Other(String),
}

impl Operation {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "Compression" => Operation::Compression,
            "Transmission" => Operation::Transmission,
            other => Operation::Other(other.to_string()),
        }
    }

    /// Label used in artifact filenames and UI lines.
    pub fn label(&self) -> &str {
        match self {
            Operation::Compression => "Compression",
            Operation::Transmission => "Transmission",
            Operation::Other(tag) => tag,
        }
    }
}

/// One energy accounting entry dumped by the power peripheral.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerLogRecord {
    pub id: u32,
    pub operation: Operation,
    pub voltage_mv: f64,
    pub current_ma: f64,
    pub energy_mwh: f64,
    pub duration_ms: u64,
}

/// How the session exercised the device: one operation, or the same
/// operation repeated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    Single,
    /// Repeat count is clamped to 1..=5 by command validation.
    Repeat(u8),
}

impl RunMode {
    pub fn is_repeat(self) -> bool {
        matches!(self, RunMode::Repeat(_))
    }
}

/// Arithmetic means over the compression-tagged records of a repeat-mode
/// session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompressionAverages {
    pub energy_mwh: f64,
    pub voltage_mv: f64,
    pub current_ma: f64,
    pub duration_ms: f64,
}

/// Aggregated statistics for one session, derived from its power-log
/// records at display time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_energy_mwh: f64,
    pub compression_energy_mwh: f64,
    pub transmission_energy_mwh: f64,
    /// Present only for repeat-mode sessions with at least one
    /// compression-tagged record.
    pub compression_averages: Option<CompressionAverages>,
}
