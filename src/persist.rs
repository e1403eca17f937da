//! Artifact persistence for completed transfers and waveform captures.
//!
//! Filenames are part of the contract for downstream tooling:
//!
//! - `compressed_ppg_<id>_<timestamp>.bin` — raw bytes as received
//! - `decompressed_ppg_<id>_<timestamp>.csv` — decompressor output
//! - `ina228_waveform_<op>_<id>_<timestamp>.csv` — one row per sample
//!
//! Decompression itself is an external collaborator behind the `Decompress`
//! trait; the default implementation passes bytes through unchanged.

use crate::error::{AppResult, MonitorError};
use crate::model::{FileTransfer, WaveformRun};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Opaque decompression collaborator. The real PCA/autoencoder/RLE/Huffman
/// decoders live outside this crate.
pub trait Decompress: Send + Sync {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, String>;
}

/// Pass-through decompressor used when no decoder is wired in.
#[derive(Default)]
pub struct IdentityDecompressor;

impl Decompress for IdentityDecompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, String> {
        Ok(data.to_vec())
    }
}

/// Result of persisting one completed file transfer.
#[derive(Debug)]
pub struct SavedTransfer {
    pub compressed_path: PathBuf,
    pub decompressed_path: PathBuf,
    /// Data rows in the decompressed CSV, excluding the header.
    pub rows: usize,
}

/// Writes session artifacts into one output directory.
pub struct ArtifactStore {
    output_dir: PathBuf,
    decompressor: Box<dyn Decompress>,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>, decompressor: Box<dyn Decompress>) -> Self {
        Self {
            output_dir: output_dir.into(),
            decompressor,
        }
    }

    /// Write the raw transfer, decompress it, and write the decompressed
    /// CSV alongside. A failure affects only this transfer.
    pub fn save_transfer(&self, transfer: &FileTransfer) -> AppResult<SavedTransfer> {
        self.ensure_dir()?;
        let stamp = timestamp();

        let compressed_path = self
            .output_dir
            .join(format!("compressed_ppg_{}_{stamp}.bin", transfer.file_id));
        fs::write(&compressed_path, &transfer.data)
            .map_err(|e| MonitorError::Storage(format!("{}: {e}", compressed_path.display())))?;

        let decompressed = self
            .decompressor
            .decompress(&transfer.data)
            .map_err(|message| MonitorError::Decompress {
                file_id: transfer.file_id,
                message,
            })?;

        let decompressed_path = self
            .output_dir
            .join(format!("decompressed_ppg_{}_{stamp}.csv", transfer.file_id));
        fs::write(&decompressed_path, &decompressed)
            .map_err(|e| MonitorError::Storage(format!("{}: {e}", decompressed_path.display())))?;

        let rows = count_csv_rows(&decompressed);
        info!(
            file_id = transfer.file_id,
            rows,
            path = %decompressed_path.display(),
            "decompressed transfer persisted"
        );

        Ok(SavedTransfer {
            compressed_path,
            decompressed_path,
            rows,
        })
    }

    /// Write one CSV per waveform run, named from the run's operation tag
    /// and id. Returns the paths written, in run order.
    pub fn save_waveforms(&self, runs: &[WaveformRun]) -> AppResult<Vec<PathBuf>> {
        self.ensure_dir()?;
        let stamp = timestamp();
        let mut paths = Vec::with_capacity(runs.len());

        for run in runs {
            let path = self.output_dir.join(format!(
                "ina228_waveform_{}_{}_{stamp}.csv",
                run.operation.label().to_lowercase(),
                run.operation_id
            ));
            write_waveform_csv(&path, run)?;
            paths.push(path);
        }
        Ok(paths)
    }

    fn ensure_dir(&self) -> AppResult<()> {
        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir)
                .map_err(|e| MonitorError::Storage(format!("create output dir: {e}")))?;
        }
        Ok(())
    }
}

fn write_waveform_csv(path: &Path, run: &WaveformRun) -> AppResult<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| MonitorError::Storage(format!("{}: {e}", path.display())))?;
    writer
        .write_record(["Timestamp_ms", "Voltage_mV", "Current_mA"])
        .map_err(|e| MonitorError::Storage(e.to_string()))?;
    for sample in &run.samples {
        writer
            .write_record(&[
                sample.timestamp_ms.to_string(),
                sample.voltage_mv.to_string(),
                sample.current_ma.to_string(),
            ])
            .map_err(|e| MonitorError::Storage(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| MonitorError::Storage(e.to_string()))?;
    Ok(())
}

/// Count data rows in a decompressed CSV buffer, tolerating ragged lines.
fn count_csv_rows(data: &[u8]) -> usize {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(data)
        .records()
        .filter(|r| r.is_ok())
        .count()
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}
