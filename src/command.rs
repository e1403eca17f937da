//! Outbound device command vocabulary.
//!
//! Commands are sent as raw text bytes to each peripheral's
//! device-addressable write endpoint. The endpoint itself (a BLE
//! characteristic write in the deployed rig) is a black box behind the
//! `CommandPort` trait.

use crate::channel::Transport;
use crate::error::{AppResult, MonitorError};
use crate::model::RunMode;
use async_trait::async_trait;
use chrono::SecondsFormat;
use std::sync::Arc;

/// Compression algorithm selectable for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    Autoencoder,
    Pca,
    Rle,
    Huffman,
}

impl Algorithm {
    fn wire(self) -> &'static str {
        match self {
            Algorithm::Autoencoder => "AUTOENCODER",
            Algorithm::Pca => "PCA",
            Algorithm::Rle => "RLE",
            Algorithm::Huffman => "HUFFMAN",
        }
    }
}

/// Parameters of the combined start-process command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartProcess {
    pub mode: RunMode,
    pub file: String,
    pub algorithm: Algorithm,
    pub protocol: Transport,
    pub wifi_ssid: String,
    pub wifi_password: String,
}

/// One outbound command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Ping,
    ReadIna,
    DumpLogs,
    SetTime(chrono::DateTime<chrono::Utc>),
    SetSampleRate(u32),
    SetDuration(u32),
    StartCsv,
    StartProcess(StartProcess),
}

impl Command {
    /// Render the command to its wire form.
    ///
    /// Fails for a repeat-mode start-process command whose repeat count is
    /// outside 1..=5, which the firmware rejects.
    pub fn encode(&self) -> AppResult<String> {
        match self {
            Command::Ping => Ok("ping".into()),
            Command::ReadIna => Ok("read_ina".into()),
            Command::DumpLogs => Ok("dump_logs".into()),
            Command::SetTime(time) => Ok(format!(
                "set_time,{}",
                time.to_rfc3339_opts(SecondsFormat::Secs, true)
            )),
            Command::SetSampleRate(hz) => Ok(format!("set_sample_rate,{hz}")),
            Command::SetDuration(ms) => Ok(format!("set_duration,{ms}")),
            Command::StartCsv => Ok("start_csv".into()),
            Command::StartProcess(start) => start.encode(),
        }
    }
}

impl StartProcess {
    fn encode(&self) -> AppResult<String> {
        let protocol = match self.protocol {
            Transport::Ble => "BLE",
            Transport::Wifi => "WIFI",
        };
        match self.mode {
            RunMode::Single => Ok(format!(
                "SINGLE:{}:{}:{}:{}:{}",
                self.file,
                self.algorithm.wire(),
                protocol,
                self.wifi_ssid,
                self.wifi_password
            )),
            RunMode::Repeat(repeats) => {
                if !(1..=5).contains(&repeats) {
                    return Err(MonitorError::Command(format!(
                        "repeats must be 1-5, got {repeats}"
                    )));
                }
                Ok(format!(
                    "REPEAT:{repeats}:{}:{}:{}:{}:{}",
                    self.file,
                    self.algorithm.wire(),
                    protocol,
                    self.wifi_ssid,
                    self.wifi_password
                ))
            }
        }
    }
}

/// Device-addressable write endpoint, implemented by the wireless stack.
#[async_trait]
pub trait CommandPort: Send + Sync {
    async fn write(&self, payload: &[u8]) -> AppResult<()>;
}

/// The two peripherals' write endpoints. Start-process commands go to both
/// so the power peripheral can align its logging with the run.
pub struct CommandWriter {
    pub s3: Arc<dyn CommandPort>,
    pub power: Arc<dyn CommandPort>,
}

impl CommandWriter {
    pub async fn send_to_s3(&self, command: &Command) -> AppResult<()> {
        self.s3.write(command.encode()?.as_bytes()).await
    }

    pub async fn send_to_power(&self, command: &Command) -> AppResult<()> {
        self.power.write(command.encode()?.as_bytes()).await
    }

    pub async fn broadcast(&self, command: &Command) -> AppResult<()> {
        let encoded = command.encode()?;
        self.s3.write(encoded.as_bytes()).await?;
        self.power.write(encoded.as_bytes()).await?;
        Ok(())
    }
}
