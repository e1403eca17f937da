//! Fire-and-forget event fan-out toward the attached frontend.
//!
//! The dispatch loop must never block on the UI, so sinks take events by
//! value and return nothing. Every event carries an owned snapshot of the
//! data it describes; nothing refers back to dispatcher state.

use crate::model::{PowerLogRecord, RunSummary};
use tokio::sync::mpsc;
use tracing::info;

/// A notification destined for whatever frontend is attached.
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    /// A diagnostic status line, already formatted with its source prefix
    /// (e.g. "S3: ALL_DONE", "Power: INA228 ready").
    Status(String),
    /// One parsed power-log record, emitted as it arrives.
    PowerLog(PowerLogRecord),
    /// The session summary computed after `POWER_LOGS_END`.
    Summary(RunSummary),
}

/// Non-blocking sink for UI events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: UiEvent);
}

/// Sink that forwards events over an unbounded channel, for a frontend
/// running on its own task or thread. A closed receiver drops events
/// silently; the frontend going away must not disturb ingestion.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink that writes events to the tracing log, for headless runs.
#[derive(Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: UiEvent) {
        match event {
            UiEvent::Status(line) => info!("{line}"),
            UiEvent::PowerLog(record) => info!(
                "{} {}: {:.6} mWh, {:.2} mV, {:.2} mA, {} ms",
                record.operation.label(),
                record.id,
                record.energy_mwh,
                record.voltage_mv,
                record.current_ma,
                record.duration_ms
            ),
            UiEvent::Summary(summary) => {
                if let Some(avg) = summary.compression_averages {
                    info!(
                        "Average Compression Energy: {:.6} mWh, {:.2} mV, {:.2} mA, {:.2} ms",
                        avg.energy_mwh, avg.voltage_mv, avg.current_ma, avg.duration_ms
                    );
                }
                info!(
                    "Total Compression Energy: {:.6} mWh, Transmission Energy: {:.6} mWh, Total Energy: {:.6} mWh",
                    summary.compression_energy_mwh,
                    summary.transmission_energy_mwh,
                    summary.total_energy_mwh
                );
            }
        }
    }
}
