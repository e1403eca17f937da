//! Single-consumer dispatch loop.
//!
//! One task drains both channel queues in a fixed round-robin, routing each
//! item to the state machine owning that channel. All reassembler/parser
//! state lives here, behind `&mut self` on the loop's own task, so no locks
//! guard it. Persistence runs synchronously (fast local file writes) and UI
//! notification is fire-and-forget, keeping either channel from starving the
//! other.
//!
//! The two peripheral roles are instances of one generic
//! `ChannelProcessor<R>` parameterized by a `RoleHandler`, not two duplicated
//! loops.

use crate::aggregate::summarize;
use crate::channel::{ChannelItem, ChannelReceiver, Payload, Transport};
use crate::ingest::frame::{FrameEvent, FrameReassembler};
use crate::ingest::records::{RecordEvent, RecordParser};
use crate::model::RunMode;
use crate::persist::ArtifactStore;
use crate::sink::{EventSink, UiEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, info, warn};

/// Poll interval when both queues are empty, to avoid busy-spinning.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Per-channel "session active" flag, shared between a transport adapter
/// and the dispatch loop. Clearing it stops the adapter from enqueuing and
/// lets the loop finish once the queue is drained.
#[derive(Clone, Default)]
pub struct ActiveFlag(Arc<AtomicBool>);

impl ActiveFlag {
    pub fn new(active: bool) -> Self {
        Self(Arc::new(AtomicBool::new(active)))
    }

    pub fn set(&self, active: bool) {
        self.0.store(active, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Collaborators and session settings shared by both role handlers.
pub struct DispatchCtx {
    pub store: ArtifactStore,
    pub sink: Arc<dyn EventSink>,
    pub mode: RunMode,
    /// The transport the operator selected for file transfers. File-framing
    /// items arriving on the other transport are dropped.
    pub protocol: Transport,
}

/// Role-specific handling of one dequeued item.
pub trait RoleHandler {
    fn on_item(&mut self, item: ChannelItem, ctx: &DispatchCtx);
}

/// Bulk-file peripheral: file-transfer framing plus informational lines.
#[derive(Default)]
pub struct FileRole {
    reassembler: FrameReassembler,
}

impl RoleHandler for FileRole {
    fn on_item(&mut self, item: ChannelItem, ctx: &DispatchCtx) {
        let label = item.channel.label();
        let gated = item.transport != ctx.protocol;
        match item.payload {
            Payload::Binary(chunk) => {
                if gated {
                    // Declared protocol gating: the firmware still streams on
                    // the deselected transport during switchover.
                    debug!(
                        transport = ?item.transport,
                        bytes = chunk.len(),
                        "dropping binary chunk from deselected transport"
                    );
                    return;
                }
                self.reassembler.on_binary(&chunk);
            }
            Payload::Text(line) => {
                if gated && (line.starts_with("FILE_START:") || line == "FILE_END") {
                    debug!(transport = ?item.transport, %line, "ignoring file marker from deselected transport");
                    return;
                }
                match self.reassembler.on_text(&line) {
                    FrameEvent::Started { file_id, filename } => {
                        let via = match item.transport {
                            Transport::Ble => "BLE",
                            Transport::Wifi => "WiFi",
                        };
                        ctx.sink.emit(UiEvent::Status(format!(
                            "Receiving file {file_id}: {filename} via {via}"
                        )));
                    }
                    FrameEvent::Completed(transfer) => match ctx.store.save_transfer(&transfer) {
                        Ok(saved) => {
                            ctx.sink.emit(UiEvent::Status(format!(
                                "Decompressed file {}: {} rows",
                                transfer.file_id, saved.rows
                            )));
                        }
                        Err(e) => {
                            error!(file_id = transfer.file_id, %e, "failed to persist transfer");
                            ctx.sink.emit(UiEvent::Status(format!(
                                "Decompression error for file {}: {e}",
                                transfer.file_id
                            )));
                        }
                    },
                    FrameEvent::Abandoned {
                        old_file_id,
                        new_file_id,
                        new_filename,
                    } => {
                        ctx.sink.emit(UiEvent::Status(format!(
                            "Abandoned file {old_file_id}; receiving file {new_file_id}: {new_filename}"
                        )));
                    }
                    FrameEvent::NotFraming => {
                        // Progress lines and anything else the firmware prints.
                        ctx.sink.emit(UiEvent::Status(format!("{label}: {line}")));
                    }
                    FrameEvent::Appended { .. } | FrameEvent::Malformed(_) => {}
                }
            }
        }
    }
}

/// Power-telemetry peripheral: waveform and power-log records.
#[derive(Default)]
pub struct PowerRole {
    parser: RecordParser,
}

impl RoleHandler for PowerRole {
    fn on_item(&mut self, item: ChannelItem, ctx: &DispatchCtx) {
        let label = item.channel.label();
        let Payload::Text(line) = item.payload else {
            // The power peripheral speaks text only; stray binary is noise.
            warn!("ignoring binary chunk on power telemetry channel");
            return;
        };
        match self.parser.on_text(&line) {
            RecordEvent::RunsCompleted(runs) => match ctx.store.save_waveforms(&runs) {
                Ok(paths) => {
                    for path in paths {
                        ctx.sink.emit(UiEvent::Status(format!(
                            "Saved waveform to {}",
                            path.display()
                        )));
                    }
                }
                Err(e) => {
                    error!(%e, "failed to persist waveform runs");
                    ctx.sink
                        .emit(UiEvent::Status(format!("Error saving waveforms: {e}")));
                }
            },
            RecordEvent::PowerLogAppended(record) => {
                // Each record is emitted with its own owned snapshot.
                ctx.sink.emit(UiEvent::PowerLog(record));
            }
            RecordEvent::PowerLogsCompleted(records) => {
                let summary = summarize(&records, ctx.mode);
                ctx.sink.emit(UiEvent::Summary(summary));
            }
            RecordEvent::Info(text) => {
                ctx.sink.emit(UiEvent::Status(format!("{label}: {text}")));
            }
            RecordEvent::WaveformStarted
            | RecordEvent::RunOpened { .. }
            | RecordEvent::SampleAppended
            | RecordEvent::PowerLogsStarted
            | RecordEvent::Malformed(_) => {}
        }
    }
}

enum Poll {
    Progress,
    Empty,
    Closed,
}

/// One channel's queue endpoint, active flag, and role handler.
pub struct ChannelProcessor<R: RoleHandler> {
    rx: ChannelReceiver,
    active: ActiveFlag,
    handler: R,
}

impl<R: RoleHandler> ChannelProcessor<R> {
    pub fn new(rx: ChannelReceiver, active: ActiveFlag, handler: R) -> Self {
        Self {
            rx,
            active,
            handler,
        }
    }

    fn poll(&mut self, ctx: &DispatchCtx) -> Poll {
        match self.rx.rx.try_recv() {
            Ok(item) => {
                self.handler.on_item(item, ctx);
                Poll::Progress
            }
            Err(TryRecvError::Empty) => Poll::Empty,
            Err(TryRecvError::Disconnected) => Poll::Closed,
        }
    }
}

/// The single consumer of both channel queues.
pub struct Dispatcher {
    file: ChannelProcessor<FileRole>,
    power: ChannelProcessor<PowerRole>,
    ctx: DispatchCtx,
}

impl Dispatcher {
    pub fn new(
        file: ChannelProcessor<FileRole>,
        power: ChannelProcessor<PowerRole>,
        ctx: DispatchCtx,
    ) -> Self {
        Self { file, power, ctx }
    }

    /// Drain both queues round-robin until every channel's active flag is
    /// cleared and its queue is exhausted. An unterminated transfer or run
    /// simply stays buffered until then.
    pub async fn run(mut self) {
        info!("dispatch loop started");
        loop {
            let file_poll = self.file.poll(&self.ctx);
            let power_poll = self.power.poll(&self.ctx);

            if matches!(file_poll, Poll::Progress) || matches!(power_poll, Poll::Progress) {
                continue;
            }

            let file_done = !self.file.active.is_active() || matches!(file_poll, Poll::Closed);
            let power_done = !self.power.active.is_active() || matches!(power_poll, Poll::Closed);
            if file_done && power_done {
                break;
            }
            tokio::time::sleep(IDLE_POLL).await;
        }
        info!("dispatch loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{channel_queue, ChannelId, ChannelSender};
    use crate::persist::IdentityDecompressor;
    use crate::sink::ChannelSink;
    use bytes::Bytes;
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Rig {
        file_tx: ChannelSender,
        power_tx: ChannelSender,
        file_active: ActiveFlag,
        power_active: ActiveFlag,
        events: UnboundedReceiver<UiEvent>,
        dispatcher: Dispatcher,
        _dir: TempDir,
    }

    fn rig(mode: RunMode, protocol: Transport) -> Rig {
        let dir = TempDir::new().unwrap();
        let (file_tx, file_rx) = channel_queue(ChannelId::BulkFile);
        let (power_tx, power_rx) = channel_queue(ChannelId::PowerTelemetry);
        let (sink, events) = ChannelSink::new();
        let file_active = ActiveFlag::new(true);
        let power_active = ActiveFlag::new(true);
        let ctx = DispatchCtx {
            store: ArtifactStore::new(dir.path(), Box::new(IdentityDecompressor)),
            sink: Arc::new(sink),
            mode,
            protocol,
        };
        let dispatcher = Dispatcher::new(
            ChannelProcessor::new(file_rx, file_active.clone(), FileRole::default()),
            ChannelProcessor::new(power_rx, power_active.clone(), PowerRole::default()),
            ctx,
        );
        Rig {
            file_tx,
            power_tx,
            file_active,
            power_active,
            events,
            dispatcher,
            _dir: dir,
        }
    }

    fn push_text(tx: &ChannelSender, transport: Transport, line: &str) {
        tx.push_chunk(transport, Bytes::copy_from_slice(line.as_bytes()))
            .unwrap();
    }

    #[tokio::test]
    async fn routes_interleaved_channels_without_cross_talk() {
        let mut r = rig(RunMode::Single, Transport::Ble);

        push_text(&r.file_tx, Transport::Ble, "FILE_START:1:ppg_1.csv:6");
        push_text(&r.power_tx, Transport::Ble, "POWER_LOGS_START");
        r.file_tx
            .push_chunk(Transport::Ble, Bytes::from_static(&[0xff, 0x01, 0x02]))
            .unwrap();
        push_text(&r.power_tx, Transport::Ble, "1,Compression,3300,120,0.05,200");
        r.file_tx
            .push_chunk(Transport::Ble, Bytes::from_static(&[0xfe, 0x03, 0x04]))
            .unwrap();
        push_text(&r.power_tx, Transport::Ble, "POWER_LOGS_END");
        push_text(&r.file_tx, Transport::Ble, "FILE_END");

        r.file_active.set(false);
        r.power_active.set(false);
        r.dispatcher.run().await;

        let mut statuses = Vec::new();
        let mut summaries = Vec::new();
        while let Ok(event) = r.events.try_recv() {
            match event {
                UiEvent::Status(s) => statuses.push(s),
                UiEvent::Summary(s) => summaries.push(s),
                UiEvent::PowerLog(_) => {}
            }
        }
        assert!(statuses
            .iter()
            .any(|s| s == "Receiving file 1: ppg_1.csv via BLE"));
        assert!(statuses.iter().any(|s| s.starts_with("Decompressed file 1")));
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].compression_energy_mwh, 0.05);
    }

    #[tokio::test]
    async fn drops_file_traffic_from_deselected_transport() {
        let mut r = rig(RunMode::Single, Transport::Wifi);

        // BLE traffic while Wi-Fi is selected: markers and chunks ignored.
        push_text(&r.file_tx, Transport::Ble, "FILE_START:9:ppg_9.csv:3");
        r.file_tx
            .push_chunk(Transport::Ble, Bytes::from_static(&[0xff, 0xff]))
            .unwrap();
        // Wi-Fi transfer proceeds normally.
        push_text(&r.file_tx, Transport::Wifi, "FILE_START:2:ppg_2.csv:3");
        r.file_tx
            .push_chunk(Transport::Wifi, Bytes::from_static(&[0x80, 0x81]))
            .unwrap();
        push_text(&r.file_tx, Transport::Wifi, "FILE_END");

        r.file_active.set(false);
        r.power_active.set(false);
        r.dispatcher.run().await;

        let mut statuses = Vec::new();
        while let Ok(event) = r.events.try_recv() {
            if let UiEvent::Status(s) = event {
                statuses.push(s);
            }
        }
        assert!(!statuses.iter().any(|s| s.contains("file 9")));
        assert!(statuses
            .iter()
            .any(|s| s == "Receiving file 2: ppg_2.csv via WiFi"));
    }

    #[tokio::test]
    async fn informational_lines_surface_with_role_prefix() {
        let mut r = rig(RunMode::Single, Transport::Ble);
        push_text(&r.file_tx, Transport::Ble, "ALL_DONE");
        push_text(&r.power_tx, Transport::Ble, "INA228 ready");
        r.file_active.set(false);
        r.power_active.set(false);
        r.dispatcher.run().await;

        let mut statuses = Vec::new();
        while let Ok(event) = r.events.try_recv() {
            if let UiEvent::Status(s) = event {
                statuses.push(s);
            }
        }
        assert!(statuses.contains(&"S3: ALL_DONE".to_string()));
        assert!(statuses.contains(&"Power: INA228 ready".to_string()));
    }

    #[tokio::test]
    async fn loop_exits_when_flags_clear_and_queues_drain() {
        let r = rig(RunMode::Single, Transport::Ble);
        let file_active = r.file_active.clone();
        let power_active = r.power_active.clone();
        let handle = tokio::spawn(r.dispatcher.run());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_finished());
        file_active.set(false);
        power_active.set(false);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
