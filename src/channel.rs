//! Channel identities, payload classification, and queue endpoints.
//!
//! Each peripheral is one logical channel with its own FIFO queue. Transport
//! adapters are the only producers; the dispatch loop is the only consumer.
//! The queues are unbounded because loss is unacceptable while back-pressure
//! is tolerable, and an unbounded send never blocks the wireless stack's
//! callback thread.

use crate::error::{AppResult, MonitorError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One logical telemetry/file source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelId {
    /// The ESP32-S3 streaming compressed PPG files.
    BulkFile,
    /// The INA228-carrying ESP32 streaming power telemetry.
    PowerTelemetry,
}

impl ChannelId {
    /// Short label used in diagnostics, matching the rig's naming.
    pub fn label(self) -> &'static str {
        match self {
            ChannelId::BulkFile => "S3",
            ChannelId::PowerTelemetry => "Power",
        }
    }
}

/// The transport a chunk arrived on. File-transfer items are gated on this
/// matching the session's selected protocol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    #[default]
    Ble,
    Wifi,
}

/// A classified chunk payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// The chunk decoded as UTF-8; carried trimmed of surrounding whitespace.
    Text(String),
    /// The chunk failed UTF-8 decoding; carried verbatim.
    Binary(Bytes),
}

/// One unit of data off a transport, as handed to the dispatch loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelItem {
    pub channel: ChannelId,
    pub transport: Transport,
    pub payload: Payload,
}

/// Classify a received chunk as a control/data line or raw binary.
///
/// Any chunk that decodes as UTF-8 is treated as text; decode failure
/// degrades to binary unconditionally and is never an error. This mirrors
/// the firmware's framing, where control lines are always valid UTF-8 and
/// compressed payloads frequently are not.
pub fn classify_chunk(data: Bytes) -> Payload {
    match std::str::from_utf8(&data) {
        Ok(text) => Payload::Text(text.trim().to_string()),
        Err(_) => Payload::Binary(data),
    }
}

/// Producer half of a channel queue, held by a transport adapter.
#[derive(Clone)]
pub struct ChannelSender {
    channel: ChannelId,
    tx: mpsc::UnboundedSender<ChannelItem>,
}

impl ChannelSender {
    /// Classify and enqueue one received chunk.
    pub fn push_chunk(&self, transport: Transport, data: Bytes) -> AppResult<()> {
        self.push_item(ChannelItem {
            channel: self.channel,
            transport,
            payload: classify_chunk(data),
        })
    }

    pub fn push_item(&self, item: ChannelItem) -> AppResult<()> {
        self.tx
            .send(item)
            .map_err(|_| MonitorError::ChannelClosed(self.channel.label()))
    }
}

/// Consumer half of a channel queue, held by the dispatch loop.
pub struct ChannelReceiver {
    pub channel: ChannelId,
    pub rx: mpsc::UnboundedReceiver<ChannelItem>,
}

/// Create the queue for one channel.
pub fn channel_queue(channel: ChannelId) -> (ChannelSender, ChannelReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSender { channel, tx }, ChannelReceiver { channel, rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_chunk_classifies_as_trimmed_text() {
        let payload = classify_chunk(Bytes::from_static(b"FILE_END\r\n"));
        assert_eq!(payload, Payload::Text("FILE_END".into()));
    }

    #[test]
    fn non_utf8_chunk_classifies_as_binary() {
        let raw = Bytes::from_static(&[0xff, 0xfe, 0x00, 0x41]);
        let payload = classify_chunk(raw.clone());
        assert_eq!(payload, Payload::Binary(raw));
    }

    #[tokio::test]
    async fn queue_preserves_fifo_order() {
        let (tx, mut rx) = channel_queue(ChannelId::PowerTelemetry);
        tx.push_chunk(Transport::Ble, Bytes::from_static(b"first")).unwrap();
        tx.push_chunk(Transport::Ble, Bytes::from_static(b"second")).unwrap();
        let a = rx.rx.recv().await.unwrap();
        let b = rx.rx.recv().await.unwrap();
        assert_eq!(a.payload, Payload::Text("first".into()));
        assert_eq!(b.payload, Payload::Text("second".into()));
    }
}
