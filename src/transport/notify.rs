//! Notification-callback adapter.
//!
//! The wireless stack delivers already-chunked byte payloads through a
//! callback on a thread of its choosing. This adapter classifies each
//! payload and enqueues it; the unbounded queue keeps the callback from
//! ever blocking inside the stack.

use crate::channel::{ChannelSender, Transport};
use crate::dispatch::ActiveFlag;
use bytes::Bytes;
use tracing::{debug, warn};

/// Adapter handed to the wireless stack as the notification callback target.
#[derive(Clone)]
pub struct NotifyAdapter {
    tx: ChannelSender,
    transport: Transport,
    active: ActiveFlag,
}

impl NotifyAdapter {
    pub fn new(tx: ChannelSender, transport: Transport, active: ActiveFlag) -> Self {
        Self {
            tx,
            transport,
            active,
        }
    }

    /// Entry point for the stack's notify callback. Safe to call from any
    /// thread; never blocks and never panics on malformed payloads.
    pub fn on_notify(&self, data: Bytes) {
        if !self.active.is_active() {
            debug!(bytes = data.len(), "notify after channel stopped, dropping");
            return;
        }
        if let Err(e) = self.tx.push_chunk(self.transport, data) {
            // The consumer went away first; nothing to do from the stack's
            // thread but note it.
            warn!(%e, "failed to enqueue notification payload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{channel_queue, ChannelId, Payload};

    #[tokio::test]
    async fn enqueues_classified_payloads_while_active() {
        let (tx, mut rx) = channel_queue(ChannelId::PowerTelemetry);
        let adapter = NotifyAdapter::new(tx, Transport::Ble, ActiveFlag::new(true));
        adapter.on_notify(Bytes::from_static(b"POWER_LOGS_START\n"));
        adapter.on_notify(Bytes::from_static(&[0xff, 0x00]));
        let first = rx.rx.recv().await.unwrap();
        assert_eq!(first.payload, Payload::Text("POWER_LOGS_START".into()));
        let second = rx.rx.recv().await.unwrap();
        assert!(matches!(second.payload, Payload::Binary(_)));
    }

    #[tokio::test]
    async fn drops_payloads_once_deactivated() {
        let (tx, mut rx) = channel_queue(ChannelId::PowerTelemetry);
        let active = ActiveFlag::new(true);
        let adapter = NotifyAdapter::new(tx, Transport::Ble, active.clone());
        active.set(false);
        adapter.on_notify(Bytes::from_static(b"late"));
        assert!(rx.rx.try_recv().is_err());
    }
}
