//! Sequential-accept TCP file listener.
//!
//! The firmware's Wi-Fi path opens one connection per file: a
//! `FILE_START:...` line, raw binary chunks, then a `FILE_END` line, after
//! which this side closes the connection. Connections are processed one at
//! a time; a socket error terminates only the current connection and the
//! listener keeps accepting.

use crate::channel::{classify_chunk, ChannelId, ChannelItem, ChannelSender, Payload, Transport};
use crate::dispatch::ActiveFlag;
use crate::error::AppResult;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// How often the accept loop re-checks the active flag.
const ACCEPT_POLL: Duration = Duration::from_millis(250);

/// Read buffer matching the firmware's send chunking.
const READ_CHUNK: usize = 1024;

/// TCP file server for the Wi-Fi transfer path.
pub struct TcpFileServer {
    listener: TcpListener,
    tx: ChannelSender,
    active: ActiveFlag,
}

impl TcpFileServer {
    /// Bind `0.0.0.0:<port>`.
    pub async fn bind(port: u16, tx: ChannelSender, active: ActiveFlag) -> AppResult<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "TCP file server listening");
        Ok(Self {
            listener,
            tx,
            active,
        })
    }

    /// Local address, useful when binding port 0 in tests.
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections until the channel is deactivated.
    /// One connection is processed fully before the next accept.
    pub async fn run(self) {
        while self.active.is_active() {
            let accepted =
                match tokio::time::timeout(ACCEPT_POLL, self.listener.accept()).await {
                    Ok(Ok((stream, peer))) => Some((stream, peer)),
                    Ok(Err(e)) => {
                        warn!(%e, "TCP accept failed");
                        None
                    }
                    Err(_) => None, // poll timeout, re-check the flag
                };
            let Some((stream, peer)) = accepted else {
                continue;
            };
            debug!(%peer, "TCP connection accepted");
            if let Err(e) = self.serve_connection(stream).await {
                warn!(%peer, %e, "TCP connection error");
            }
        }
        info!("TCP file server stopped");
    }

    /// Read one file's worth of traffic and enqueue it chunk by chunk.
    /// The connection is closed after `FILE_END` (or when the peer hangs
    /// up); interpretation of the markers belongs to the frame reassembler.
    async fn serve_connection(&self, mut stream: TcpStream) -> AppResult<()> {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            let payload = classify_chunk(Bytes::copy_from_slice(&buf[..n]));
            let is_end = matches!(&payload, Payload::Text(line) if line == "FILE_END");
            self.tx.push_item(ChannelItem {
                channel: ChannelId::BulkFile,
                transport: Transport::Wifi,
                payload,
            })?;
            if is_end {
                break;
            }
        }
        Ok(())
    }
}
