//! Frame reassembler for bulk file transfers.
//!
//! Recognizes `FILE_START:<id>:<name>:<size>` / `FILE_END` markers embedded
//! in otherwise free-form traffic and accumulates the binary payloads in
//! between. This state machine is the only place that knows whether a given
//! chunk is currently part of a transfer; the transport layer merely
//! classifies chunks as text or binary.

use crate::model::FileTransfer;
use bytes::Bytes;
use tracing::{debug, warn};

/// Reassembler state: either waiting for a start marker or accumulating one
/// transfer. At most one transfer is open per channel.
enum State {
    Idle,
    Receiving(FileTransfer),
}

/// Outcome of feeding one item to the reassembler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameEvent {
    /// The item did not concern framing (text that is not a file marker, or
    /// binary while idle). The caller may still route the text elsewhere.
    NotFraming,
    /// A start marker opened a fresh transfer.
    Started { file_id: u32, filename: String },
    /// A binary chunk was appended to the open transfer.
    Appended { bytes: usize },
    /// `FILE_END` closed the open transfer.
    Completed(FileTransfer),
    /// A start marker arrived while a transfer was open; the old buffer was
    /// discarded. Best-effort behavior, not a fault.
    Abandoned {
        old_file_id: u32,
        new_file_id: u32,
        new_filename: String,
    },
    /// A marker could not be honored (malformed start line, or `FILE_END`
    /// with nothing open). State is unchanged.
    Malformed(String),
}

/// Per-channel file-transfer reassembler.
pub struct FrameReassembler {
    state: State,
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// True while a transfer is accumulating.
    pub fn is_receiving(&self) -> bool {
        matches!(self.state, State::Receiving(_))
    }

    /// Feed one text line. Only `FILE_START:` and `FILE_END` drive
    /// transitions; anything else is `NotFraming`.
    pub fn on_text(&mut self, line: &str) -> FrameEvent {
        if let Some(rest) = line.strip_prefix("FILE_START:") {
            return match parse_start(rest) {
                Ok((file_id, filename, size)) => self.start(file_id, filename, size),
                Err(reason) => {
                    warn!(line, %reason, "malformed FILE_START marker");
                    FrameEvent::Malformed(reason)
                }
            };
        }
        if line == "FILE_END" {
            return match std::mem::replace(&mut self.state, State::Idle) {
                State::Receiving(transfer) => {
                    debug!(
                        file_id = transfer.file_id,
                        bytes = transfer.data.len(),
                        "file transfer complete"
                    );
                    FrameEvent::Completed(transfer)
                }
                State::Idle => {
                    warn!("FILE_END with no transfer open");
                    FrameEvent::Malformed("FILE_END with no transfer open".into())
                }
            };
        }
        FrameEvent::NotFraming
    }

    /// Feed one binary chunk. Appended only while a transfer is open;
    /// otherwise ignored (the firmware occasionally emits stray binary
    /// between transfers).
    pub fn on_binary(&mut self, chunk: &Bytes) -> FrameEvent {
        match &mut self.state {
            State::Receiving(transfer) => {
                transfer.extend(chunk);
                FrameEvent::Appended { bytes: chunk.len() }
            }
            State::Idle => FrameEvent::NotFraming,
        }
    }

    fn start(&mut self, file_id: u32, filename: String, size: u64) -> FrameEvent {
        let fresh = FileTransfer::new(file_id, filename.clone(), size);
        match std::mem::replace(&mut self.state, State::Receiving(fresh)) {
            State::Receiving(old) => {
                warn!(
                    old_file_id = old.file_id,
                    buffered = old.data.len(),
                    new_file_id = file_id,
                    "abandoning open transfer for new FILE_START"
                );
                FrameEvent::Abandoned {
                    old_file_id: old.file_id,
                    new_file_id: file_id,
                    new_filename: filename,
                }
            }
            State::Idle => FrameEvent::Started { file_id, filename },
        }
    }
}

/// Parse the `<id>:<name>:<size>` tail of a start marker.
fn parse_start(rest: &str) -> Result<(u32, String, u64), String> {
    let mut fields = rest.split(':');
    let (Some(id), Some(name), Some(size), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(format!("expected 3 fields after FILE_START:, got '{rest}'"));
    };
    let file_id = id
        .parse::<u32>()
        .map_err(|_| format!("non-integer file id '{id}'"))?;
    let size = size
        .parse::<u64>()
        .map_err(|_| format!("non-integer size '{size}'"))?;
    Ok((file_id, name.to_string(), size))
}
