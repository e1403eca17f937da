//! Per-channel ingestion state machines.
//!
//! Two state machines interpret the interleaved text/binary traffic coming
//! off a channel queue: `frame::FrameReassembler` recognizes bulk
//! file-transfer framing, and `records::RecordParser` classifies
//! comma-delimited telemetry lines. Both return explicit event values for
//! every input so that each drop path is observable and testable; neither
//! ever panics on malformed traffic.

pub mod frame;
pub mod records;
