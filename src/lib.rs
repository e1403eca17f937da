//! # PPG Monitor Core Library
//!
//! This crate is the ingestion core for a two-peripheral embedded test rig:
//! an ESP32-S3 that streams compressed PPG files (over a notification link or
//! a Wi-Fi TCP socket) and a second ESP32 that streams INA228 power telemetry
//! (waveform samples and power-log records) over its own notification link.
//! The core reassembles framed file transfers, parses line-oriented records,
//! computes per-session energy statistics, and persists the resulting
//! artifacts. The windowed UI, the wireless stack, and the real decompression
//! algorithms live outside this crate and are reached only through the traits
//! defined here.
//!
//! ## Crate Structure
//!
//! - **`channel`**: channel identities, payload classification (text vs.
//!   binary), and the per-channel queue endpoints shared by the transport
//!   adapters and the dispatch loop.
//! - **`model`**: the data model — file transfers, waveform samples and runs,
//!   power-log records, and run summaries.
//! - **`ingest`**: the two per-channel state machines: the frame reassembler
//!   for bulk file transfers and the record parser for telemetry lines.
//! - **`aggregate`**: pure per-session energy statistics over power-log
//!   records.
//! - **`dispatch`**: the single-consumer loop that drains both channel queues
//!   and owns all parser state.
//! - **`transport`**: the TCP file listener and the notification-callback
//!   adapter, each feeding one channel queue.
//! - **`command`**: the outbound command vocabulary and the write-endpoint
//!   trait implemented by the wireless stack.
//! - **`persist`**: artifact writers and the opaque decompression seam.
//! - **`sink`**: fire-and-forget event fan-out toward whatever frontend is
//!   attached.
//! - **`config`**: TOML-backed application settings.
//! - **`error`**: the crate-wide `MonitorError` type.
//! - **`logging`**: tracing subscriber initialization.

pub mod aggregate;
pub mod channel;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod persist;
pub mod sink;
pub mod transport;
