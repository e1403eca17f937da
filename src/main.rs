//! CLI entry point for the PPG monitor ingestion core.
//!
//! Runs the core headless: binds the Wi-Fi TCP file listener, starts the
//! dispatch loop, and reports everything through the tracing log. The BLE
//! notification path needs a wireless stack on top of this binary; here the
//! notify adapters exist but nothing feeds them.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use ppg_monitor::channel::{channel_queue, ChannelId, Transport};
use ppg_monitor::config::Settings;
use ppg_monitor::dispatch::{
    ActiveFlag, ChannelProcessor, DispatchCtx, Dispatcher, FileRole, PowerRole,
};
use ppg_monitor::model::RunMode;
use ppg_monitor::persist::{ArtifactStore, IdentityDecompressor};
use ppg_monitor::sink::LogSink;
use ppg_monitor::transport::tcp::TcpFileServer;
use ppg_monitor::{logging, transport::notify::NotifyAdapter};
use std::sync::Arc;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Protocol {
    Ble,
    Wifi,
}

#[derive(Parser)]
#[command(name = "ppg_monitor")]
#[command(about = "Headless ingestion core for the ESP32 PPG compression test rig", long_about = None)]
struct Cli {
    /// Config name under config/ (without extension)
    #[arg(long)]
    config: Option<String>,

    /// Transport selected for file transfers
    #[arg(long, value_enum, default_value_t = Protocol::Wifi)]
    protocol: Protocol,

    /// Repeat count for repeat-mode sessions (1-5); omit for single mode
    #[arg(long)]
    repeat: Option<u8>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new(cli.config.as_deref())?;
    let level = logging::parse_log_level(&settings.log_level).map_err(anyhow::Error::msg)?;
    logging::init(level).map_err(anyhow::Error::msg)?;

    let mode = match cli.repeat {
        Some(n) if (1..=5).contains(&n) => RunMode::Repeat(n),
        Some(n) => anyhow::bail!("repeats must be 1-5, got {n}"),
        None => RunMode::Single,
    };
    let protocol = match cli.protocol {
        Protocol::Ble => Transport::Ble,
        Protocol::Wifi => Transport::Wifi,
    };
    info!(?mode, ?protocol, "starting session");

    let (file_tx, file_rx) = channel_queue(ChannelId::BulkFile);
    let (power_tx, power_rx) = channel_queue(ChannelId::PowerTelemetry);
    let file_active = ActiveFlag::new(true);
    let power_active = ActiveFlag::new(true);

    // Notify adapters for the wireless stack to call into. The stack itself
    // lives outside this binary.
    let _s3_notify = NotifyAdapter::new(file_tx.clone(), Transport::Ble, file_active.clone());
    let _power_notify = NotifyAdapter::new(power_tx, Transport::Ble, power_active.clone());

    let server = TcpFileServer::bind(settings.tcp.port, file_tx, file_active.clone()).await?;
    let server_task = tokio::spawn(server.run());

    let ctx = DispatchCtx {
        store: ArtifactStore::new(
            settings.storage.output_dir.clone(),
            Box::new(IdentityDecompressor),
        ),
        sink: Arc::new(LogSink),
        mode,
        protocol,
    };
    let dispatcher = Dispatcher::new(
        ChannelProcessor::new(file_rx, file_active.clone(), FileRole::default()),
        ChannelProcessor::new(power_rx, power_active.clone(), PowerRole::default()),
        ctx,
    );
    let dispatch_task = tokio::spawn(dispatcher.run());

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    file_active.set(false);
    power_active.set(false);

    dispatch_task.await?;
    server_task.await?;
    Ok(())
}
