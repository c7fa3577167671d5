use anyhow::{Result, bail};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::PrinterBridge;
use bridge_host::{CommandHost, ConnectDefaults, HostOutput, forward_events};
use domain::driver::DriverType;
use domain::event::EventPublisher;
use infrastructure::config::BridgeConfig;
use infrastructure::messaging::{
    ChannelEventPublisher, CompositeEventPublisher, TracingEventPublisher,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Override driver type (Simulator, Network, File)
    #[arg(long)]
    driver: Option<String>,

    /// Override default TCP port of the network driver
    #[arg(long)]
    port: Option<u16>,

    /// Override output file of the file driver
    #[arg(long)]
    path: Option<String>,

    /// Write bridge events to stdout next to command results
    #[arg(long)]
    emit_events: bool,
}

fn parse_driver(name: &str) -> Result<DriverType> {
    match name.to_ascii_lowercase().as_str() {
        "simulator" => Ok(DriverType::Simulator),
        "network" => Ok(DriverType::Network),
        "file" => Ok(DriverType::File),
        other => bail!("unknown driver type '{}'", other),
    }
}

async fn run() -> Result<()> {
    dotenv().ok();

    // Logs go to stderr, stdout carries the protocol
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,application=debug,bridge_host=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("🖨️ ePOS Printer Bridge Starting...");
    info!("🆔 Process ID: {}", std::process::id());

    let args = Args::parse();

    info!("📂 Config directory: {}", args.config_dir);
    let mut config = BridgeConfig::load(&args.config_dir)?;

    if let Some(driver) = args.driver.as_deref() {
        config.driver.r#type = parse_driver(driver)?;
    }
    if let Some(port) = args.port {
        config.driver.port = port;
    }
    if let Some(path) = args.path {
        config.driver.path = Some(path);
    }
    info!(driver = config.driver.r#type.as_str(), "✅ Configuration loaded");

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<HostOutput>();

    let mut publishers: Vec<Arc<dyn EventPublisher>> = vec![Arc::new(TracingEventPublisher)];
    if args.emit_events {
        let (channel, events) = ChannelEventPublisher::new();
        publishers.push(Arc::new(channel));
        tokio::spawn(forward_events(events, out_tx.clone()));
    }
    let publisher = Arc::new(CompositeEventPublisher::new(publishers));

    let bridge = PrinterBridge::from_config(&config, publisher)?;
    let host = CommandHost::new(
        bridge,
        ConnectDefaults::from_config(&config.session),
        out_tx,
    );

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(output) = out_rx.recv().await {
            let mut line = match serde_json::to_string(&output) {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize host output");
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                warn!(error = %e, "Failed to write to stdout");
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    info!("✅ Bridge ready. Reading commands from stdin...");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let host = host.clone();
                    tokio::spawn(async move { host.handle_line(&line).await });
                }
                Ok(None) => {
                    info!("🔌 Input closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read from stdin");
                    break;
                }
            },
            _ = &mut ctrl_c => {
                info!("🛑 Shutting down...");
                break;
            }
        }
    }

    host.bridge().shutdown().await;
    drop(host);

    // Give pending results a moment to reach stdout
    let _ = tokio::time::timeout(Duration::from_secs(1), writer).await;

    info!("👋 Good bye!");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {:?}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_driver_is_case_insensitive() {
        assert_eq!(parse_driver("network").unwrap(), DriverType::Network);
        assert_eq!(parse_driver("File").unwrap(), DriverType::File);
        assert!(parse_driver("serial").is_err());
    }
}
