#![allow(dead_code)]

use application::{BridgeSettings, PrinterBridge};
use domain::command::PayloadLimits;
use domain::{BridgeEvent, DeviceInfo};
use infrastructure::config::SimulatorConfig;
use infrastructure::{ChannelEventPublisher, SimulatedPrinter, SimulatedScanner};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub fn settings() -> BridgeSettings {
    BridgeSettings {
        connect_timeout: Duration::from_secs(1),
        command_timeout: Duration::from_secs(5),
        check_status: true,
        limits: PayloadLimits::default(),
        discovery_timeout: None,
        stop_retry_limit: 3,
        stop_retry_delay: Duration::from_millis(1),
    }
}

/// Printer whose jobs only finish when the test says so
pub fn manual_printer() -> SimulatedPrinter {
    SimulatedPrinter::new(SimulatorConfig {
        complete_jobs: false,
        ..Default::default()
    })
}

pub fn idle_scanner() -> SimulatedScanner {
    SimulatedScanner::new(Vec::new(), Duration::from_millis(10))
}

pub fn bridge_with(
    printer: SimulatedPrinter,
    scanner: SimulatedScanner,
    settings: BridgeSettings,
) -> (PrinterBridge, mpsc::UnboundedReceiver<BridgeEvent>) {
    let (publisher, events) = ChannelEventPublisher::new();
    let bridge = PrinterBridge::new(
        Box::new(printer),
        Box::new(scanner),
        Arc::new(publisher),
        settings,
    );
    (bridge, events)
}

pub fn device(name: &str, target: &str) -> DeviceInfo {
    DeviceInfo {
        device_name: name.to_string(),
        target: target.to_string(),
        ..Default::default()
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Next event, failing the test if none arrives in time
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<BridgeEvent>) -> BridgeEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event expected")
        .expect("event channel open")
}

/// Poll `check` until it holds
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}
