mod common;

use application::ImageOptions;
use common::*;
use domain::command::{CommandOutcome, CompletionReport, TextJob};
use domain::discovery::DiscoveryFilter;
use domain::driver::ConnectionState;
use domain::printer::{PrinterLanguage, PrinterSeries};
use domain::{BridgeError, BridgeEvent, DriverFault};
use infrastructure::SimulatedScanner;
use infrastructure::config::SimulatorConfig;
use infrastructure::SimulatedPrinter;
use std::time::Duration;
use tokio::sync::mpsc;

const TARGET: &str = "00:11:22";

fn series(id: i32) -> PrinterSeries {
    PrinterSeries::from_id(id).unwrap()
}

#[tokio::test]
async fn test_print_text_completes_exactly_once() {
    let printer = manual_printer();
    let probe = printer.clone();
    let (bridge, mut events) = bridge_with(printer, idle_scanner(), settings());

    let session = bridge
        .connect(TARGET, series(1), PrinterLanguage::from_id(0).unwrap())
        .await
        .unwrap();
    assert_eq!(session.series, PrinterSeries::TmM30);
    assert!(matches!(next_event(&mut events).await, BridgeEvent::SessionOpened { .. }));

    let h1 = bridge.print_text(TextJob::new("HELLO")).await.unwrap();
    let job_id = probe.last_job_id().await.unwrap();
    assert_eq!(bridge.in_flight().await.as_ref(), Some(h1.callback_id()));

    let report = CompletionReport {
        job_id: job_id.clone(),
        bytes_sent: 5,
    };
    probe.finish_job(&job_id, Ok(report.clone())).await;
    // A duplicate hardware notification must not resolve twice
    probe.finish_job(&job_id, Ok(report.clone())).await;

    let callback_id = h1.callback_id().clone();
    assert_eq!(h1.wait().await, CommandOutcome::Completed(report));

    match next_event(&mut events).await {
        BridgeEvent::CommandResolved {
            callback_id: resolved,
            outcome,
            ..
        } => {
            assert_eq!(resolved, callback_id);
            assert_eq!(outcome, "completed");
        }
        other => panic!("unexpected event {:?}", other),
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.try_recv().is_err());
    assert!(bridge.in_flight().await.is_none());
}

#[tokio::test]
async fn test_second_command_while_in_flight_is_busy() {
    let printer = manual_printer();
    let probe = printer.clone();
    let (bridge, _events) = bridge_with(printer, idle_scanner(), settings());
    bridge
        .connect(TARGET, series(1), PrinterLanguage::Ank)
        .await
        .unwrap();

    let _h1 = bridge.print_text(TextJob::new("HELLO")).await.unwrap();
    let second = bridge.print_image(png(8, 4), ImageOptions::default()).await;
    assert!(matches!(second, Err(BridgeError::Busy)));
    assert!(matches!(
        bridge.send_data(vec![0x1B, 0x40]).await,
        Err(BridgeError::Busy)
    ));
    assert_eq!(probe.sent_jobs().await.len(), 1);
}

#[tokio::test]
async fn test_invalid_payload_checked_before_busy() {
    let (bridge, _events) = bridge_with(manual_printer(), idle_scanner(), settings());
    bridge
        .connect(TARGET, series(12), PrinterLanguage::Ank)
        .await
        .unwrap();
    let _h1 = bridge.print_text(TextJob::new("HELLO")).await.unwrap();

    let garbage = bridge
        .print_image(b"not an image".to_vec(), ImageOptions::default())
        .await;
    assert!(matches!(garbage, Err(BridgeError::InvalidPayload(_))));
}

#[tokio::test]
async fn test_dispatch_without_session_never_reaches_driver() {
    let printer = manual_printer();
    let probe = printer.clone();
    let (bridge, _events) = bridge_with(printer, idle_scanner(), settings());

    assert!(matches!(
        bridge.print_text(TextJob::new("HELLO")).await,
        Err(BridgeError::NotConnected)
    ));
    // Not connected wins over a bad payload
    assert!(matches!(
        bridge.print_image(Vec::new(), ImageOptions::default()).await,
        Err(BridgeError::NotConnected)
    ));
    assert!(matches!(
        bridge.send_data(vec![1, 2, 3]).await,
        Err(BridgeError::NotConnected)
    ));
    assert!(probe.sent_jobs().await.is_empty());
}

#[tokio::test]
async fn test_at_most_one_session() {
    let printer = manual_printer();
    let probe = printer.clone();
    let (bridge, _events) = bridge_with(printer, idle_scanner(), settings());

    assert!(matches!(bridge.disconnect().await, Err(BridgeError::NotConnected)));
    bridge
        .connect(TARGET, series(1), PrinterLanguage::Ank)
        .await
        .unwrap();
    assert!(matches!(
        bridge.connect("TCP:10.0.0.9", series(1), PrinterLanguage::Ank).await,
        Err(BridgeError::AlreadyConnected)
    ));
    assert!(matches!(
        bridge.connect(TARGET, series(1), PrinterLanguage::Ank).await,
        Err(BridgeError::AlreadyConnected)
    ));
    assert_eq!(probe.connect_count().await, 1);

    let closed = bridge.disconnect().await.unwrap();
    assert_eq!(closed.target.as_str(), TARGET);
    assert!(matches!(bridge.disconnect().await, Err(BridgeError::NotConnected)));
    assert_eq!(bridge.connection_state().await, ConnectionState::Disconnected);

    bridge
        .connect("TCP:10.0.0.9", series(12), PrinterLanguage::Japanese)
        .await
        .unwrap();
    assert_eq!(bridge.session().await.unwrap().target.as_str(), "TCP:10.0.0.9");
}

#[tokio::test]
async fn test_invalid_target_and_driver_failure() {
    let (bridge, _events) = bridge_with(manual_printer(), idle_scanner(), settings());
    assert!(matches!(
        bridge.connect("", series(1), PrinterLanguage::Ank).await,
        Err(BridgeError::InvalidTarget(_))
    ));
    assert!(matches!(
        bridge.connect("TCP:", series(1), PrinterLanguage::Ank).await,
        Err(BridgeError::InvalidTarget(_))
    ));

    let failing = SimulatedPrinter::new(SimulatorConfig {
        fail_connect_with: Some(4),
        ..Default::default()
    });
    let (bridge, _events) = bridge_with(failing, idle_scanner(), settings());
    assert_eq!(
        bridge
            .connect(TARGET, series(1), PrinterLanguage::Ank)
            .await
            .unwrap_err(),
        BridgeError::DriverError(DriverFault::Code(4))
    );
    assert!(bridge.session().await.is_none());
    assert_eq!(bridge.connection_state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_disconnect_aborts_in_flight_once() {
    let (bridge, mut events) = bridge_with(manual_printer(), idle_scanner(), settings());
    bridge
        .connect(TARGET, series(1), PrinterLanguage::Ank)
        .await
        .unwrap();
    next_event(&mut events).await;

    let h1 = bridge.send_data(vec![0x1B, 0x40]).await.unwrap();
    bridge.disconnect().await.unwrap();

    assert_eq!(
        h1.wait().await,
        CommandOutcome::Aborted(BridgeError::ConnectionLost)
    );
    assert!(matches!(next_event(&mut events).await, BridgeEvent::SessionClosed { .. }));
    match next_event(&mut events).await {
        BridgeEvent::CommandResolved { outcome, detail, .. } => {
            assert_eq!(outcome, "aborted");
            assert!(detail.is_some());
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_connection_loss_tears_session_down() {
    let printer = manual_printer();
    let probe = printer.clone();
    let (bridge, _events) = bridge_with(printer, idle_scanner(), settings());
    bridge
        .connect(TARGET, series(1), PrinterLanguage::Ank)
        .await
        .unwrap();
    let h1 = bridge.print_text(TextJob::new("HELLO")).await.unwrap();

    probe.drop_connection("cable pulled").await;

    assert_eq!(
        h1.wait().await,
        CommandOutcome::Aborted(BridgeError::ConnectionLost)
    );
    eventually(|| async { bridge.session().await.is_none() }).await;
    assert!(matches!(
        bridge.print_text(TextJob::new("AGAIN")).await,
        Err(BridgeError::NotConnected)
    ));
}

#[tokio::test]
async fn test_printer_not_ready_fails_command() {
    let offline = SimulatedPrinter::new(SimulatorConfig {
        offline: true,
        ..Default::default()
    });
    let probe = offline.clone();
    let (bridge, _events) = bridge_with(offline, idle_scanner(), settings());
    bridge
        .connect(TARGET, series(1), PrinterLanguage::Ank)
        .await
        .unwrap();

    let handle = bridge.print_text(TextJob::new("HELLO")).await.unwrap();
    match handle.wait().await {
        CommandOutcome::Failed(BridgeError::NotReady(status)) => assert!(!status.online),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(probe.sent_jobs().await.is_empty());
    assert!(bridge.in_flight().await.is_none());
}

#[tokio::test]
async fn test_driver_reported_failure_keeps_code() {
    let failing = SimulatedPrinter::new(SimulatorConfig {
        fail_jobs_with: Some(9),
        job_latency_ms: 5,
        ..Default::default()
    });
    let (bridge, _events) = bridge_with(failing, idle_scanner(), settings());
    bridge
        .connect(TARGET, series(1), PrinterLanguage::Ank)
        .await
        .unwrap();

    let handle = bridge.send_data(vec![0x0A]).await.unwrap();
    assert_eq!(
        handle.wait().await,
        CommandOutcome::Failed(BridgeError::DriverError(DriverFault::Code(9)))
    );
}

#[tokio::test]
async fn test_image_job_carries_probed_dimensions() {
    let printer = SimulatedPrinter::default();
    let probe = printer.clone();
    let (bridge, _events) = bridge_with(printer, idle_scanner(), settings());
    bridge
        .connect(TARGET, series(1), PrinterLanguage::Ank)
        .await
        .unwrap();

    let handle = bridge
        .print_image(
            png(16, 3),
            ImageOptions {
                cut: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(handle.wait().await.is_success());

    let jobs = probe.sent_jobs().await;
    match &jobs[0].1 {
        domain::CommandPayload::Image(job) => {
            assert_eq!((job.width, job.height), (16, 3));
            assert!(job.cut);
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[tokio::test]
async fn test_discovery_single_active_scan() {
    let (bridge, _events) = bridge_with(manual_printer(), idle_scanner(), settings());
    let (tx, _rx) = mpsc::unbounded_channel();

    let handle = bridge
        .start_discovery(DiscoveryFilter::default(), Box::new(tx.clone()))
        .await
        .unwrap();
    assert!(matches!(
        bridge
            .start_discovery(DiscoveryFilter::default(), Box::new(tx.clone()))
            .await,
        Err(BridgeError::AlreadyInProgress)
    ));

    bridge.stop_discovery(&handle).await.unwrap();
    assert!(matches!(
        bridge.stop_discovery(&handle).await,
        Err(BridgeError::NotInProgress)
    ));

    let again = bridge
        .start_discovery(DiscoveryFilter::default(), Box::new(tx))
        .await
        .unwrap();
    assert_ne!(again, handle);
}

#[tokio::test]
async fn test_no_device_delivered_after_stop() {
    let devices = (1..=50)
        .map(|i| device("TM-T88VI", &format!("TCP:10.0.0.{i}")))
        .collect();
    let scanner = SimulatedScanner::new(devices, Duration::from_millis(2));
    let (bridge, _events) = bridge_with(manual_printer(), scanner, settings());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = bridge
        .start_discovery(DiscoveryFilter::default(), Box::new(tx))
        .await
        .unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap();
    assert!(first.is_some());

    bridge.stop_discovery(&handle).await.unwrap();
    while rx.try_recv().is_ok() {}

    // The sink went away with the scan
    let after = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap();
    assert!(after.is_none());
}

#[tokio::test]
async fn test_discovery_finished_by_driver() {
    let scanner = SimulatedScanner::new(
        vec![
            device("TM-M30", "BT:00:01:90:AA:BB:CC"),
            device("Other", "TCP:10.0.0.3"),
        ],
        Duration::from_millis(5),
    )
    .finish_when_exhausted(true);
    let (bridge, mut events) = bridge_with(manual_printer(), scanner, settings());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = bridge
        .start_discovery(DiscoveryFilter::default(), Box::new(tx))
        .await
        .unwrap();

    let found = rx.recv().await.unwrap();
    assert_eq!(found.device_name, "TM-M30");
    assert!(rx.recv().await.is_none());

    assert!(matches!(next_event(&mut events).await, BridgeEvent::DeviceDiscovered { .. }));
    assert!(matches!(next_event(&mut events).await, BridgeEvent::DiscoveryEnded { .. }));

    // Stopping a scan that already ended is a no-op
    bridge.stop_discovery(&handle).await.unwrap();
    assert!(bridge.active_discovery().await.is_none());
}

#[tokio::test]
async fn test_printer_status_requires_session() {
    let (bridge, _events) = bridge_with(manual_printer(), idle_scanner(), settings());
    assert!(matches!(
        bridge.printer_status().await,
        Err(BridgeError::NotConnected)
    ));
    bridge
        .connect(TARGET, series(1), PrinterLanguage::Ank)
        .await
        .unwrap();
    assert!(bridge.printer_status().await.unwrap().is_printable());
}

#[tokio::test]
async fn test_shutdown_closes_everything() {
    let (bridge, _events) = bridge_with(manual_printer(), idle_scanner(), settings());
    let (tx, _rx) = mpsc::unbounded_channel();
    bridge
        .connect(TARGET, series(1), PrinterLanguage::Ank)
        .await
        .unwrap();
    bridge
        .start_discovery(DiscoveryFilter::default(), Box::new(tx))
        .await
        .unwrap();
    let h1 = bridge.print_text(TextJob::new("BYE")).await.unwrap();

    bridge.shutdown().await;

    assert!(bridge.session().await.is_none());
    assert!(bridge.active_discovery().await.is_none());
    assert_eq!(
        h1.wait().await,
        CommandOutcome::Aborted(BridgeError::ConnectionLost)
    );
}
