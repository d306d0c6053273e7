//! End-to-end acquisition through the public API
//!
//! Drives a scripted device through connect, capture, consumption and
//! disconnect, the way an application front end would.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use vibrawatch::{
    AcquisitionConfig, AcquisitionError, ConnectionManager, ConnectionState, FeedEvent,
    MockConnector, PortDescriptor, StartOutcome, live_feed,
};

fn device() -> Vec<PortDescriptor> {
    vec![
        PortDescriptor::new("/dev/ttyS0", "ttyS0"),
        PortDescriptor::new("/dev/ttyACM0", "Arduino Mega 2560"),
    ]
}

fn config(capacity: usize) -> AcquisitionConfig {
    AcquisitionConfig { buffer_capacity: capacity, ..AcquisitionConfig::default() }.without_delays()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn experiment_session() {
    let _ = tracing_subscriber::fmt::try_init();

    let connector = Arc::new(MockConnector::with_ports(device()));
    connector.set_banner(["VibroSensor boot OK"]);
    let manager = ConnectionManager::new(Arc::clone(&connector), config(100));

    // Lists ports and picks the Arduino
    assert_eq!(manager.enumerate_ports().expect("enumerate").len(), 2);
    let port = manager.connect(None).await.expect("auto-detect");
    assert_eq!(port, "/dev/ttyACM0");

    let (_, device) = connector.last_opened().expect("device opened");
    for i in 0..20 {
        let rms = i as f64 / 100.0;
        device.push_line(format!(r#"{{"rms":{rms},"max":{i},"timestamp":{}}}"#, i * 10));
    }
    device.push_line("{\"rms\":");
    device.push_line("{not json}");

    assert_eq!(manager.start_capture().await.expect("start"), StartOutcome::Started);

    let records = manager.pop_batch(20, Duration::from_secs(3)).await;
    assert_eq!(records.len(), 20);
    let stamps: Vec<u64> = records.iter().filter_map(|r| r.device_timestamp()).collect();
    assert_eq!(stamps, (0..20).map(|i| i * 10).collect::<Vec<u64>>());

    // Serialized form is what a front end would receive
    let json = serde_json::to_value(&records[5]).expect("serialize record");
    assert_eq!(json["max"], 5);
    assert!(json["timestamp_local"].is_string());

    let status = manager.status();
    assert_eq!(status.state, ConnectionState::Capturing);
    assert_eq!(status.port.as_deref(), Some("/dev/ttyACM0"));

    manager.disconnect().await;
    let status = manager.status();
    assert_eq!(status.state, ConnectionState::Disconnected);
    assert_eq!(status.stats.received, 20);
    assert_eq!(status.stats.lost, 1);
    assert_eq!(status.stats.ignored, 1);
    assert!(!device.is_open());
}

#[tokio::test]
async fn slow_consumer_sees_newest_records() {
    let connector = Arc::new(MockConnector::with_ports(device()));
    let manager = ConnectionManager::new(Arc::clone(&connector), config(5));
    manager.connect(Some("/dev/ttyACM0")).await.expect("connect");

    let (_, device) = connector.last_opened().expect("device opened");
    device.push_lines((0..50).map(|n| format!(r#"{{"n":{n}}}"#)));
    manager.start_capture().await.expect("start");

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while manager.status().stats.received < 50 {
        assert!(std::time::Instant::now() < deadline, "worker did not drain the device");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    manager.stop_capture().await;

    let kept: Vec<f64> = manager
        .pop_batch(10, Duration::from_millis(50))
        .await
        .iter()
        .filter_map(|r| r.f64("n"))
        .collect();
    assert_eq!(kept, vec![45.0, 46.0, 47.0, 48.0, 49.0]);
    assert_eq!(manager.status().stats.dropped, 45);
    manager.disconnect().await;
}

#[tokio::test]
async fn live_feed_follows_the_connection() {
    let connector = Arc::new(MockConnector::with_ports(device()));
    let manager = Arc::new(ConnectionManager::new(Arc::clone(&connector), config(10)));
    manager.connect(None).await.expect("connect");
    connector.last_opened().expect("opened").1.push_lines([r#"{"rms":0.1}"#, r#"{"rms":0.2}"#]);
    manager.start_capture().await.expect("start");

    let events: Vec<FeedEvent> =
        live_feed(Arc::clone(&manager), Duration::from_millis(500)).take(2).collect().await;
    let rms: Vec<f64> =
        events.into_iter().filter_map(FeedEvent::into_record).filter_map(|r| r.f64("rms")).collect();
    assert_eq!(rms, vec![0.1, 0.2]);

    manager.disconnect().await;
    assert_eq!(live_feed(manager, Duration::from_millis(10)).count().await, 0);
}

#[tokio::test]
async fn unplugged_device_is_reported() {
    let connector = Arc::new(MockConnector::new());
    let manager = ConnectionManager::new(Arc::clone(&connector), config(10));

    let err = manager.connect(None).await.expect_err("no device present");
    assert!(matches!(err, AcquisitionError::NoPortSelected { .. }));
    assert!(!err.recovery_suggestions().is_empty());
    assert!(matches!(manager.start_capture().await, Err(AcquisitionError::NotConnected)));
}
