//! Push-style view of the record buffer.
//!
//! Each poll window yields either the next record or a heartbeat, so a
//! downstream sink (an event stream, a websocket) can tell "no data yet"
//! from "connection gone". The stream ends once the manager disconnects.

use futures::Stream;
use futures::stream;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::connection::ConnectionManager;
use crate::types::TelemetryRecord;

/// One item of the live feed.
///
/// Serialized adjacently tagged (`{"type": "record", "data": {..}}`) so
/// payload fields never collide with the tag.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum FeedEvent {
    Record(TelemetryRecord),
    /// A poll window elapsed with nothing buffered
    Heartbeat,
}

impl FeedEvent {
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, FeedEvent::Heartbeat)
    }

    pub fn into_record(self) -> Option<TelemetryRecord> {
        match self {
            FeedEvent::Record(record) => Some(record),
            FeedEvent::Heartbeat => None,
        }
    }
}

/// Drain `manager`'s buffer as a stream, waiting at most `poll` per item.
///
/// Records are consumed: they are not seen by other `pop` callers.
pub fn live_feed(
    manager: Arc<ConnectionManager>,
    poll: Duration,
) -> impl Stream<Item = FeedEvent> + Send + 'static {
    stream::unfold(manager, move |manager| async move {
        if !manager.is_connected() {
            debug!("Live feed ended: not connected");
            return None;
        }

        let event = match manager.pop(poll).await {
            Some(record) => FeedEvent::Record(record),
            None if manager.is_connected() => FeedEvent::Heartbeat,
            None => return None,
        };

        Some((event, manager))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcquisitionConfig;
    use crate::decoder::FrameDecoder;
    use crate::transports::MockConnector;
    use crate::types::PortDescriptor;
    use futures::StreamExt;

    async fn connected() -> (Arc<ConnectionManager>, Arc<MockConnector>) {
        let connector =
            Arc::new(MockConnector::with_ports([PortDescriptor::new("COM3", "Arduino Uno")]));
        let manager = Arc::new(ConnectionManager::new(
            Arc::clone(&connector),
            AcquisitionConfig::default().without_delays(),
        ));
        manager.connect(None).await.expect("connect");
        (manager, connector)
    }

    #[tokio::test]
    async fn ends_immediately_when_disconnected() {
        let manager = Arc::new(ConnectionManager::new(
            MockConnector::new(),
            AcquisitionConfig::default().without_delays(),
        ));
        let events: Vec<_> = live_feed(manager, Duration::from_millis(10)).collect().await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn yields_records_then_heartbeats() {
        let (manager, connector) = connected().await;
        let (_, handle) = connector.last_opened().expect("opened");
        handle.push_line(r#"{"rms":0.7}"#);
        manager.start_capture().await.expect("start");

        let mut feed = Box::pin(live_feed(Arc::clone(&manager), Duration::from_millis(200)));

        let first = feed.next().await.expect("feed alive").into_record().expect("record first");
        assert_eq!(first.f64("rms"), Some(0.7));
        assert!(feed.next().await.expect("feed alive").is_heartbeat());

        manager.disconnect().await;
        assert!(feed.next().await.is_none());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let heartbeat = serde_json::to_value(FeedEvent::Heartbeat).expect("serialize");
        assert_eq!(heartbeat, serde_json::json!({ "type": "heartbeat" }));
    }

    #[test]
    fn payload_type_field_does_not_clash_with_tag() {
        let record = FrameDecoder::new()
            .decode(r#"{"type":"accel","rms":0.3}"#)
            .into_record()
            .expect("frame decodes");

        let text = serde_json::to_string(&FeedEvent::Record(record)).expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(value["type"], "record");
        assert_eq!(value["data"]["type"], "accel");
        assert_eq!(value["data"]["rms"], 0.3);
        assert_eq!(text.matches("\"type\"").count(), 2);
    }
}
