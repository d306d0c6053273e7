//! Decoded telemetry records

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Format used for the local receipt timestamp (millisecond precision).
pub const RECEIPT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Payload key holding the device-supplied timestamp.
pub const DEVICE_TIMESTAMP_FIELD: &str = "timestamp";

/// Serialized key of the local receipt time. A payload field of the same name is replaced.
pub const RECEIPT_TIME_FIELD: &str = "timestamp_local";

/// One decoded frame from the device.
///
/// Fields are kept as an opaque JSON object; the acquisition layer never
/// interprets them. Records are moved (never shared) from the acquisition
/// loop into the buffer and from there to whichever consumer dequeues them.
#[derive(Debug, PartialEq, Serialize)]
pub struct TelemetryRecord {
    #[serde(flatten)]
    fields: Map<String, Value>,

    #[serde(skip)]
    device_timestamp: Option<u64>,

    #[serde(rename = "timestamp_local", serialize_with = "serialize_receipt_time")]
    received_at: DateTime<Local>,
}

impl TelemetryRecord {
    /// Create a record from decoded fields and a receipt time
    pub fn new(mut fields: Map<String, Value>, received_at: DateTime<Local>) -> Self {
        fields.remove(RECEIPT_TIME_FIELD);
        let device_timestamp = fields.get(DEVICE_TIMESTAMP_FIELD).and_then(Value::as_u64);
        Self { fields, device_timestamp, received_at }
    }

    /// Returns the raw field value if present.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Numeric lookup by field name.
    /// Returns None if the field is missing or not a number.
    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// String lookup by field name.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// All decoded fields
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Device-supplied timestamp, if the payload carried one
    pub fn device_timestamp(&self) -> Option<u64> {
        self.device_timestamp
    }

    /// Local time at which the frame was decoded
    pub fn received_at(&self) -> DateTime<Local> {
        self.received_at
    }

    /// Consume the record, returning its fields
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

fn serialize_receipt_time<S: Serializer>(
    time: &DateTime<Local>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.format(RECEIPT_TIME_FORMAT))
}
