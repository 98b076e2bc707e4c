#![forbid(unsafe_code)]

use mesh_storage::EventRow;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Renders persisted event rows for observers: opaque cursor id, RFC 3339
/// timestamp, parsed payload.
pub fn event_feed_json(rows: &[EventRow]) -> Value {
    Value::Array(
        rows.iter()
            .map(|row| {
                json!({
                    "id": row.event_id(),
                    "ts": ts_ms_to_rfc3339(row.ts_ms),
                    "type": row.event_type,
                    "payload": serde_json::from_str::<Value>(&row.payload_json)
                        .unwrap_or(Value::Null),
                })
            })
            .collect(),
    )
}

fn ts_ms_to_rfc3339(ts_ms: i64) -> String {
    let nanos = (ts_ms as i128) * 1_000_000i128;
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    dt.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
