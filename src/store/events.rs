//! Best-effort match event persistence
//!
//! Sinks never block the caller and never report failure back to it. A
//! sink that is down only costs history, not gameplay.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::supabase::SupabaseClient;

/// Table the REST sink writes to
pub const MATCH_EVENTS_TABLE: &str = "match_events";

/// Kind of persisted event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Input,
    Resolved,
}

/// One persisted row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchEventRecord {
    pub match_id: Uuid,
    pub turn_index: u32,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl MatchEventRecord {
    pub fn new<T: Serialize>(match_id: Uuid, turn_index: u32, kind: EventKind, payload: &T) -> Self {
        let payload = serde_json::to_value(payload).unwrap_or_else(|e| {
            warn!(match_id = %match_id, error = %e, "Failed to encode event payload");
            serde_json::Value::Null
        });

        Self {
            match_id,
            turn_index,
            kind,
            payload,
            recorded_at: Utc::now(),
        }
    }
}

/// Fire-and-forget receiver of match events
pub trait EventSink: Send + Sync {
    fn record(&self, record: MatchEventRecord);
}

/// Sink used when no persistence is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, record: MatchEventRecord) {
        debug!(
            match_id = %record.match_id,
            turn = record.turn_index,
            kind = ?record.kind,
            "Event not persisted (no sink configured)"
        );
    }
}

/// Keeps records in memory, mostly for tests and local runs
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<MatchEventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<MatchEventRecord> {
        self.records.lock().clone()
    }

    pub fn records_for(&self, match_id: Uuid) -> Vec<MatchEventRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.match_id == match_id)
            .cloned()
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, record: MatchEventRecord) {
        self.records.lock().push(record);
    }
}

/// Queues records for a background task that posts them over REST
#[derive(Clone)]
pub struct RestEventSink {
    tx: mpsc::Sender<MatchEventRecord>,
}

impl RestEventSink {
    /// Spawn the writer task. Must be called inside a tokio runtime.
    pub fn spawn(client: SupabaseClient, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<MatchEventRecord>(capacity.max(1));

        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = client.insert(MATCH_EVENTS_TABLE, &record).await {
                    warn!(
                        match_id = %record.match_id,
                        turn = record.turn_index,
                        kind = ?record.kind,
                        error = %e,
                        "Failed to persist match event"
                    );
                }
            }
            debug!("Event sink writer stopped");
        });

        Self { tx }
    }
}

impl EventSink for RestEventSink {
    fn record(&self, record: MatchEventRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(record)) => {
                warn!(match_id = %record.match_id, "Event sink backlog full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                warn!(match_id = %record.match_id, "Event sink closed, dropping event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_type_tag() {
        let record = MatchEventRecord::new(Uuid::nil(), 4, EventKind::Resolved, &serde_json::json!({"a": 1}));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "resolved");
        assert_eq!(json["turn_index"], 4);
        assert_eq!(json["payload"]["a"], 1);
    }

    #[test]
    fn test_memory_sink_filters_by_match() {
        let sink = MemorySink::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        sink.record(MatchEventRecord::new(a, 0, EventKind::Input, &1));
        sink.record(MatchEventRecord::new(b, 0, EventKind::Input, &2));
        sink.record(MatchEventRecord::new(a, 0, EventKind::Resolved, &3));
        assert_eq!(sink.records().len(), 3);
        assert_eq!(sink.records_for(a).len(), 2);
    }

    async fn wait_for_empty_backlog(sink: &RestEventSink) -> bool {
        for _ in 0..250 {
            if sink.tx.capacity() == sink.tx.max_capacity() {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_rest_sink_survives_unreachable_endpoint() {
        // Nothing listens on this port; every insert fails
        let sink = RestEventSink::spawn(SupabaseClient::new("http://127.0.0.1:9", "key"), 1);

        // A burst beyond the backlog is dropped without blocking the caller
        for turn in 0..10 {
            sink.record(MatchEventRecord::new(Uuid::nil(), turn, EventKind::Input, &turn));
        }
        assert!(wait_for_empty_backlog(&sink).await);

        // The writer picks up the next record only after its failed insert
        sink.record(MatchEventRecord::new(Uuid::nil(), 10, EventKind::Resolved, &10));
        assert!(
            wait_for_empty_backlog(&sink).await,
            "writer stopped after a failed insert"
        );
        assert!(!sink.tx.is_closed());
    }
}
