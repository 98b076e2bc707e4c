#![forbid(unsafe_code)]

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRow {
    pub seq: i64,
    pub ts_ms: i64,
    pub event_type: String,
    pub payload_json: String,
}

impl EventRow {
    pub fn event_id(&self) -> String {
        format!("evt_{:016}", self.seq)
    }
}

/// Receipt for an executed plan. `events` holds the telemetry rows written
/// in the execution transaction: one per mutation, then the plan summary.
#[derive(Clone, Debug)]
pub struct AppliedPlan {
    pub plan_id: String,
    pub mutations_applied: usize,
    pub events: Vec<EventRow>,
}

#[derive(Clone, Debug)]
pub struct UndoApplied {
    pub plan_id: String,
    pub mutations_applied: usize,
    pub event: EventRow,
}
