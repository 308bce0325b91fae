use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Severity levels for run events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

/// Lifecycle events of a single allocation run (§6, §7). These are the
/// vocabulary written to the run log, distinct from the `ErrorCode`
/// taxonomy — a `GateDeclined` run event is emitted even though it is
/// explicitly not an `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    RunStarted,
    GateDeclined,
    InventoryStatusMarked,
    BaselinePassCompleted,
    PendingPassCompleted,
    MissingYieldWarning,
    PlannedTransferShortfall,
    UnknownReferenceSkipped,
    FullPackOut,
    PersistenceFailure,
    RunCompleted,
}

/// A single entry in the allocation run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub id: String,
    pub event_type: EventType,
    pub severity: EventSeverity,
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
    pub forecast_date: chrono::NaiveDate,
    pub description: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub outcome: EventOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    Success,
    Failure,
    Partial,
}

impl std::fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventOutcome::Success => write!(f, "success"),
            EventOutcome::Failure => write!(f, "failure"),
            EventOutcome::Partial => write!(f, "partial"),
        }
    }
}

pub struct RunEventBuilder {
    event: RunEvent,
}

impl RunEventBuilder {
    pub fn new(event_type: EventType, run_id: impl Into<String>, forecast_date: chrono::NaiveDate, description: impl Into<String>) -> Self {
        Self {
            event: RunEvent {
                id: Uuid::new_v4().to_string(),
                event_type,
                severity: EventSeverity::Info,
                timestamp: Utc::now(),
                run_id: run_id.into(),
                forecast_date,
                description: description.into(),
                metadata: HashMap::new(),
                outcome: EventOutcome::Success,
            },
        }
    }

    pub fn severity(mut self, severity: EventSeverity) -> Self {
        self.event.severity = severity;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.event.metadata.insert(key.into(), value);
        self
    }

    pub fn outcome(mut self, outcome: EventOutcome) -> Self {
        self.event.outcome = outcome;
        self
    }

    pub fn build(self) -> RunEvent {
        self.event
    }
}

impl RunEvent {
    pub fn builder(
        event_type: EventType,
        run_id: impl Into<String>,
        forecast_date: chrono::NaiveDate,
        description: impl Into<String>,
    ) -> RunEventBuilder {
        RunEventBuilder::new(event_type, run_id, forecast_date, description)
    }

    pub fn should_alert(&self) -> bool {
        matches!(self.severity, EventSeverity::Critical) || matches!(self.outcome, EventOutcome::Failure)
    }

    pub fn to_log_format(&self) -> String {
        format!(
            "[{}] {} run={} date={}: {}",
            self.severity, self.event_type, self.run_id, self.forecast_date, self.description
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
