use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a single allocation run, one per forecast date under normal
/// operation (§6: the run is expected to execute once per calendar day).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of an allocation run, adapted from the teacher's `JobState` to
/// the two-pass (baseline, pending) lifecycle of §4.8 instead of a
/// generic worker-queue job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    GateDeclined,
    Running,
    BaselineComplete,
    PendingComplete,
    Failed,
}

/// Outcome recorded once a run concludes (§7 taxonomy: gate-declined is
/// not a failure, persistence failure is the only fatal outcome).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunOutcome {
    GateDeclined { reason: String },
    Completed,
    Failed { error: String },
}

impl RunOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Failed { .. } => 1,
            RunOutcome::GateDeclined { .. } | RunOutcome::Completed => 0,
        }
    }
}

/// Status record for a single run, tracked for the run log and for
/// diagnosing a prior day's execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub id: RunId,
    pub forecast_date: NaiveDate,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: Option<RunOutcome>,
}

impl RunStatus {
    pub fn new(forecast_date: NaiveDate) -> Self {
        Self {
            id: RunId::new(),
            forecast_date,
            state: RunState::Running,
            started_at: Utc::now(),
            completed_at: None,
            outcome: None,
        }
    }

    pub fn decline_gate(mut self, reason: impl Into<String>) -> Self {
        self.state = RunState::GateDeclined;
        self.completed_at = Some(Utc::now());
        self.outcome = Some(RunOutcome::GateDeclined { reason: reason.into() });
        self
    }

    pub fn mark_baseline_complete(&mut self) {
        self.state = RunState::BaselineComplete;
    }

    pub fn mark_pending_complete(&mut self) {
        self.state = RunState::PendingComplete;
        self.completed_at = Some(Utc::now());
        self.outcome = Some(RunOutcome::Completed);
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.state = RunState::Failed;
        self.completed_at = Some(Utc::now());
        self.outcome = Some(RunOutcome::Failed { error: error.into() });
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RunState::GateDeclined | RunState::PendingComplete | RunState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_declined_run_is_not_fatal() {
        let status = RunStatus::new(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()).decline_gate("allocation already run today");
        assert!(status.is_terminal());
        assert_eq!(status.outcome.unwrap().exit_code(), 0);
    }

    #[test]
    fn failed_run_is_fatal() {
        let mut status = RunStatus::new(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        status.mark_failed("persistence write failed");
        assert!(status.outcome.unwrap().is_fatal());
    }
}
