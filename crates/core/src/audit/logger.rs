use super::{
    event::{EventOutcome, EventSeverity, EventType, RunEvent},
    traits::RunEventBackend,
};
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// High-level run logger with convenience methods for the event
/// vocabulary of §6/§7: gate decisions, pass completions, and the
/// non-fatal warnings the allocators emit inline.
#[derive(Clone)]
pub struct RunLogger {
    backend: Arc<dyn RunEventBackend>,
    run_id: String,
    forecast_date: chrono::NaiveDate,
}

impl RunLogger {
    pub fn new(backend: Arc<dyn RunEventBackend>, run_id: impl Into<String>, forecast_date: chrono::NaiveDate) -> Self {
        Self {
            backend,
            run_id: run_id.into(),
            forecast_date,
        }
    }

    pub async fn log_event(&self, event: RunEvent) -> Result<()> {
        match event.severity {
            EventSeverity::Info => info!(event_id = %event.id, event_type = %event.event_type, "{}", event.to_log_format()),
            EventSeverity::Warning => warn!(event_id = %event.id, event_type = %event.event_type, "{}", event.to_log_format()),
            EventSeverity::Critical => error!(event_id = %event.id, event_type = %event.event_type, "{}", event.to_log_format()),
        }

        self.backend.store_event(&event).await.map_err(|e| {
            error!(event_id = %event.id, error = %e, "failed to persist run event");
            e
        })
    }

    fn builder(&self, event_type: EventType, description: impl Into<String>) -> super::event::RunEventBuilder {
        RunEvent::builder(event_type, self.run_id.clone(), self.forecast_date, description)
    }

    pub async fn log_run_started(&self) -> Result<()> {
        self.log_event(self.builder(EventType::RunStarted, "allocation run started").build()).await
    }

    pub async fn log_gate_declined(&self, reason: &str) -> Result<()> {
        self.log_event(
            self.builder(EventType::GateDeclined, format!("gate declined: {reason}"))
                .outcome(EventOutcome::Partial)
                .build(),
        )
        .await
    }

    pub async fn log_missing_yield(&self, crop_id: i32, facility_id: i32) -> Result<()> {
        self.log_event(
            self.builder(
                EventType::MissingYieldWarning,
                format!("zero forecast plant sites for crop {crop_id} at facility {facility_id}"),
            )
            .severity(EventSeverity::Warning)
            .metadata("crop_id", serde_json::json!(crop_id))
            .metadata("facility_id", serde_json::json!(facility_id))
            .build(),
        )
        .await
    }

    pub async fn log_planned_transfer_shortfall(&self, product_id: i32, requested: f64, available: f64) -> Result<()> {
        self.log_event(
            self.builder(
                EventType::PlannedTransferShortfall,
                format!("planned transfer of product {product_id} short: requested {requested}, available {available}"),
            )
            .severity(EventSeverity::Warning)
            .metadata("product_id", serde_json::json!(product_id))
            .metadata("requested", serde_json::json!(requested))
            .metadata("available", serde_json::json!(available))
            .build(),
        )
        .await
    }

    pub async fn log_unknown_reference_skipped(&self, reference_kind: &str, reference_id: i32) -> Result<()> {
        self.log_event(
            self.builder(
                EventType::UnknownReferenceSkipped,
                format!("skipped row referencing unknown {reference_kind} id {reference_id}"),
            )
            .severity(EventSeverity::Warning)
            .build(),
        )
        .await
    }

    pub async fn log_pass_completed(&self, pass: &str) -> Result<()> {
        let event_type = if pass == "pending" {
            EventType::PendingPassCompleted
        } else {
            EventType::BaselinePassCompleted
        };
        self.log_event(self.builder(event_type, format!("{pass} pass completed")).build()).await
    }

    pub async fn log_persistence_failure(&self, error: &Error) -> Result<()> {
        self.log_event(
            self.builder(EventType::PersistenceFailure, error.to_string())
                .severity(EventSeverity::Critical)
                .outcome(EventOutcome::Failure)
                .build(),
        )
        .await
    }

    pub async fn log_run_completed(&self) -> Result<()> {
        self.log_event(self.builder(EventType::RunCompleted, "allocation run completed").build()).await
    }
}
