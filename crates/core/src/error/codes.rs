use serde::{Deserialize, Serialize};
use std::fmt;

/// Standardized error codes for the allocation core.
///
/// Several of these (`MissingYield`, `PlannedTransferShortfall`,
/// `FullPackOut`) are recorded outcomes per spec §7, not failures — they
/// are surfaced through `tracing` at the call site and never constructed
/// as an `Error`. They live here so metrics and logs share one vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // System (1000-1999)
    InternalError = 1000,
    ConfigurationError = 1001,

    // Persistence (2000-2999)
    DatabaseConnectionError = 2000,
    DatabaseQueryError = 2001,
    DatabaseConstraintViolation = 2002,
    PersistenceWriteFailed = 2003,

    // Validation / reference data (5000-5999)
    ValidationFailed = 5000,
    UnknownReferenceId = 5001,
    InvalidInput = 5002,

    // Domain outcomes (6000-6999) — recorded, not thrown as hard errors
    GateDeclined = 6000,
    MissingYield = 6001,
    PlannedTransferShortfall = 6002,
    FullPackOut = 6003,
}

impl ErrorCode {
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::InternalError | ErrorCode::ConfigurationError => "system",
            ErrorCode::DatabaseConnectionError
            | ErrorCode::DatabaseQueryError
            | ErrorCode::DatabaseConstraintViolation
            | ErrorCode::PersistenceWriteFailed => "persistence",
            ErrorCode::ValidationFailed | ErrorCode::UnknownReferenceId | ErrorCode::InvalidInput => {
                "validation"
            }
            ErrorCode::GateDeclined
            | ErrorCode::MissingYield
            | ErrorCode::PlannedTransferShortfall
            | ErrorCode::FullPackOut => "domain",
        }
    }

    /// Per spec §7: persistence failures propagate and terminate the run
    /// with a nonzero exit; everything else in this taxonomy is either a
    /// logged-and-skipped row, or a recorded outcome, not a hard failure.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorCode::DatabaseConnectionError
                | ErrorCode::DatabaseQueryError
                | ErrorCode::DatabaseConstraintViolation
                | ErrorCode::PersistenceWriteFailed
                | ErrorCode::ConfigurationError
                | ErrorCode::InternalError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
