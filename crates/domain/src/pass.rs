//! Two-variant replacement for the boolean `is_pending` parameter that
//! switched output table names in the original design.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pass {
    Baseline,
    Pending,
}

impl Pass {
    /// Table-name suffix this pass writes to.
    pub fn table_suffix(self) -> &'static str {
        match self {
            Pass::Baseline => "",
            Pass::Pending => "_pending",
        }
    }

    pub fn runs_transfer_planning(self) -> bool {
        matches!(self, Pass::Pending)
    }
}
