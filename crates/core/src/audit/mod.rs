pub mod event;
pub mod logger;
pub mod repository;
pub mod traits;

pub use event::{EventOutcome, EventSeverity, EventType, RunEvent};
pub use logger::RunLogger;
pub use repository::DatabaseRunEventRepository;
pub use traits::{BackendHealth, CdcRecord, RunEventBackend, RunEventFilter};
