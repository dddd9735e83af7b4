//! Live analytics engine
//!
//! Bounded tick buffers, the periodic recompute cycle, snapshot publication
//! and alert evaluation.

mod alert;
mod buffer;
mod orchestrator;
mod snapshot;

pub use alert::{Alert, AlertCondition, AlertDefinition, AlertKind, AlertState};
pub use buffer::{PriceBuffer, TickBuffers, DEFAULT_BUFFER_CAPACITY};
pub use orchestrator::{
    OrchestratorConfig, OrchestratorHandle, RecomputeOrchestrator, SnapshotReceiver,
};
pub use snapshot::{AnalyticsSettings, AnalyticsSnapshot};
