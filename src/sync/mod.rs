//! Orchestration between the local snapshot and the remote item store.
//!
//! - [`polling`]: background resynchronization timer with backoff and gates
//! - [`bulk`]: concurrent fan-out of one operation over many items
//! - [`refresh`]: retire-and-recreate of a single item
//! - [`toggle`]: bulk flip of the "read" field
//! - [`handlers`]: complete / delete / refresh actions over a selection

pub mod bulk;
pub mod handlers;
pub mod polling;
pub mod refresh;
pub mod toggle;

#[cfg(test)]
pub(crate) mod memory;

pub use bulk::{
    run_bulk, ActionMessages, AllFailedPolicy, BulkClass, BulkMessages, BulkSummary,
    OperationResult,
};
pub use handlers::{complete_items, delete_items, refresh_items, BulkUpdate};
pub use polling::{
    ActivityMonitor, Environment, PollingHandle, PollingScheduler, PollingState, PollingStatus,
    SchedulerConfig, SchedulerPhase, TickDecision, TickFuture,
};
pub use refresh::{apply_refreshes, reconcile_fields, refresh_item, RefreshOptions, RefreshOutcome};
pub use toggle::{toggle_read, ToggleOutcome};
