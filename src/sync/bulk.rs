//! Fan-out/fan-in executor for applying one remote operation to many items.
//!
//! Every item's operation is started at once and joined with
//! [`futures::future::join_all`]; a failing item never cancels its siblings.
//! The aggregate outcome is reported through the sink with a severity that
//! depends on how many items succeeded. Nothing is rolled back.

use crate::error::SyncError;
use crate::failure::{FailureContext, FailureHandler};
use crate::model::ListItem;
use crate::notify::NotificationSink;
use futures::future::join_all;
use std::future::Future;

const ALL_FAILED_MESSAGE: &str = "Something went wrong. Please try again.";

/// Per-item outcome of a bulk call. Lives only for the duration of the call.
#[derive(Debug)]
pub struct OperationResult<T> {
    pub item: ListItem,
    pub outcome: Result<T, SyncError>,
}

impl<T> OperationResult<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Formats the one notification emitted per bulk call.
pub trait BulkMessages {
    fn all_succeeded(&self, items: &[ListItem]) -> String;
    fn partially_failed(&self, succeeded: &[ListItem], failed: &[ListItem]) -> String;
    /// Used by [`AllFailedPolicy::Notify`].
    fn all_failed(&self, _items: &[ListItem]) -> String {
        ALL_FAILED_MESSAGE.to_string()
    }
}

/// Messages for a verb applied to items: "2 items completed",
/// "1 item completed. Failed to complete 2 items." A batch where nothing
/// succeeded gets the fixed default message.
#[derive(Debug, Clone, Copy)]
pub struct ActionMessages {
    pub past: &'static str,
    pub verb: &'static str,
}

impl ActionMessages {
    pub const fn new(verb: &'static str, past: &'static str) -> Self {
        Self { past, verb }
    }
}

pub(crate) fn count_items(n: usize) -> String {
    if n == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", n)
    }
}

impl BulkMessages for ActionMessages {
    fn all_succeeded(&self, items: &[ListItem]) -> String {
        format!("{} {}", count_items(items.len()), self.past)
    }

    fn partially_failed(&self, succeeded: &[ListItem], failed: &[ListItem]) -> String {
        format!(
            "{} {}. Failed to {} {}.",
            count_items(succeeded.len()),
            self.past,
            self.verb,
            count_items(failed.len())
        )
    }
}

/// What to do when no item succeeded.
pub enum AllFailedPolicy<'a> {
    /// Emit one `error` notification built by [`BulkMessages::all_failed`].
    Notify,
    /// Hand the first error to the failure handler, which may navigate away.
    Delegate {
        handler: &'a FailureHandler<'a>,
        context: FailureContext<'a>,
    },
}

/// How a finished bulk call was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkClass {
    AllSucceeded,
    PartiallyFailed,
    AllFailed,
}

/// Successful and failed items of a bulk call, each in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkSummary {
    pub succeeded: Vec<ListItem>,
    pub failed: Vec<ListItem>,
}

impl BulkSummary {
    pub fn of<T>(results: &[OperationResult<T>]) -> Self {
        let (ok, err): (Vec<_>, Vec<_>) = results.iter().partition(|r| r.is_success());
        Self {
            succeeded: ok.into_iter().map(|r| r.item.clone()).collect(),
            failed: err.into_iter().map(|r| r.item.clone()).collect(),
        }
    }

    pub fn class(&self) -> BulkClass {
        match (self.succeeded.is_empty(), self.failed.is_empty()) {
            (_, true) => BulkClass::AllSucceeded,
            (true, false) => BulkClass::AllFailed,
            (false, false) => BulkClass::PartiallyFailed,
        }
    }
}

/// Run `operation` for every item concurrently and report the aggregate.
///
/// # Returns
///
/// One [`OperationResult`] per input item, in input order. An empty input
/// returns an empty `Vec` without notifying.
pub async fn run_bulk<T, F, Fut>(
    items: &[ListItem],
    operation: F,
    messages: &dyn BulkMessages,
    sink: &dyn NotificationSink,
    on_all_failed: AllFailedPolicy<'_>,
) -> Vec<OperationResult<T>>
where
    F: Fn(ListItem) -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    if items.is_empty() {
        tracing::debug!("Bulk operation called with no items");
        return Vec::new();
    }

    let outcomes = join_all(items.iter().cloned().map(&operation)).await;
    let results: Vec<OperationResult<T>> = items
        .iter()
        .cloned()
        .zip(outcomes)
        .map(|(item, outcome)| OperationResult { item, outcome })
        .collect();

    for result in &results {
        if let Err(e) = &result.outcome {
            tracing::warn!(item_id = %result.item.id, error = %e, "Bulk item failed");
        }
    }

    let summary = BulkSummary::of(&results);
    tracing::debug!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "Bulk operation settled"
    );

    match summary.class() {
        BulkClass::AllSucceeded => sink.info(&messages.all_succeeded(&summary.succeeded)),
        BulkClass::PartiallyFailed => {
            sink.warning(&messages.partially_failed(&summary.succeeded, &summary.failed))
        }
        BulkClass::AllFailed => match on_all_failed {
            AllFailedPolicy::Notify => sink.error(&messages.all_failed(&summary.failed)),
            AllFailedPolicy::Delegate { handler, context } => {
                let first_error = results.iter().find_map(|r| r.outcome.as_ref().err());
                if let Some(error) = first_error {
                    handler.handle(error, context);
                }
            }
        },
    }

    results
}
