//! List-level bulk actions built on [`run_bulk`].
//!
//! Each handler applies one remote mutation to the selected items and
//! returns the snapshot with the successful items moved or removed. Failed
//! items stay exactly where they were. The selection is cleared afterwards.

use super::bulk::{run_bulk, ActionMessages, AllFailedPolicy, OperationResult};
use super::refresh::{apply_refreshes, refresh_item, RefreshOptions, ITEM_NOT_FOUND};
use crate::failure::{FailureContext, FailureHandler};
use crate::model::{ItemSnapshot, ListItem};
use crate::remote::{ItemAttributes, ItemStore};

const COMPLETE: ActionMessages = ActionMessages::new("complete", "completed");
const UNCOMPLETE: ActionMessages = ActionMessages::new("uncomplete", "uncompleted");
const DELETE: ActionMessages = ActionMessages::new("delete", "deleted");
const REFRESH: ActionMessages = ActionMessages::new("refresh", "refreshed");

/// Snapshot after a bulk action together with the per-item results.
#[derive(Debug)]
pub struct BulkUpdate<T = ()> {
    pub snapshot: ItemSnapshot,
    pub results: Vec<OperationResult<T>>,
}

fn succeeded<T>(results: &[OperationResult<T>]) -> impl Iterator<Item = &OperationResult<T>> {
    results.iter().filter(|r| r.is_success())
}

/// Mark `items` completed (or not) and move the successes between the
/// two collections.
pub async fn complete_items<S: ItemStore>(
    store: &S,
    list_id: &str,
    items: &[ListItem],
    completed: bool,
    snapshot: &ItemSnapshot,
    failures: &FailureHandler<'_>,
) -> BulkUpdate {
    let messages = if completed { COMPLETE } else { UNCOMPLETE };
    let results = run_bulk(
        items,
        |item| async move {
            store
                .update_item(list_id, &item.id, ItemAttributes::completed(completed))
                .await
        },
        &messages,
        failures.sink(),
        AllFailedPolicy::Notify,
    )
    .await;

    let mut next = snapshot.clone();
    for result in succeeded(&results) {
        let mut moved = result.item.clone();
        moved.completed = completed;
        next = next.with_item_removed(&moved.id).with_added_item(moved);
    }

    BulkUpdate {
        snapshot: next.with_selection_cleared(),
        results,
    }
}

/// Delete `items` remotely and drop the successes from the snapshot.
///
/// When every delete fails the first error goes through the failure
/// handler, so an expired session still lands on the sign-in page.
pub async fn delete_items<S: ItemStore>(
    store: &S,
    list_id: &str,
    items: &[ListItem],
    snapshot: &ItemSnapshot,
    failures: &FailureHandler<'_>,
) -> BulkUpdate {
    let redirect = format!("/lists/{}", list_id);
    let results = run_bulk(
        items,
        |item| async move { store.delete_item(list_id, &item.id).await },
        &DELETE,
        failures.sink(),
        AllFailedPolicy::Delegate {
            handler: failures,
            context: FailureContext::new(ITEM_NOT_FOUND).redirect_to(&redirect),
        },
    )
    .await;

    let mut next = snapshot.clone();
    for result in succeeded(&results) {
        next = next.with_item_removed(&result.item.id);
    }

    BulkUpdate {
        snapshot: next.with_selection_cleared(),
        results,
    }
}

/// Refresh every item and apply all replacements to the snapshot at once.
///
/// Per-item failures are not reported individually; the bulk summary
/// covers them.
pub async fn refresh_items<S: ItemStore>(
    store: &S,
    list_id: &str,
    items: &[ListItem],
    snapshot: &ItemSnapshot,
    failures: &FailureHandler<'_>,
) -> BulkUpdate<ListItem> {
    let options = RefreshOptions {
        skip_state_update: true,
        quiet_failures: true,
    };
    let results = run_bulk(
        items,
        |item| async move {
            refresh_item(store, list_id, &item, snapshot, options, failures)
                .await
                .map(|outcome| outcome.item)
        },
        &REFRESH,
        failures.sink(),
        AllFailedPolicy::Notify,
    )
    .await;

    let next = apply_refreshes(
        snapshot,
        results.iter().filter_map(|r| {
            r.outcome
                .as_ref()
                .ok()
                .map(|new_item| (r.item.id.as_str(), new_item.clone()))
        }),
    );

    BulkUpdate {
        snapshot: next.with_selection_cleared(),
        results,
    }
}
