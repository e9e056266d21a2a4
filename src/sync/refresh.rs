//! Retire-and-recreate workflow for putting a completed item back on a list.
//!
//! The old item is marked `refreshed` and a fresh shell is created in the
//! same list; every non-blank field is then replayed onto the shell and the
//! canonical copy is fetched back. Each step waits for the previous one.

use crate::error::SyncError;
use crate::failure::{FailureContext, FailureHandler};
use crate::model::{ItemSnapshot, ListItem};
use crate::remote::{ItemAttributes, ItemStore, NewField};
use futures::future::join_all;

pub(crate) const ITEM_NOT_FOUND: &str = "Item not found";
const ITEM_REFRESHED: &str = "Item refreshed";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Leave the snapshot alone; the caller applies a combined update later.
    pub skip_state_update: bool,
    /// Do not route failures through the failure handler. The error is
    /// still returned.
    pub quiet_failures: bool,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// The new item with reconciled fields.
    pub item: ListItem,
    /// Updated snapshot, `None` when `skip_state_update` was set.
    pub snapshot: Option<ItemSnapshot>,
}

/// Refresh `item`, returning the recreated item and the new snapshot.
///
/// # Errors
///
/// Any failed remote call aborts the workflow. The failure is reported
/// through `failures` (unless `quiet_failures`) and then returned; the input
/// snapshot is never modified.
pub async fn refresh_item<S: ItemStore>(
    store: &S,
    list_id: &str,
    item: &ListItem,
    snapshot: &ItemSnapshot,
    options: RefreshOptions,
    failures: &FailureHandler<'_>,
) -> Result<RefreshOutcome, SyncError> {
    let recreated = match recreate(store, list_id, item).await {
        Ok(recreated) => recreated,
        Err(error) => {
            tracing::warn!(item_id = %item.id, error = %error, "Item refresh failed");
            if !options.quiet_failures {
                let redirect = format!("/lists/{}", list_id);
                failures.handle(
                    &error,
                    FailureContext::new(ITEM_NOT_FOUND).redirect_to(&redirect),
                );
            }
            return Err(error);
        }
    };

    if options.skip_state_update {
        return Ok(RefreshOutcome {
            item: recreated,
            snapshot: None,
        });
    }

    let next = apply_refreshes(snapshot, std::iter::once((item.id.as_str(), recreated.clone())));
    failures.sink().info(ITEM_REFRESHED);
    Ok(RefreshOutcome {
        item: recreated,
        snapshot: Some(next),
    })
}

/// Remove each retired item from `completed` and slot its replacement into
/// `not_completed` by `created_at`.
pub fn apply_refreshes<'a>(
    snapshot: &ItemSnapshot,
    refreshed: impl IntoIterator<Item = (&'a str, ListItem)>,
) -> ItemSnapshot {
    let mut next = snapshot.clone();
    for (old_id, new_item) in refreshed {
        next.completed.retain(|existing| existing.id != old_id);
        next = next.with_added_item(new_item);
    }
    next
}

/// Keep the server's fields unless it sent none back.
pub fn reconcile_fields(mut fetched: ListItem, original: &ListItem) -> ListItem {
    if fetched.fields.is_empty() {
        tracing::debug!(
            item_id = %fetched.id,
            "Refreshed item came back without fields, keeping the original ones"
        );
        fetched.fields = original.fields.clone();
    }
    fetched
}

async fn recreate<S: ItemStore>(
    store: &S,
    list_id: &str,
    old: &ListItem,
) -> Result<ListItem, SyncError> {
    let shell_attributes = ItemAttributes {
        completed: Some(false),
        refreshed: Some(false),
    };
    // Both calls settle before either error is propagated
    let (created, marked) = futures::join!(
        store.create_item(list_id, shell_attributes),
        store.update_item(list_id, &old.id, ItemAttributes::refreshed(true)),
    );
    let shell = created?;
    marked?;

    let replayable: Vec<NewField> = old
        .fields
        .iter()
        .filter(|field| field.has_content())
        .map(|field| NewField {
            label: field.label.clone(),
            data: field.data.clone(),
            list_item_field_configuration_id: field.list_item_field_configuration_id.clone(),
        })
        .collect();
    tracing::debug!(
        old_id = %old.id,
        new_id = %shell.id,
        replayed = replayable.len(),
        skipped = old.fields.len() - replayable.len(),
        "Replaying fields onto refreshed item"
    );

    let replays = join_all(
        replayable
            .into_iter()
            .map(|field| store.create_field(list_id, &shell.id, field)),
    )
    .await;
    if let Some(error) = replays.into_iter().find_map(Result::err) {
        return Err(error);
    }

    let fetched = store.get_item(list_id, &shell.id).await?;
    Ok(reconcile_fields(fetched, old))
}
