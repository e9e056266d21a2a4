//! Bulk flip of the boolean "read" field.
//!
//! Items that already carry the field get an update; the others get the field
//! created against the list's "read" field configuration. All calls go out as
//! one batch and the local snapshot only changes when every call succeeded.

use crate::error::SyncError;
use crate::failure::{FailureContext, FailureHandler};
use crate::model::{Field, ItemSnapshot, ListItem, READ_LABEL};
use crate::remote::{FieldUpdate, ItemStore, NewField};
use crate::sync::refresh::ITEM_NOT_FOUND;
use chrono::Utc;
use futures::future::join_all;

#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    pub snapshot: ItemSnapshot,
    /// The toggled items as they now look locally, in input order.
    pub items: Vec<ListItem>,
}

/// What one item needs remotely.
#[derive(Debug, Clone)]
enum ReadChange {
    Update {
        field_id: String,
        configuration_id: String,
    },
    Create {
        configuration_id: String,
    },
}

fn toggled_value(item: &ListItem) -> &'static str {
    if item.is_read() {
        "false"
    } else {
        "true"
    }
}

/// Flip the "read" field on every item in `items`.
///
/// Returns `None` after reporting through `failures` when any call failed;
/// the snapshot is then unchanged.
pub async fn toggle_read<S: ItemStore>(
    store: &S,
    list_id: &str,
    items: &[ListItem],
    snapshot: &ItemSnapshot,
    failures: &FailureHandler<'_>,
) -> Option<ToggleOutcome> {
    if items.is_empty() {
        return Some(ToggleOutcome {
            snapshot: snapshot.clone(),
            items: Vec::new(),
        });
    }

    match send_toggles(store, list_id, items).await {
        Ok(created) => Some(apply_toggles(items, created, snapshot, failures)),
        Err(error) => {
            tracing::warn!(
                list_id = %list_id,
                items = items.len(),
                error = %error,
                "Read toggle failed"
            );
            let redirect = format!("/lists/{}", list_id);
            failures.handle(
                &error,
                FailureContext::new(ITEM_NOT_FOUND).redirect_to(&redirect),
            );
            None
        }
    }
}

/// Issue the remote calls. Yields, per item, the field created for it.
async fn send_toggles<S: ItemStore>(
    store: &S,
    list_id: &str,
    items: &[ListItem],
) -> Result<Vec<Option<Field>>, SyncError> {
    let needs_configuration = items.iter().any(|item| item.field(READ_LABEL).is_none());
    let read_configuration = if needs_configuration {
        Some(resolve_read_configuration(store, list_id).await?)
    } else {
        None
    };

    let changes = items.iter().map(|item| match item.field(READ_LABEL) {
        Some(field) => ReadChange::Update {
            field_id: field.id.clone(),
            configuration_id: field.list_item_field_configuration_id.clone(),
        },
        // Resolved above whenever any item lacks the field
        None => ReadChange::Create {
            configuration_id: read_configuration.clone().unwrap_or_default(),
        },
    });

    let calls = items.iter().zip(changes).map(|(item, change)| async move {
        let data = toggled_value(item).to_string();
        match change {
            ReadChange::Update {
                field_id,
                configuration_id,
            } => store
                .update_field(
                    list_id,
                    &item.id,
                    &field_id,
                    FieldUpdate {
                        data,
                        list_item_field_configuration_id: configuration_id,
                    },
                )
                .await
                .map(|()| None),
            ReadChange::Create { configuration_id } => store
                .create_field(
                    list_id,
                    &item.id,
                    NewField {
                        label: READ_LABEL.to_string(),
                        data,
                        list_item_field_configuration_id: configuration_id,
                    },
                )
                .await
                .map(Some),
        }
    });

    join_all(calls).await.into_iter().collect()
}

/// Look up the id of the list's "read" field configuration.
async fn resolve_read_configuration<S: ItemStore>(
    store: &S,
    list_id: &str,
) -> Result<String, SyncError> {
    let missing = || SyncError::MissingFieldConfiguration {
        label: READ_LABEL.to_string(),
    };
    let detail = store.get_list(list_id).await?;
    let item_configuration_id = detail.list.list_item_configuration_id.ok_or_else(missing)?;
    let configurations = store.field_configurations(&item_configuration_id).await?;
    configurations
        .into_iter()
        .find(|configuration| configuration.label == READ_LABEL)
        .map(|configuration| configuration.id)
        .ok_or_else(missing)
}

fn apply_toggles(
    items: &[ListItem],
    created: Vec<Option<Field>>,
    snapshot: &ItemSnapshot,
    failures: &FailureHandler<'_>,
) -> ToggleOutcome {
    let now = Utc::now();
    let mut next = snapshot.clone();
    let mut toggled = Vec::with_capacity(items.len());

    for (item, created_field) in items.iter().zip(created) {
        let value = toggled_value(item);
        let mut updated = item.clone();
        match created_field {
            Some(field) => updated.fields.push(field),
            None => {
                if let Some(field) = updated.fields.iter_mut().find(|f| f.label == READ_LABEL) {
                    field.data = value.to_string();
                    field.updated_at = Some(now);
                }
            }
        }
        next = next.with_item_replaced(updated.clone());
        toggled.push(updated);
    }

    let next = next.with_selection_cleared();
    failures.sink().info(if toggled.len() == 1 {
        "Item updated"
    } else {
        "Items updated"
    });
    ToggleOutcome {
        snapshot: next,
        items: toggled,
    }
}
