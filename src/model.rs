//! Data model shared by the remote client and the sync orchestrators.
//!
//! The local snapshot is an immutable value: every operation here returns a
//! new [`ItemSnapshot`] instead of mutating the caller's copy.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Label of the boolean field toggled by the read/unread bulk action.
pub const READ_LABEL: &str = "read";
/// Label of the free-text field used to group items into categories.
pub const CATEGORY_LABEL: &str = "category";

// ============================================================================
// Lists
// ============================================================================

/// The finite set of list kinds the server knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    #[serde(rename = "BookList")]
    Book,
    #[serde(rename = "GroceryList")]
    Grocery,
    #[serde(rename = "MusicList")]
    Music,
    #[serde(rename = "SimpleList")]
    Simple,
    #[serde(rename = "ToDoList")]
    ToDo,
}

impl ListKind {
    /// Whether completed items can be refreshed back onto the list.
    pub fn supports_refresh(self) -> bool {
        match self {
            ListKind::Grocery | ListKind::ToDo => true,
            ListKind::Book | ListKind::Music | ListKind::Simple => false,
        }
    }

    /// Whether items carry a boolean "read" field.
    pub fn supports_read_toggle(self) -> bool {
        match self {
            ListKind::Book => true,
            ListKind::Grocery | ListKind::Music | ListKind::Simple | ListKind::ToDo => false,
        }
    }

    /// Label of the field that names an item of this kind.
    pub fn primary_label(self) -> &'static str {
        match self {
            ListKind::Book | ListKind::Music => "title",
            ListKind::Grocery => "product",
            ListKind::Simple => "content",
            ListKind::ToDo => "task",
        }
    }
}

/// List metadata returned by `GET /lists/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ListKind,
    pub list_item_configuration_id: Option<String>,
}

/// Full response of `GET /lists/{id}`: the list and both item collections.
#[derive(Debug, Clone, Deserialize)]
pub struct ListDetail {
    pub list: List,
    #[serde(default)]
    pub completed_items: Vec<ListItem>,
    #[serde(default)]
    pub not_completed_items: Vec<ListItem>,
}

// ============================================================================
// Items and fields
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub refreshed: bool,
    #[serde(default)]
    pub fields: Vec<Field>,
    pub user_id: Option<String>,
    pub list_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ListItem {
    /// First field carrying `label`. Later duplicates are ignored.
    pub fn field(&self, label: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.label == label)
    }

    pub fn field_data(&self, label: &str) -> Option<&str> {
        self.field(label).map(|f| f.data.as_str())
    }

    /// Current value of the "read" field; a missing field reads as `false`.
    pub fn is_read(&self) -> bool {
        self.field_data(READ_LABEL) == Some("true")
    }

    /// Non-blank category of this item, trimmed.
    pub fn category(&self) -> Option<&str> {
        self.field_data(CATEGORY_LABEL)
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDataType {
    #[default]
    FreeText,
    Boolean,
    DateTime,
    Number,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: String,
    #[serde(default)]
    pub data_type: FieldDataType,
    pub list_item_field_configuration_id: String,
    pub list_item_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Field {
    /// Whether the field holds anything worth copying.
    pub fn has_content(&self) -> bool {
        !self.data.trim().is_empty()
    }
}

/// Schema entry describing which fields an item of a list may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfiguration {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub data_type: FieldDataType,
    #[serde(default)]
    pub position: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Ordering
// ============================================================================

/// Sort ascending by `created_at` to match server ordering.
///
/// The sort is stable: items sharing a timestamp keep their relative order.
pub fn sort_items_by_created_at(mut items: Vec<ListItem>) -> Vec<ListItem> {
    items.sort_by_key(|item| item.created_at);
    items
}

// ============================================================================
// Local snapshot
// ============================================================================

/// Multi-select state attached to a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub multi_select: bool,
    pub selected: BTreeSet<String>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Locally held copy of a list's items, split into two disjoint collections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemSnapshot {
    pub completed: Vec<ListItem>,
    pub not_completed: Vec<ListItem>,
    pub selection: Selection,
}

impl ItemSnapshot {
    /// Partition a flat item list on `completed` and order each side.
    pub fn from_items(items: impl IntoIterator<Item = ListItem>) -> Self {
        let (completed, not_completed): (Vec<_>, Vec<_>) =
            items.into_iter().partition(|item| item.completed);
        Self {
            completed: sort_items_by_created_at(completed),
            not_completed: sort_items_by_created_at(not_completed),
            selection: Selection::default(),
        }
    }

    pub fn from_detail(detail: ListDetail) -> Self {
        Self::from_items(
            detail
                .completed_items
                .into_iter()
                .chain(detail.not_completed_items),
        )
    }

    pub fn len(&self) -> usize {
        self.completed.len() + self.not_completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> impl Iterator<Item = &ListItem> {
        self.not_completed.iter().chain(self.completed.iter())
    }

    pub fn find(&self, id: &str) -> Option<&ListItem> {
        self.items().find(|item| item.id == id)
    }

    /// Insert a new item into the collection matching its `completed` flag,
    /// after any items with an equal or earlier `created_at`.
    pub fn with_added_item(&self, item: ListItem) -> Self {
        let mut next = self.clone();
        let target = if item.completed {
            &mut next.completed
        } else {
            &mut next.not_completed
        };
        let at = target.partition_point(|existing| existing.created_at <= item.created_at);
        target.insert(at, item);
        next
    }

    /// Replace an item in whichever collection already holds it, keeping
    /// its position. Unknown ids leave the snapshot unchanged.
    pub fn with_item_replaced(&self, item: ListItem) -> Self {
        let mut next = self.clone();
        for collection in [&mut next.completed, &mut next.not_completed] {
            if let Some(slot) = collection.iter_mut().find(|existing| existing.id == item.id) {
                *slot = item;
                break;
            }
        }
        next
    }

    /// Drop an item from both collections and from the selection.
    pub fn with_item_removed(&self, id: &str) -> Self {
        let mut next = self.clone();
        next.completed.retain(|item| item.id != id);
        next.not_completed.retain(|item| item.id != id);
        next.selection.selected.remove(id);
        next
    }

    pub fn with_selection_cleared(&self) -> Self {
        let mut next = self.clone();
        next.selection = Selection::default();
        next
    }
}

// ============================================================================
// Categories
// ============================================================================

/// Distinct non-empty categories seen on a list's items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySet(BTreeSet<String>);

impl CategorySet {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a ListItem>) -> Self {
        let mut set = Self::default();
        for item in items {
            set.record(item);
        }
        set
    }

    /// Record the item's category. Returns true if it was not seen before.
    pub fn record(&mut self, item: &ListItem) -> bool {
        match item.category() {
            Some(category) => self.0.insert(category.to_string()),
            None => false,
        }
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.contains(category)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
