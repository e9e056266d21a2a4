//! Boundary to the remote list-item store.
//!
//! The orchestrators only see the [`ItemStore`] trait. [`RemoteItemClient`]
//! is the HTTP implementation used in production; tests substitute an
//! in-memory store.

mod client;

pub use client::RemoteItemClient;

use crate::error::SyncError;
use crate::model::{Field, FieldConfiguration, ListDetail, ListItem};
use serde::Serialize;
use std::future::Future;

/// Partial item attributes for create and update calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshed: Option<bool>,
}

impl ItemAttributes {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            refreshed: None,
        }
    }

    pub fn refreshed(refreshed: bool) -> Self {
        Self {
            completed: None,
            refreshed: Some(refreshed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewField {
    pub label: String,
    pub data: String,
    pub list_item_field_configuration_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldUpdate {
    pub data: String,
    pub list_item_field_configuration_id: String,
}

/// Operations the sync layer needs from the remote store.
///
/// All ids are opaque strings assigned by the server.
pub trait ItemStore: Send + Sync {
    fn create_item(
        &self,
        list_id: &str,
        attributes: ItemAttributes,
    ) -> impl Future<Output = Result<ListItem, SyncError>> + Send;

    fn update_item(
        &self,
        list_id: &str,
        item_id: &str,
        attributes: ItemAttributes,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    fn delete_item(
        &self,
        list_id: &str,
        item_id: &str,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    fn create_field(
        &self,
        list_id: &str,
        item_id: &str,
        field: NewField,
    ) -> impl Future<Output = Result<Field, SyncError>> + Send;

    fn update_field(
        &self,
        list_id: &str,
        item_id: &str,
        field_id: &str,
        update: FieldUpdate,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Fetch one item with its fields.
    fn get_item(
        &self,
        list_id: &str,
        item_id: &str,
    ) -> impl Future<Output = Result<ListItem, SyncError>> + Send;

    /// Fetch list metadata and both item collections.
    fn get_list(&self, list_id: &str) -> impl Future<Output = Result<ListDetail, SyncError>> + Send;

    /// Field configurations of an item configuration, in schema order.
    fn field_configurations(
        &self,
        item_configuration_id: &str,
    ) -> impl Future<Output = Result<Vec<FieldConfiguration>, SyncError>> + Send;
}
