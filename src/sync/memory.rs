//! In-memory [`ItemStore`] with fault injection for orchestrator tests.
use crate::error::SyncError;
use crate::model::{Field, FieldConfiguration, List, ListDetail, ListItem, ListKind};
use crate::remote::{FieldUpdate, ItemAttributes, ItemStore, NewField};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateItem,
    UpdateItem,
    DeleteItem,
    CreateField,
    UpdateField,
    GetItem,
    GetList,
    FieldConfigurations,
}

#[derive(Debug, Clone)]
struct Fault {
    op: Op,
    target: Option<String>,
    status: u16,
}

#[derive(Default)]
struct State {
    list: Option<List>,
    items: Vec<ListItem>,
    configurations: HashMap<String, Vec<FieldConfiguration>>,
    faults: Vec<Fault>,
    calls: Vec<(Op, String)>,
    strip_fields_on_get: bool,
    descending_created_at: bool,
    delays: HashMap<Op, usize>,
    next_id: u64,
}

pub struct MemoryStore {
    state: Mutex<State>,
}

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

impl MemoryStore {
    /// A single list of `kind` whose item configuration carries a "read" field.
    pub fn new(kind: ListKind) -> Self {
        let list = List {
            id: "list-1".to_string(),
            name: "Test list".to_string(),
            kind,
            list_item_configuration_id: Some("item-cfg".to_string()),
        };
        let mut configurations = HashMap::new();
        configurations.insert(
            "item-cfg".to_string(),
            vec![
                FieldConfiguration {
                    id: "cfg-title".to_string(),
                    label: "title".to_string(),
                    data_type: Default::default(),
                    position: 0,
                },
                FieldConfiguration {
                    id: "cfg-read".to_string(),
                    label: "read".to_string(),
                    data_type: crate::model::FieldDataType::Boolean,
                    position: 1,
                },
            ],
        );
        Self {
            state: Mutex::new(State {
                list: Some(list),
                configurations,
                next_id: 100,
                ..State::default()
            }),
        }
    }

    pub fn seed(&self, items: impl IntoIterator<Item = ListItem>) {
        self.state.lock().unwrap().items.extend(items);
    }

    pub fn without_configurations(&self) {
        self.state.lock().unwrap().configurations.clear();
    }

    /// Fail `op` with `status`, for every target or just `target`.
    pub fn fail(&self, op: Op, target: Option<&str>, status: u16) {
        self.state.lock().unwrap().faults.push(Fault {
            op,
            target: target.map(str::to_string),
            status,
        });
    }

    /// Serve fetched items without fields, like an incomplete server response.
    pub fn strip_fields_on_get(&self) {
        self.state.lock().unwrap().strip_fields_on_get = true;
    }

    /// Give each new record an earlier `created_at` than the one before.
    pub fn descending_created_at(&self) {
        self.state.lock().unwrap().descending_created_at = true;
    }

    /// Hold every `op` call back for `yields` extra scheduler turns.
    pub fn delay(&self, op: Op, yields: usize) {
        self.state.lock().unwrap().delays.insert(op, yields);
    }

    pub fn item(&self, id: &str) -> Option<ListItem> {
        self.state
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    pub fn calls(&self) -> Vec<(Op, String)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|(o, _)| *o == op).count()
    }

    async fn begin(&self, op: Op, target: &str) -> Result<(), SyncError> {
        let extra = self.state.lock().unwrap().delays.get(&op).copied().unwrap_or(0);
        for _ in 0..=extra {
            tokio::task::yield_now().await;
        }
        let mut state = self.state.lock().unwrap();
        state.calls.push((op, target.to_string()));
        let fault = state
            .faults
            .iter()
            .find(|f| f.op == op && f.target.as_deref().map_or(true, |t| t == target))
            .cloned();
        match fault {
            Some(fault) => Err(SyncError::Status {
                status: fault.status,
                body: String::new(),
            }),
            None => Ok(()),
        }
    }

    fn next_id(state: &mut State, prefix: &str) -> (String, DateTime<Utc>) {
        state.next_id += 1;
        let offset = Duration::seconds(state.next_id as i64);
        let created_at = if state.descending_created_at {
            epoch() + Duration::seconds(1_000) - offset
        } else {
            epoch() + offset
        };
        (format!("{}-{}", prefix, state.next_id), created_at)
    }

    fn not_found() -> SyncError {
        SyncError::Status {
            status: 404,
            body: String::new(),
        }
    }
}

impl ItemStore for MemoryStore {
    async fn create_item(
        &self,
        list_id: &str,
        attributes: ItemAttributes,
    ) -> Result<ListItem, SyncError> {
        self.begin(Op::CreateItem, list_id).await?;
        let mut state = self.state.lock().unwrap();
        let (id, now) = Self::next_id(&mut state, "item");
        let item = ListItem {
            id,
            completed: attributes.completed.unwrap_or(false),
            refreshed: attributes.refreshed.unwrap_or(false),
            fields: Vec::new(),
            user_id: Some("user-1".to_string()),
            list_id: list_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.items.push(item.clone());
        Ok(item)
    }

    async fn update_item(
        &self,
        _list_id: &str,
        item_id: &str,
        attributes: ItemAttributes,
    ) -> Result<(), SyncError> {
        self.begin(Op::UpdateItem, item_id).await?;
        let mut state = self.state.lock().unwrap();
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(Self::not_found)?;
        if let Some(completed) = attributes.completed {
            item.completed = completed;
        }
        if let Some(refreshed) = attributes.refreshed {
            item.refreshed = refreshed;
        }
        Ok(())
    }

    async fn delete_item(&self, _list_id: &str, item_id: &str) -> Result<(), SyncError> {
        self.begin(Op::DeleteItem, item_id).await?;
        let mut state = self.state.lock().unwrap();
        let before = state.items.len();
        state.items.retain(|i| i.id != item_id);
        if state.items.len() == before {
            return Err(Self::not_found());
        }
        Ok(())
    }

    async fn create_field(
        &self,
        _list_id: &str,
        item_id: &str,
        field: NewField,
    ) -> Result<Field, SyncError> {
        self.begin(Op::CreateField, item_id).await?;
        let mut state = self.state.lock().unwrap();
        let (id, now) = Self::next_id(&mut state, "field");
        let created = Field {
            id,
            label: field.label,
            data: field.data,
            data_type: Default::default(),
            list_item_field_configuration_id: field.list_item_field_configuration_id,
            list_item_id: item_id.to_string(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        let item = state
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(Self::not_found)?;
        item.fields.push(created.clone());
        Ok(created)
    }

    async fn update_field(
        &self,
        _list_id: &str,
        item_id: &str,
        field_id: &str,
        update: FieldUpdate,
    ) -> Result<(), SyncError> {
        self.begin(Op::UpdateField, item_id).await?;
        let mut state = self.state.lock().unwrap();
        let field = state
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .and_then(|i| i.fields.iter_mut().find(|f| f.id == field_id))
            .ok_or_else(Self::not_found)?;
        field.data = update.data;
        Ok(())
    }

    async fn get_item(&self, _list_id: &str, item_id: &str) -> Result<ListItem, SyncError> {
        self.begin(Op::GetItem, item_id).await?;
        let state = self.state.lock().unwrap();
        let mut item = state
            .items
            .iter()
            .find(|i| i.id == item_id)
            .cloned()
            .ok_or_else(Self::not_found)?;
        if state.strip_fields_on_get {
            item.fields.clear();
        }
        Ok(item)
    }

    async fn get_list(&self, list_id: &str) -> Result<ListDetail, SyncError> {
        self.begin(Op::GetList, list_id).await?;
        let state = self.state.lock().unwrap();
        let list = state.list.clone().ok_or_else(Self::not_found)?;
        let (completed_items, not_completed_items) =
            state.items.iter().cloned().partition(|i| i.completed);
        Ok(ListDetail {
            list,
            completed_items,
            not_completed_items,
        })
    }

    async fn field_configurations(
        &self,
        item_configuration_id: &str,
    ) -> Result<Vec<FieldConfiguration>, SyncError> {
        self.begin(Op::FieldConfigurations, item_configuration_id).await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .configurations
            .get(item_configuration_id)
            .cloned()
            .unwrap_or_default())
    }
}
