#![allow(dead_code)]

use listsync::failure::Navigator;
use listsync::model::ListItem;
use listsync::remote::RemoteItemClient;
use serde_json::{json, Value};
use std::sync::Mutex;
use wiremock::MockServer;

pub fn client(server: &MockServer) -> RemoteItemClient {
    RemoteItemClient::new(&server.uri()).unwrap()
}

pub fn field_json(id: &str, item_id: &str, label: &str, data: &str) -> Value {
    json!({
        "id": id,
        "label": label,
        "data": data,
        "data_type": "free_text",
        "list_item_field_configuration_id": format!("fc-{}", label),
        "list_item_id": item_id,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

pub fn item_json(id: &str, completed: bool, day: u32, fields: Vec<Value>) -> Value {
    json!({
        "id": id,
        "completed": completed,
        "refreshed": false,
        "fields": fields,
        "user_id": "user-1",
        "list_id": "list-1",
        "created_at": format!("2024-01-{:02}T00:00:00Z", day),
        "updated_at": format!("2024-01-{:02}T00:00:00Z", day)
    })
}

pub fn item(id: &str, completed: bool, day: u32, fields: Vec<Value>) -> ListItem {
    serde_json::from_value(item_json(id, completed, day, fields)).unwrap()
}

pub fn list_json(kind: &str, items: &[Value]) -> Value {
    let (completed, not_completed): (Vec<Value>, Vec<Value>) = items
        .iter()
        .cloned()
        .partition(|i| i["completed"].as_bool().unwrap_or(false));
    json!({
        "list": {
            "id": "list-1",
            "name": "Shared list",
            "type": kind,
            "list_item_configuration_id": "cfg-items"
        },
        "completed_items": completed,
        "not_completed_items": not_completed
    })
}

#[derive(Default)]
pub struct Visits(pub Mutex<Vec<String>>);

impl Visits {
    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Navigator for Visits {
    fn navigate(&self, url: &str) {
        self.0.lock().unwrap().push(url.to_string());
    }
}
