//! Integration tests for the bulk list actions against a mock list server.

mod common;

use common::{client, field_json, item, item_json, Visits};
use listsync::failure::FailureHandler;
use listsync::model::ItemSnapshot;
use listsync::notify::{MemorySink, Severity};
use listsync::sync::{complete_items, delete_items, refresh_items};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_complete_partial_failure_warns_and_moves_successes() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/lists/list-1/list_items/a"))
        .and(body_json(json!({ "list_item": { "completed": true } })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/lists/list-1/list_items/b"))
        .respond_with(
            ResponseTemplate::new(422).set_body_string(r#"{"completed":["is locked"]}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let a = item("a", false, 1, vec![]);
    let b = item("b", false, 2, vec![]);
    let snapshot = ItemSnapshot::from_items([a.clone(), b.clone()]);
    let sink = MemorySink::new();
    let handler = FailureHandler::new(&sink);

    let update = complete_items(&client(&server), "list-1", &[a, b], true, &snapshot, &handler).await;

    assert_eq!(update.results.len(), 2);
    assert!(update.results[0].is_success());
    assert_eq!(update.results[1].outcome.as_ref().unwrap_err().status(), Some(422));
    assert_eq!(update.snapshot.completed[0].id, "a");
    assert_eq!(update.snapshot.not_completed[0].id, "b");

    let got = sink.notifications();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].severity, Severity::Warning);
    assert_eq!(got[0].text, "1 item completed. Failed to complete 1 item.");
}

#[tokio::test]
async fn test_delete_all_forbidden_redirects_to_list() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let a = item("a", false, 1, vec![]);
    let b = item("b", true, 2, vec![]);
    let snapshot = ItemSnapshot::from_items([a.clone(), b.clone()]);
    let sink = MemorySink::new();
    let visits = Visits::default();
    let handler = FailureHandler::new(&sink).with_navigator(&visits);

    let update = delete_items(&client(&server), "list-1", &[a, b], &snapshot, &handler).await;

    assert_eq!(update.snapshot.len(), 2);
    assert_eq!(visits.all(), vec!["/lists/list-1".to_string()]);
    let got = sink.notifications();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].text, "Item not found");
}

#[tokio::test]
async fn test_refresh_items_all_failed_reports_single_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/lists/list-1/list_items"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let a = item("a", true, 1, vec![field_json("fa", "a", "product", "Eggs")]);
    let b = item("b", true, 2, vec![]);
    let snapshot = ItemSnapshot::from_items([a.clone(), b.clone()]);
    let sink = MemorySink::new();
    let visits = Visits::default();
    let handler = FailureHandler::new(&sink).with_navigator(&visits);

    let update = refresh_items(&client(&server), "list-1", &[a, b], &snapshot, &handler).await;

    assert!(update.results.iter().all(|r| !r.is_success()));
    assert_eq!(update.snapshot.completed, snapshot.completed);
    assert!(visits.all().is_empty());
    let got = sink.notifications();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].severity, Severity::Error);
    assert_eq!(got[0].text, "Something went wrong. Please try again.");
}

#[tokio::test]
async fn test_refresh_items_success_moves_to_not_completed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/lists/list-1/list_items"))
        .respond_with(ResponseTemplate::new(201).set_body_json(item_json("fresh", false, 9, vec![])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/lists/list-1/list_items/a"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lists/list-1/list_items/fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(item_json("fresh", false, 9, vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let a = item("a", true, 1, vec![]);
    let snapshot = ItemSnapshot::from_items([a.clone()]);
    let sink = MemorySink::new();
    let handler = FailureHandler::new(&sink);

    let update = refresh_items(&client(&server), "list-1", &[a], &snapshot, &handler).await;

    assert!(update.snapshot.completed.is_empty());
    assert_eq!(update.snapshot.not_completed[0].id, "fresh");
    assert_eq!(sink.notifications()[0].text, "1 item refreshed");
}
