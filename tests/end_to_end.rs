//! End-to-end scenarios: a real server, the HTTP client and a live subscriber

use std::time::Duration;

use serde_json::json;
use vmixlink_client::{ClientError, ProfileUpdate, StatusCode};
use vmixlink_format::Format;
use vmixlink_integration_tests::TestServer;
use vmixlink_store::{Items, ProfileName, Scalar};

fn name(raw: &str) -> ProfileName {
    ProfileName::new(raw).expect("Valid profile name")
}

fn items(value: serde_json::Value) -> Items {
    let serde_json::Value::Object(object) = value else {
        panic!("Expected an object");
    };
    Items::from_json_object(&object).expect("Scalar values only")
}

async fn next_update(updates: &mut tokio::sync::mpsc::Receiver<ProfileUpdate>) -> ProfileUpdate {
    tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("Timed out waiting for an update")
        .expect("Subscriber stopped")
}

async fn wait_for_subscriber(server: &TestServer) {
    for _ in 0..100 {
        if server.state.service.notifier().subscriber_count() > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Subscriber never connected");
}

/// Add, update and delete an item while a subscriber listens
#[tokio::test]
async fn test_item_lifecycle_with_subscriber() {
    let server = TestServer::start().await.expect("Failed to start server");
    let client = server.client().expect("Failed to build client");
    let (mut updates, _task) = server
        .subscriber()
        .expect("Failed to build subscriber")
        .with_profile("demo")
        .spawn();
    wait_for_subscriber(&server).await;

    let demo = name("demo");

    // Fresh profile: 201 and the canonical file shape
    let created = client.add_item(&demo, "score", "0").await.expect("Add failed");
    assert_eq!(created.to_json(), json!({ "score": "0" }));
    let file = std::fs::read_to_string(server.data_dir().join("demo.json")).expect("File missing");
    let on_disk: serde_json::Value = serde_json::from_str(&file).expect("File is not JSON");
    assert_eq!(on_disk, json!([{ "score": "0" }]));
    assert_eq!(next_update(&mut updates).await.changes.to_json(), json!({ "score": "0" }));

    // Update: subscriber sees exactly the changed key
    client.update_item(&demo, "score", "1").await.expect("Update failed");
    let update = next_update(&mut updates).await;
    assert_eq!(update.profile_name, "demo");
    assert_eq!(update.changes.to_json(), json!({ "score": "1" }));

    // Missing key: 404, file untouched, nothing broadcast
    let err = client
        .delete_item(&demo, "missingKey")
        .await
        .expect_err("Delete of a missing key should fail");
    assert!(matches!(
        &err,
        ClientError::Api { status, message } if *status == StatusCode::NOT_FOUND && message == "Key not found"
    ));
    let after = std::fs::read_to_string(server.data_dir().join("demo.json")).expect("File missing");
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&after).expect("File is not JSON"),
        json!([{ "score": "1" }])
    );

    client.delete_item(&demo, "score").await.expect("Delete failed");
    let update = next_update(&mut updates).await;
    assert_eq!(update.changes.get("score"), Some(&Scalar::Null));
}

#[tokio::test]
async fn test_second_add_of_same_key_conflicts() {
    let server = TestServer::start().await.expect("Failed to start server");
    let client = server.client().expect("Failed to build client");
    let demo = name("demo");

    client.add_item(&demo, "k", "v1").await.expect("First add failed");
    let err = client.add_item(&demo, "k", "v2").await.expect_err("Second add should conflict");
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));

    let stored = client.items(&demo).await.expect("Read failed");
    assert_eq!(stored.get("k"), Some(&Scalar::from("v1")));
}

#[tokio::test]
async fn test_whole_profile_save_notifies_exact_delta() {
    let server = TestServer::start().await.expect("Failed to start server");
    let client = server.client().expect("Failed to build client");
    let (mut updates, _task) = server.subscriber().expect("Failed to build subscriber").spawn();
    wait_for_subscriber(&server).await;

    let demo = name("delta");
    client
        .save_profile(&demo, &items(json!({ "a": 1, "b": 2 })))
        .await
        .expect("Save failed");
    next_update(&mut updates).await;

    client
        .save_profile(&demo, &items(json!({ "a": 1, "c": 3 })))
        .await
        .expect("Save failed");
    let update = next_update(&mut updates).await;
    assert_eq!(update.changes.to_json(), json!({ "b": null, "c": 3 }));
}

#[tokio::test]
async fn test_unknown_format_falls_back_to_json() {
    let server = TestServer::start().await.expect("Failed to start server");
    let client = server.client().expect("Failed to build client");
    let demo = name("demo");
    client.add_item(&demo, "title", "Hello").await.expect("Add failed");

    let url = |format: &str| format!("{}/api/data/demo?format={format}", server.base_url());
    let json_body = reqwest_get(&url("json")).await;
    let bogus_body = reqwest_get(&url("bogus")).await;
    assert_eq!(json_body, bogus_body);
}

#[tokio::test]
async fn test_polling_reflects_write_inside_cache_window() {
    let server = TestServer::start().await.expect("Failed to start server");
    let client = server.client().expect("Failed to build client");
    let demo = name("demo");

    client.add_item(&demo, "score", 1).await.expect("Add failed");
    let before = client
        .fetch_data(&demo, Format::Json, None, None)
        .await
        .expect("Poll failed");
    assert!(before.body.contains("\"score\": 1"));

    client.update_item(&demo, "score", 2).await.expect("Update failed");
    let after = client
        .fetch_data(&demo, Format::Json, None, None)
        .await
        .expect("Poll failed");
    assert!(after.body.contains("\"score\": 2"));
}

#[tokio::test]
async fn test_deleting_missing_profile_succeeds() {
    let server = TestServer::start().await.expect("Failed to start server");
    let client = server.client().expect("Failed to build client");

    client.delete_profile(&name("never")).await.expect("Delete should succeed");
    client.delete_profile(&name("never")).await.expect("Delete should succeed");
    assert!(client.profiles().await.expect("List failed").is_empty());
}

#[tokio::test]
async fn test_profiles_survive_restart() {
    let server = TestServer::start().await.expect("Failed to start server");
    let client = server.client().expect("Failed to build client");
    client
        .save_profile(&name("persist"), &items(json!({ "x": "y", "n": null })))
        .await
        .expect("Save failed");
    drop(client);
    let dir = server.stop().await.expect("Failed to stop server");

    let server = TestServer::start_in(dir).await.expect("Failed to restart server");
    let client = server.client().expect("Failed to build client");
    assert_eq!(client.profiles().await.expect("List failed"), vec![name("persist")]);
    assert_eq!(
        client.profile(&name("persist")).await.expect("Read failed").to_json(),
        json!({ "x": "y", "n": null })
    );
}

async fn reqwest_get(url: &str) -> Vec<u8> {
    reqwest::get(url)
        .await
        .expect("Request failed")
        .bytes()
        .await
        .expect("Failed to read body")
        .to_vec()
}
