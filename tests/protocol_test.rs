use std::sync::Arc;

use mid::dialogue::DialogueEngine;
use mid::gateway::auth::verify_connect;
use mid::gateway::protocol::handle_rpc;
use mid::store::memory::InMemoryStore;
use mid::store::{MediaStore, MemoryStore};

fn engine() -> DialogueEngine {
    let store = Arc::new(InMemoryStore::new());
    let memories: Arc<dyn MemoryStore> = store.clone();
    let media: Arc<dyn MediaStore> = store;
    DialogueEngine::new(memories, media)
}

#[tokio::test]
async fn ping_returns_pong() {
    let mut engine = engine();
    let resp = handle_rpc(r#"{"id":"1","method":"ping"}"#, &mut engine).await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    assert_eq!(parsed["id"], "1");
    assert_eq!(parsed["result"], "pong");
}

#[tokio::test]
async fn status_reports_version_and_flow() {
    let mut engine = engine();
    let resp = handle_rpc(r#"{"id":"2","method":"status"}"#, &mut engine).await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    assert!(parsed["result"]["version"].is_string());
    assert_eq!(parsed["result"]["flow"], "idle");
    assert_eq!(parsed["result"]["unsaved_drafts"], 0);
}

#[tokio::test]
async fn status_flow_follows_the_engine() {
    let mut engine = engine();
    handle_rpc(
        r#"{"id":"3","method":"diary.send","params":{"content":"create list"}}"#,
        &mut engine,
    )
    .await;
    let resp = handle_rpc(r#"{"id":"4","method":"status"}"#, &mut engine).await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    assert_eq!(parsed["result"]["flow"], "builder");
}

#[tokio::test]
async fn diary_send_missing_params_returns_error() {
    let mut engine = engine();
    let resp = handle_rpc(r#"{"id":"5","method":"diary.send","params":{}}"#, &mut engine).await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    assert_eq!(parsed["id"], "5");
    assert!(
        parsed["error"]
            .as_str()
            .unwrap_or("")
            .contains("invalid diary.send params")
    );
}

#[tokio::test]
async fn diary_send_round_trips_a_conversation() {
    let mut engine = engine();

    let resp = handle_rpc(
        r#"{"id":"6","method":"diary.send","params":{"content":"create memory: \"hello gateway\""}}"#,
        &mut engine,
    )
    .await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    let replies = parsed["result"]["replies"].as_array().unwrap();
    assert!(
        replies[0]["text"]
            .as_str()
            .unwrap()
            .contains("Memory created successfully.")
    );
    assert_eq!(replies[0]["speaker"], "mother");

    let resp = handle_rpc(
        r#"{"id":"7","method":"diary.send","params":{"content":"show all"}}"#,
        &mut engine,
    )
    .await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    let body = parsed["result"]["replies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["text"].as_str().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(body.contains("hello gateway"));
}

#[tokio::test]
async fn diary_send_reports_cleared() {
    let mut engine = engine();
    let resp = handle_rpc(
        r#"{"id":"8","method":"diary.send","params":{"content":"clear"}}"#,
        &mut engine,
    )
    .await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    assert_eq!(parsed["result"]["cleared"], true);
}

#[tokio::test]
async fn diary_attach_rejects_bad_base64() {
    let mut engine = engine();
    let resp = handle_rpc(
        r#"{"id":"9","method":"diary.attach","params":{"file_name":"x.png","data":"%%%"}}"#,
        &mut engine,
    )
    .await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    assert!(
        parsed["error"]
            .as_str()
            .unwrap_or("")
            .contains("invalid diary.attach data")
    );
}

#[tokio::test]
async fn diary_attach_feeds_the_image_builder() {
    let mut engine = engine();
    handle_rpc(
        r#"{"id":"10","method":"diary.send","params":{"content":"save picture"}}"#,
        &mut engine,
    )
    .await;

    // "AQID" is [1, 2, 3]
    let resp = handle_rpc(
        r#"{"id":"11","method":"diary.attach","params":{"file_name":"pier.jpg","data":"AQID"}}"#,
        &mut engine,
    )
    .await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    let body = parsed["result"]["replies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["text"].as_str().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(body.contains("Image selected: pier.jpg"));
}

#[tokio::test]
async fn diary_attach_with_no_waiting_builder_replies_in_band() {
    let mut engine = engine();
    let resp = handle_rpc(
        r#"{"id":"12","method":"diary.attach","params":{"file_name":"x.png","data":"AQID"}}"#,
        &mut engine,
    )
    .await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    let body = parsed["result"]["replies"][0]["text"].as_str().unwrap();
    assert!(body.contains("No image upload is waiting"));
}

#[tokio::test]
async fn unknown_method_returns_error() {
    let mut engine = engine();
    let resp = handle_rpc(r#"{"id":"13","method":"nope.method"}"#, &mut engine).await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    assert_eq!(parsed["error"], "unknown method: nope.method");
}

#[tokio::test]
async fn malformed_rpc_returns_parse_error() {
    let mut engine = engine();
    let resp = handle_rpc("this is not json", &mut engine).await;
    let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
    assert_eq!(parsed["id"], "0");
    assert!(
        parsed["error"]
            .as_str()
            .unwrap_or("")
            .contains("parse error")
    );
}

// =============================================================
// Connect auth
// =============================================================

#[test]
fn auth_passes_without_configured_token() {
    assert!(verify_connect(r#"{"anything":"at all"}"#, &None));
}

#[test]
fn auth_matches_exact_token_only() {
    let expected = Some("secret-token".to_string());
    assert!(verify_connect(r#"{"token":"secret-token"}"#, &expected));
    assert!(!verify_connect(r#"{"token":"wrong"}"#, &expected));
    assert!(!verify_connect(r#"{"token":""}"#, &expected));
    assert!(!verify_connect("not json", &expected));
    assert!(!verify_connect(r#"{}"#, &expected));
}
