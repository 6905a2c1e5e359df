use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dialogue::DialogueEngine;

#[derive(Deserialize)]
struct RpcRequest {
    id: String,
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

/// Parameters for the `diary.send` RPC method: one terminal input line.
#[derive(Debug, Deserialize)]
pub struct DiarySendParams {
    pub content: String,
}

/// Parameters for `diary.attach`: the out-of-band file selection the
/// image builder waits for. `data` is base64-encoded file bytes.
#[derive(Debug, Deserialize)]
pub struct DiaryAttachParams {
    pub file_name: String,
    pub data: String,
}

#[derive(Serialize)]
struct RpcResponse {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn respond(id: String, result: serde_json::Value) -> String {
    serde_json::to_string(&RpcResponse {
        id,
        result: Some(result),
        error: None,
    })
    .unwrap_or_default()
}

fn respond_error(id: String, error: String) -> String {
    serde_json::to_string(&RpcResponse {
        id,
        result: None,
        error: Some(error),
    })
    .unwrap_or_default()
}

/// Handle one incoming JSON-RPC-style message against this connection's
/// dialogue engine. Always produces a single response frame; the engine
/// itself never streams.
pub async fn handle_rpc(msg: &str, engine: &mut DialogueEngine) -> String {
    let req: RpcRequest = match serde_json::from_str(msg) {
        Ok(r) => r,
        Err(e) => {
            warn!("malformed rpc: {e}");
            return respond_error("0".into(), format!("parse error: {e}"));
        }
    };

    match req.method.as_str() {
        "ping" => respond(req.id, serde_json::json!("pong")),

        "status" => respond(
            req.id,
            serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "flow": engine.active_flow(),
                "unsaved_drafts": engine.unsaved_drafts().len(),
            }),
        ),

        "diary.send" => {
            let params: DiarySendParams = match serde_json::from_value(req.params) {
                Ok(p) => p,
                Err(e) => {
                    return respond_error(req.id, format!("invalid diary.send params: {e}"));
                }
            };
            let turn = engine.handle_line(&params.content).await;
            match serde_json::to_value(&turn) {
                Ok(result) => respond(req.id, result),
                Err(e) => respond_error(req.id, format!("serialize error: {e}")),
            }
        }

        "diary.attach" => {
            let params: DiaryAttachParams = match serde_json::from_value(req.params) {
                Ok(p) => p,
                Err(e) => {
                    return respond_error(req.id, format!("invalid diary.attach params: {e}"));
                }
            };
            let bytes = match BASE64.decode(params.data.as_bytes()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    return respond_error(req.id, format!("invalid diary.attach data: {e}"));
                }
            };
            let turn = engine.attach_file(&params.file_name, bytes).await;
            match serde_json::to_value(&turn) {
                Ok(result) => respond(req.id, result),
                Err(e) => respond_error(req.id, format!("serialize error: {e}")),
            }
        }

        _ => respond_error(req.id, format!("unknown method: {}", req.method)),
    }
}
