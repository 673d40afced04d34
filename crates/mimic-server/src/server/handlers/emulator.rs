//! Emulator control handlers: script load, reset, state inspection.

use crate::server::types::*;
use crate::server::AppState;
use hyper::{Response, StatusCode};
use serde_json::json;
use tracing::debug;

/// POST /_emulator/script - compile and apply a script for the caller's token
pub fn handle_script(token: Option<&str>, body: &[u8], state: &AppState) -> Response<ResponseBody> {
    let Some(token) = token else {
        return unauthorized();
    };

    let raw: serde_json::Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            debug!("Rejected script body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid JSON", "invalid_request_error");
        }
    };

    match state.engine.load_script(token, &raw) {
        Ok(summary) => json_response(
            StatusCode::OK,
            &json!({
                "status": "loaded",
                "rules": summary.total,
                "loaded": summary.loaded,
            }),
        ),
        Err(e) => engine_error_response(&e),
    }
}

/// POST /_emulator/reset - drop the caller's session
pub fn handle_reset(token: Option<&str>, state: &AppState) -> Response<ResponseBody> {
    let Some(token) = token else {
        return unauthorized();
    };
    state.engine.reset_session(token);
    json_response(StatusCode::OK, &json!({"status": "reset"}))
}

/// GET /_emulator/state - session snapshot, debug mode only
pub fn handle_state(token: Option<&str>, state: &AppState) -> Response<ResponseBody> {
    if !state.debug {
        return error_response(StatusCode::FORBIDDEN, "Debug mode not enabled", "forbidden");
    }
    let Some(token) = token else {
        return unauthorized();
    };
    match state.engine.inspect(token) {
        Some(snapshot) => json_response(StatusCode::OK, &snapshot),
        None => error_response(
            StatusCode::NOT_FOUND,
            "No script loaded for token",
            "invalid_request_error",
        ),
    }
}
