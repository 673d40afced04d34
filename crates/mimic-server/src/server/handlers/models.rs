//! Model listing handlers.

use crate::server::openai::{Model, ModelList};
use crate::server::types::*;
use crate::server::AppState;
use hyper::{Response, StatusCode};

/// GET /v1/models
pub fn handle_list(token: &str, state: &AppState) -> Response<ResponseBody> {
    json_response(StatusCode::OK, &ModelList::new(state.engine.models(token)))
}

/// GET /v1/models/{id}
pub fn handle_get(token: &str, id: &str, state: &AppState) -> Response<ResponseBody> {
    if !state.engine.is_valid_model(token, id) {
        return unknown_model(id);
    }
    json_response(StatusCode::OK, &Model::new(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, DEFAULT_MODELS};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_list_includes_script_models() {
        let state = AppState::new(Arc::new(Engine::new()));
        state
            .engine
            .load_script("tok", &json!({"responses": "x", "models": ["local"]}))
            .unwrap();

        let body = body_json(handle_list("tok", &state)).await;
        let ids: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids.len(), DEFAULT_MODELS.len() + 1);
        assert_eq!(ids.last().map(String::as_str), Some("local"));

        let other = body_json(handle_list("other", &state)).await;
        assert_eq!(other["data"].as_array().unwrap().len(), DEFAULT_MODELS.len());
    }

    #[tokio::test]
    async fn test_get_model() {
        let state = AppState::new(Arc::new(Engine::new()));
        let resp = handle_get("tok", "gpt-4o", &state);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["id"], "gpt-4o");

        let resp = handle_get("tok", "gpt-9", &state);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"]["param"], "model");
    }
}
