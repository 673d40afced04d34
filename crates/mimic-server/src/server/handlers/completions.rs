//! Completion handlers: every `/v1/*` request other than the model listing.
//!
//! The request is matched through the engine and the payload is rendered in
//! the shape the endpoint implies:
//! - chat completions: `chat.completion` envelope or chunk stream
//! - completions / responses: `text_completion` envelope or chunk stream
//! - anything else: the text itself

use crate::script::{MatchRequest, ResponsePayload};
use crate::server::openai::{ChatCompletion, TextCompletion, DEFAULT_CHAT_MODEL, DEFAULT_TEXT_MODEL};
use crate::server::types::*;
use crate::server::AppState;
use crate::stream::{paced_stream, StreamSynthesizer};
use hyper::{Method, Response, StatusCode};
use serde_json::Value;
use tracing::debug;

/// Envelope family implied by the request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Chat,
    Text,
    Plain,
}

impl Endpoint {
    pub fn from_path(path: &str) -> Self {
        if path.contains("/chat/completions") {
            Endpoint::Chat
        } else if path.contains("/completions") || path.contains("/responses") {
            Endpoint::Text
        } else {
            Endpoint::Plain
        }
    }
}

/// Handle a scripted `/v1/*` request
pub fn handle_completion(
    token: Option<&str>,
    method: &Method,
    path: &str,
    body: &[u8],
    state: &AppState,
) -> Response<ResponseBody> {
    let Some(token) = token else {
        return unauthorized();
    };

    if state.debug {
        debug!("Request: {} {} (token: {})", method, path, token);
        if !body.is_empty() {
            debug!("Body: {}", String::from_utf8_lossy(body));
        }
    }

    let parsed = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Some(value),
            Err(_) if *method == Method::GET => None,
            Err(_) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "Invalid JSON",
                    "invalid_request_error",
                )
            }
        }
    };

    if let Some(model) = parsed.as_ref().and_then(|b| b.get("model")).and_then(Value::as_str) {
        if !state.engine.is_valid_model(token, model) {
            return unknown_model(model);
        }
    }

    let request = MatchRequest::new(method.as_str(), path, parsed);
    match state.engine.match_request(token, &request) {
        Ok(payload) => render_payload(Endpoint::from_path(path), payload, request.body.as_ref(), state),
        Err(e) => engine_error_response(&e),
    }
}

/// Turn a matched payload into the HTTP response for `endpoint`
pub fn render_payload(
    endpoint: Endpoint,
    payload: ResponsePayload,
    request_body: Option<&Value>,
    state: &AppState,
) -> Response<ResponseBody> {
    let status = StatusCode::from_u16(payload.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let streaming = request_body
        .and_then(|b| b.get("stream"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let model = request_body
        .and_then(|b| b.get("model"))
        .and_then(Value::as_str);

    match payload {
        ResponsePayload::Events { events, .. } => {
            let paced = paced_stream(StreamSynthesizer::explicit(&events), state.stream_delay);
            sse_response(status, paced.body)
        }
        ResponsePayload::Json { body, .. } => json_response(status, &body),
        ResponsePayload::Text { content, .. }
            if status.is_client_error() || status.is_server_error() =>
        {
            error_response(status, content, error_type_for_status(status))
        }
        ResponsePayload::Text { content, .. } => match endpoint {
            Endpoint::Chat => {
                let model = model.unwrap_or(DEFAULT_CHAT_MODEL);
                if streaming {
                    let events = StreamSynthesizer::chat(model).synthesize(&content);
                    sse_response(status, paced_stream(events, state.stream_delay).body)
                } else {
                    json_response(status, &ChatCompletion::new(model, content))
                }
            }
            Endpoint::Text => {
                let model = model.unwrap_or(DEFAULT_TEXT_MODEL);
                if streaming {
                    let events = StreamSynthesizer::text(model).synthesize(&content);
                    sse_response(status, paced_stream(events, state.stream_delay).body)
                } else {
                    json_response(status, &TextCompletion::new(model, content))
                }
            }
            Endpoint::Plain => text_response(status, content),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const CHAT: &str = "/v1/chat/completions";

    fn state_with(script: Value) -> AppState {
        let state = AppState::new(Arc::new(Engine::new())).with_stream_delay(Duration::ZERO);
        state.engine.load_script("tok", &script).unwrap();
        state
    }

    fn chat_body(content: &str, stream: bool) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "model": "gpt-4",
            "stream": stream,
            "messages": [{"role": "user", "content": content}]
        }))
        .unwrap()
    }

    async fn body_text(resp: Response<ResponseBody>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_endpoint_from_path() {
        assert_eq!(Endpoint::from_path("/v1/chat/completions"), Endpoint::Chat);
        assert_eq!(Endpoint::from_path("/v1/completions"), Endpoint::Text);
        assert_eq!(Endpoint::from_path("/v1/responses"), Endpoint::Text);
        assert_eq!(Endpoint::from_path("/v1/embeddings"), Endpoint::Plain);
    }

    #[tokio::test]
    async fn test_chat_completion_envelope() {
        let state = state_with(json!({"responses": {"weather": "Sunny"}}));
        let resp = handle_completion(Some("tok"), &Method::POST, CHAT, &chat_body("What's the weather?", false), &state);
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["object"], "chat.completion");
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["choices"][0]["message"]["content"], "Sunny");
    }

    #[tokio::test]
    async fn test_chat_completion_stream() {
        let state = state_with(json!({"responses": "Hello, world!"}));
        let resp = handle_completion(Some("tok"), &Method::POST, CHAT, &chat_body("hi", true), &state);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("Content-Type").unwrap(), "text/event-stream");
        let text = body_text(resp).await;
        let frames: Vec<&str> = text.split_terminator("\n\n").collect();
        assert_eq!(frames.len(), 5);
        assert!(frames[0].contains("\"role\":\"assistant\""));
        assert!(frames[3].contains("\"finish_reason\":\"stop\""));
        assert_eq!(frames[4], "data: [DONE]");
    }

    #[tokio::test]
    async fn test_text_completion_envelope() {
        let state = state_with(json!({"responses": "done"}));
        let body = serde_json::to_vec(&json!({"prompt": "finish this"})).unwrap();
        let resp = handle_completion(Some("tok"), &Method::POST, "/v1/completions", &body, &state);
        let body = body_json(resp).await;
        assert_eq!(body["object"], "text_completion");
        assert_eq!(body["model"], DEFAULT_TEXT_MODEL);
        assert_eq!(body["choices"][0]["text"], "done");
    }

    #[tokio::test]
    async fn test_other_path_returns_plain_text() {
        let state = state_with(json!({"responses": "raw"}));
        let resp = handle_completion(Some("tok"), &Method::POST, "/v1/embeddings", b"{}", &state);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "raw");
    }

    #[tokio::test]
    async fn test_scripted_error_status() {
        let state = state_with(json!({"responses": [{"error": "Rate limit exceeded", "status": 429}]}));
        let resp = handle_completion(Some("tok"), &Method::POST, CHAT, &chat_body("x", false), &state);
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["message"], "Rate limit exceeded");
        assert_eq!(body["error"]["type"], "rate_limit_error");
    }

    #[tokio::test]
    async fn test_json_payload_returned_verbatim() {
        let state = state_with(json!({
            "rules": [{"match": {"path": CHAT}, "response": {"status": 201, "json": {"custom": true}}}]
        }));
        let resp = handle_completion(Some("tok"), &Method::POST, CHAT, &chat_body("x", false), &state);
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body_json(resp).await, json!({"custom": true}));
    }

    #[tokio::test]
    async fn test_explicit_events_streamed_regardless_of_flag() {
        let state = state_with(json!({
            "rules": [{"response": {"sse": [{"data": {"n": 1}}, {"data": "[DONE]"}]}}]
        }));
        let resp = handle_completion(Some("tok"), &Method::POST, CHAT, &chat_body("x", false), &state);
        assert_eq!(resp.headers().get("Content-Type").unwrap(), "text/event-stream");
        assert_eq!(body_text(resp).await, "data: {\"n\":1}\n\ndata: [DONE]\n\n");
    }

    #[tokio::test]
    async fn test_request_errors() {
        let state = state_with(json!({"responses": "x"}));

        let resp = handle_completion(None, &Method::POST, CHAT, &chat_body("x", false), &state);
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = handle_completion(Some("tok"), &Method::POST, CHAT, b"{oops", &state);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = serde_json::to_vec(&json!({"model": "gpt-9", "messages": []})).unwrap();
        let resp = handle_completion(Some("tok"), &Method::POST, CHAT, &body, &state);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(resp).await["error"]["message"],
            "The model `gpt-9` does not exist"
        );

        let resp = handle_completion(Some("unknown"), &Method::POST, CHAT, &chat_body("x", false), &state);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_invalid_model_does_not_consume() {
        let state = state_with(json!({"responses": ["only once"]}));
        let body = serde_json::to_vec(&json!({"model": "nope", "messages": []})).unwrap();
        handle_completion(Some("tok"), &Method::POST, CHAT, &body, &state);
        let resp = handle_completion(Some("tok"), &Method::POST, CHAT, &chat_body("x", false), &state);
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
