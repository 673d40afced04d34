//! Wire types and response helpers for the HTTP surface.

use crate::script::EngineError;
use crate::stream::SseBody;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, AUTHORIZATION};
use hyper::{Request, Response, StatusCode};
use serde::Serialize;

/// Body type of every response the server writes
pub type ResponseBody = SseBody;

/// Error envelope: `{"error": {...}}`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Error type reported for a scripted failure status
pub fn error_type_for_status(status: StatusCode) -> &'static str {
    match status.as_u16() {
        401 | 403 => "auth_error",
        404 => "not_found_error",
        429 => "rate_limit_error",
        400..=499 => "invalid_request_error",
        _ => "server_error",
    }
}

/// Extract the session token from `Authorization: Bearer <token>`
pub fn bearer_token(value: Option<&HeaderValue>) -> Option<String> {
    let raw = value?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?;
    if token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token.to_string())
}

/// Token of the request, if it carries a usable bearer header
pub fn request_token(req: &Request<Incoming>) -> Option<String> {
    bearer_token(req.headers().get(AUTHORIZATION))
}

fn full(body: impl Into<Bytes>) -> ResponseBody {
    Full::new(body.into()).boxed_unsync()
}

/// Build an HTTP response with headers.
///
/// Falls back to a minimal 500 if the builder rejects the inputs.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: ResponseBody,
) -> Response<ResponseBody> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder.body(body).unwrap_or_else(|_| {
        let mut fallback = Response::new(full("Internal Server Error"));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<ResponseBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], full(json))
}

/// Create a plain-text response
pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<ResponseBody> {
    build_response_with_headers(
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        full(body),
    )
}

/// Create a server-sent-events response around an already running stream
pub fn sse_response(status: StatusCode, body: SseBody) -> Response<ResponseBody> {
    build_response_with_headers(
        status,
        [
            ("Content-Type", "text/event-stream"),
            ("Cache-Control", "no-cache"),
            ("Connection", "keep-alive"),
        ],
        body,
    )
}

/// Create an error response
pub fn error_response(status: StatusCode, message: impl Into<String>, kind: &str) -> Response<ResponseBody> {
    error_response_with_param(status, message, kind, None)
}

pub fn error_response_with_param(
    status: StatusCode,
    message: impl Into<String>,
    kind: &str,
    param: Option<&str>,
) -> Response<ResponseBody> {
    let envelope = ErrorEnvelope {
        error: ErrorDetail {
            message: message.into(),
            kind: kind.to_string(),
            param: param.map(String::from),
            code: None,
        },
    };
    json_response(status, &envelope)
}

pub fn unauthorized() -> Response<ResponseBody> {
    error_response(
        StatusCode::UNAUTHORIZED,
        "Missing or invalid authorization",
        "auth_error",
    )
}

pub fn not_found() -> Response<ResponseBody> {
    error_response(StatusCode::NOT_FOUND, "Not Found", "invalid_request_error")
}

pub fn unknown_model(model: &str) -> Response<ResponseBody> {
    error_response_with_param(
        StatusCode::NOT_FOUND,
        format!("The model `{model}` does not exist"),
        "invalid_request_error",
        Some("model"),
    )
}

/// Map an engine failure onto its HTTP status and error type
pub fn engine_error_response(err: &EngineError) -> Response<ResponseBody> {
    match err {
        EngineError::ScriptFormat(_) => error_response(
            StatusCode::BAD_REQUEST,
            err.to_string(),
            "invalid_request_error",
        ),
        EngineError::NoSession(_) | EngineError::NoMatchingRule { .. } => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            err.to_string(),
            "server_error",
        ),
    }
}

/// Collect request body into bytes
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}

#[cfg(test)]
pub(crate) async fn body_json(resp: Response<ResponseBody>) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
