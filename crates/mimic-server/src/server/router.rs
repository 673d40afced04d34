//! Route dispatch for the emulator's HTTP surface.

use crate::server::handlers::{completions, emulator, models, system};
use crate::server::types::{
    collect_body, error_response, not_found, request_token, unauthorized, ResponseBody,
};
use crate::server::AppState;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

/// Parsed route below `/v1/`
#[derive(Debug, PartialEq, Eq)]
enum V1Route {
    /// /v1/models
    Models,
    /// /v1/models/:id
    Model(String),
    /// any other /v1/* path, answered from the script
    Scripted,
}

impl V1Route {
    /// Parse route from the path remainder after `/v1/`
    fn parse(rest: &str) -> Self {
        match rest.strip_prefix("models") {
            Some("") | Some("/") => V1Route::Models,
            Some(id) if id.starts_with('/') => V1Route::Model(id.trim_matches('/').to_string()),
            _ => V1Route::Scripted,
        }
    }
}

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<ResponseBody>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("{} {}", method, path);

    Ok(route_by_path(&method, &path, req, &state).await)
}

async fn route_by_path(
    method: &Method,
    path: &str,
    req: Request<Incoming>,
    state: &AppState,
) -> Response<ResponseBody> {
    match (method, path) {
        (_, "/healthz") => return system::handle_healthz(),
        (_, "/readyz") => return system::handle_readyz(),
        (&Method::POST, "/_emulator/script") => {
            let token = request_token(&req);
            return match collect_body(req).await {
                Ok(body) => emulator::handle_script(token.as_deref(), &body, state),
                Err(e) => error_response(StatusCode::BAD_REQUEST, e, "invalid_request_error"),
            };
        }
        (&Method::POST, "/_emulator/reset") => {
            return emulator::handle_reset(request_token(&req).as_deref(), state)
        }
        (&Method::GET, "/_emulator/state") => {
            return emulator::handle_state(request_token(&req).as_deref(), state)
        }
        _ => {}
    }

    if let Some(rest) = path.strip_prefix("/v1/") {
        return route_v1(method, path, rest, req, state).await;
    }

    not_found()
}

async fn route_v1(
    method: &Method,
    path: &str,
    rest: &str,
    req: Request<Incoming>,
    state: &AppState,
) -> Response<ResponseBody> {
    let token = request_token(&req);

    match (V1Route::parse(rest), token.as_deref()) {
        (V1Route::Models, Some(token)) => models::handle_list(token, state),
        (V1Route::Model(id), Some(token)) => models::handle_get(token, &id, state),
        (V1Route::Models | V1Route::Model(_), None) => unauthorized(),
        (V1Route::Scripted, _) => match collect_body(req).await {
            Ok(body) => {
                completions::handle_completion(token.as_deref(), method, path, &body, state)
            }
            Err(e) => error_response(StatusCode::BAD_REQUEST, e, "invalid_request_error"),
        },
    }
}
