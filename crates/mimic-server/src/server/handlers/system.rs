//! Health probes.

use crate::server::types::{text_response, ResponseBody};
use hyper::{Response, StatusCode};

/// GET /healthz
pub fn handle_healthz() -> Response<ResponseBody> {
    text_response(StatusCode::OK, "OK")
}

/// GET /readyz
pub fn handle_readyz() -> Response<ResponseBody> {
    text_response(StatusCode::OK, "OK")
}
