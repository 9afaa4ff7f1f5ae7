use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;
use tracing::{debug, debug_span};

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let _span = debug_span!("request", id = %req.id, method = %req.method).entered();
    debug!("dispatch");

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::layout::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::sheets::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::setup::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
