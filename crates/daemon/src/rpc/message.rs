// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC 2.0 message helpers: validation and response construction.

use serde_json::{json, Value};

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl ErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid parameters",
            ErrorCode::InternalError => "Internal error",
        }
    }
}

pub fn id(msg: &Value) -> Option<&Value> {
    msg.get("id")
}

pub fn method(msg: &Value) -> Option<&str> {
    msg.get("method")?.as_str()
}

pub fn params(msg: &Value) -> Option<&Value> {
    msg.get("params")
}

fn is_version(msg: &Value) -> bool {
    msg.get("jsonrpc")
        .and_then(Value::as_str)
        .is_some_and(|v| v.eq_ignore_ascii_case(JSONRPC_VERSION))
}

/// A request carries `jsonrpc`, `method` and an `id`.
pub fn is_request(msg: &Value) -> bool {
    msg.is_object() && id(msg).is_some() && method(msg).is_some() && is_version(msg)
}

/// A notification is a request without an `id`.
pub fn is_notification(msg: &Value) -> bool {
    msg.is_object() && id(msg).is_none() && method(msg).is_some() && is_version(msg)
}

pub fn is_batch(msg: &Value) -> bool {
    msg.is_array()
}

/// Success response carrying `result`. Notifications elide responses, so
/// this returns `None` when the request has no `id`.
pub fn response_result(request: &Value, result: Value) -> Option<Value> {
    let id = id(request)?.clone();
    Some(json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    }))
}

/// Error response. With no request (e.g. a parse failure before the `id`
/// is known) the `id` is JSON `null`.
pub fn response_error(request: Option<&Value>, code: ErrorCode, message: Option<&str>) -> Value {
    let id = request.and_then(id).cloned().unwrap_or(Value::Null);
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": {
            "code": code.code(),
            "message": message.unwrap_or_else(|| code.default_message()),
        },
    })
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
