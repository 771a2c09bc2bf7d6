// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request router: dispatches parsed JSON-RPC values by method name.

use serde_json::Value;
use tracing::debug;

use super::commands::CommandRegistry;
use super::message::{self, ErrorCode};

/// Handle a parsed message: a single request/notification or a batch.
/// Returns `None` when no response is owed (notifications, or a batch of
/// nothing but notifications).
pub async fn handle_message(registry: &CommandRegistry, msg: Value) -> Option<Value> {
    if message::is_batch(&msg) {
        let Value::Array(items) = msg else {
            return None;
        };
        let mut responses = Vec::new();
        for item in items {
            if let Some(response) = handle_single(registry, item).await {
                responses.push(response);
            }
        }
        if responses.is_empty() {
            return None;
        }
        return Some(Value::Array(responses));
    }
    handle_single(registry, msg).await
}

async fn handle_single(registry: &CommandRegistry, msg: Value) -> Option<Value> {
    if message::is_request(&msg) {
        // method() is present per is_request
        let name = message::method(&msg)?.to_string();
        debug!(method = %name, "handling request");
        match registry.get(&name) {
            Some(command) => {
                let response = (command.handler)(msg.clone()).await;
                Some(response.unwrap_or_else(|| {
                    message::response_error(Some(&msg), ErrorCode::InternalError, None)
                }))
            }
            None => Some(message::response_error(Some(&msg), ErrorCode::MethodNotFound, None)),
        }
    } else if message::is_notification(&msg) {
        if let Some(name) = message::method(&msg) {
            debug!(method = %name, "handling notification");
            if let Some(command) = registry.get(name) {
                // executed for effect; notifications elide responses
                let _ = (command.handler)(msg.clone()).await;
            }
        }
        None
    } else {
        Some(message::response_error(Some(&msg), ErrorCode::InvalidRequest, None))
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
