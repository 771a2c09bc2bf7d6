// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command table: named RPC methods bound to their owning modules.
//!
//! Commands are registered explicitly at daemon start. A handler receives
//! the full request value and returns the complete response, or `None` for
//! notifications.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::debug;

use super::message::{self, ErrorCode};
use crate::adapters::{Shell, VpnControl};

/// Coarse per-command access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Root,
    User,
}

pub type CommandFuture = Pin<Box<dyn Future<Output = Option<Value>> + Send>>;
pub type CommandHandler = Arc<dyn Fn(Value) -> CommandFuture + Send + Sync>;

pub struct Command {
    pub name: &'static str,
    pub desc: &'static str,
    pub usage: &'static str,
    pub access: Access,
    /// Owning module, for documentation.
    pub module: &'static str,
    pub handler: CommandHandler,
}

impl Command {
    fn descriptor(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.desc,
            "usage": self.usage,
        })
    }
}

/// Registry of all commands, in registration order.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<Vec<Arc<Command>>>,
}

impl CommandRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, command: Command) {
        debug!(command = command.name, module = command.module, "registered command");
        self.commands.write().push(Arc::new(command));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.commands.read().iter().find(|c| c.name == name).cloned()
    }

    pub fn descriptors(&self) -> Value {
        Value::Array(self.commands.read().iter().map(|c| c.descriptor()).collect())
    }
}

/// Register the commands that belong to no domain component: `list`,
/// `update` and `openvpn`.
pub fn register_core_commands(
    registry: &Arc<CommandRegistry>,
    shell: Arc<dyn Shell>,
    vpn: Arc<dyn VpnControl>,
    script_dir: PathBuf,
) {
    let weak: Weak<CommandRegistry> = Arc::downgrade(registry);
    registry.register(Command {
        name: "list",
        desc: "List available commands.",
        usage: r#"{"jsonrpc": "2.0", "method": "list", "id": 42}"#,
        access: Access::User,
        module: "command",
        handler: Arc::new(move |request| {
            let weak = weak.clone();
            Box::pin(async move {
                let Some(registry) = weak.upgrade() else {
                    return Some(message::response_error(
                        Some(&request),
                        ErrorCode::InternalError,
                        None,
                    ));
                };
                message::response_result(&request, registry.descriptors())
            })
        }),
    });

    registry.register(Command {
        name: "update",
        desc: "Run the system update recipe.",
        usage: r#"{"jsonrpc": "2.0", "method": "update", "id": 42}"#,
        access: Access::Root,
        module: "command",
        handler: Arc::new(move |request| {
            let shell = Arc::clone(&shell);
            let script = script_dir.join("do_update.sh");
            Box::pin(async move {
                match shell.exec(&script, &[]).await {
                    Ok(out) if out.success() => {
                        message::response_result(&request, Value::String("OK".into()))
                    }
                    _ => Some(message::response_error(
                        Some(&request),
                        ErrorCode::InternalError,
                        Some("Internal error while running the update recipe"),
                    )),
                }
            })
        }),
    });

    registry.register(Command {
        name: "openvpn",
        desc: "Control the OpenVPN daemon: state, start, stop, restart.",
        usage: r#"{"jsonrpc": "2.0", "method": "openvpn", "params": "state", "id": 42}"#,
        access: Access::Root,
        module: "openvpn",
        handler: Arc::new(move |request| {
            let vpn = Arc::clone(&vpn);
            Box::pin(async move { handle_openvpn(&*vpn, request).await })
        }),
    });
}

async fn handle_openvpn(vpn: &dyn VpnControl, request: Value) -> Option<Value> {
    let Some(action) = message::params(&request).and_then(Value::as_str) else {
        return Some(message::response_error(
            Some(&request),
            ErrorCode::InvalidParams,
            Some("Invalid parameters - params should be a string"),
        ));
    };

    let result = match action {
        "state" => match vpn.state().await {
            Ok(lines) => Ok(serde_json::to_value(lines).unwrap_or(Value::Null)),
            Err(e) => Err(e),
        },
        "start" => vpn.start().await.map(|()| Value::String("OK".into())),
        "stop" => vpn.stop().await.map(|()| Value::String("OK".into())),
        "restart" => vpn.restart().await.map(|()| Value::String("OK".into())),
        _ => {
            return Some(message::response_error(
                Some(&request),
                ErrorCode::InvalidParams,
                Some("Invalid parameters - unknown action"),
            ))
        }
    };

    match result {
        Ok(value) => message::response_result(&request, value),
        Err(e) => Some(message::response_error(
            Some(&request),
            ErrorCode::InternalError,
            Some(&e.to_string()),
        )),
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
