// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection server: accepts clients on the local stream socket and runs
//! one task per connection.
//!
//! Messages are length-agnostic JSON-RPC values; framing is recovered with
//! an incremental parse over the connection's receive buffer. A parse
//! failure yields a Parse error response and resets the buffer; the
//! connection continues.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{unix::OwnedWriteHalf, UnixListener, UnixStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::rpc::message::{self, ErrorCode};
use crate::rpc::{router, CommandRegistry};

const RECV_CHUNK: usize = 4096;

pub struct Server {
    listener: UnixListener,
    registry: Arc<CommandRegistry>,
    limit: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl Server {
    pub fn new(
        listener: UnixListener,
        registry: Arc<CommandRegistry>,
        max_connections: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            listener,
            registry,
            limit: Arc::new(Semaphore::new(max_connections)),
            shutdown,
        }
    }

    /// Accept loop. Each accepted connection takes a semaphore permit for
    /// its lifetime, bounding concurrency.
    pub async fn run(self) {
        loop {
            let permit = tokio::select! {
                _ = self.shutdown.cancelled() => return,
                permit = Arc::clone(&self.limit).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };
            let stream = tokio::select! {
                _ = self.shutdown.cancelled() => return,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                },
            };
            info!(
                active = self.limit.available_permits(),
                "connection accepted"
            );
            let registry = Arc::clone(&self.registry);
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                handle_connection(stream, registry, shutdown).await;
                drop(permit);
            });
        }
    }
}

/// Per-connection message loop: read, frame, dispatch, reply.
async fn handle_connection(
    stream: UnixStream,
    registry: Arc<CommandRegistry>,
    shutdown: CancellationToken,
) {
    let (mut reader, mut writer) = stream.into_split();
    let mut buf: Vec<u8> = Vec::with_capacity(RECV_CHUNK);
    let mut chunk = [0u8; RECV_CHUNK];

    loop {
        // drain every complete value currently in the buffer
        loop {
            if buf.is_empty() {
                break;
            }
            let mut values = serde_json::Deserializer::from_slice(&buf).into_iter::<Value>();
            match values.next() {
                Some(Ok(msg)) => {
                    let consumed = values.byte_offset();
                    buf.drain(..consumed);
                    debug!(bytes = consumed, "parsed a complete message");
                    if let Some(response) = router::handle_message(&registry, msg).await {
                        if !send_response(&mut writer, &response).await {
                            return;
                        }
                    }
                }
                Some(Err(e)) if e.is_eof() => {
                    debug!("partial message, reading more");
                    break;
                }
                Some(Err(e)) => {
                    warn!("couldn't parse client message: {e}");
                    let response = message::response_error(None, ErrorCode::ParseError, None);
                    if !send_response(&mut writer, &response).await {
                        return;
                    }
                    buf.clear();
                    break;
                }
                // nothing but whitespace left
                None => {
                    buf.clear();
                    break;
                }
            }
        }

        let read = tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("shutting down connection");
                return;
            }
            read = reader.read(&mut chunk) => read,
        };
        match read {
            Ok(0) => {
                debug!("client hung up");
                return;
            }
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                debug!("read error, closing connection: {e}");
                return;
            }
        }
    }
}

/// Serialize and send a response in full. Returns false when the
/// connection should be closed.
async fn send_response(writer: &mut OwnedWriteHalf, response: &Value) -> bool {
    let text = response.to_string();
    if let Err(e) = writer.write_all(text.as_bytes()).await {
        warn!("couldn't send response, closing connection: {e}");
        return false;
    }
    debug!(bytes = text.len(), "response sent");
    true
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
