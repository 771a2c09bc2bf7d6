// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! nakd - supervisory daemon for the network-access appliance.
//!
//! Architecture:
//! - Worker pool: all deferred work funnels through the workqueue
//! - Timer tasks: periodic monitors, coalesced by task name
//! - Connection server: JSON-RPC 2.0 over a local stream socket

use std::process::ExitCode;

use nak_daemon::lifecycle::{self, Adapters, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

fn print_help() {
    println!("nakd {}", env!("CARGO_PKG_VERSION"));
    println!("Supervisory daemon for the network-access appliance.");
    println!();
    println!("USAGE:");
    println!("    nakd [--stderr]");
    println!();
    println!("OPTIONS:");
    println!("    --stderr         Log to standard error instead of the log file");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut log_to_stderr = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--stderr" => log_to_stderr = true,
            "--version" | "-V" | "-v" => {
                println!("nakd {}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            "--help" | "-h" | "help" => {
                print_help();
                return ExitCode::SUCCESS;
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: nakd [--stderr | --help | --version]");
                return ExitCode::FAILURE;
            }
        }
    }

    let config = Config::load();
    let _log_guard = match setup_logging(&config, log_to_stderr) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: couldn't set up logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("starting nakd");

    let adapters = match Adapters::production(&config) {
        Ok(adapters) => adapters,
        Err(e) => {
            error!("failed to start daemon: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (state, listener) = match lifecycle::startup(config, adapters).await {
        Ok(result) => result,
        Err(LifecycleError::LockFailed(_)) => {
            eprintln!("nakd is already running");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("failed to start daemon: {e}");
            return ExitCode::FAILURE;
        }
    };

    state.serve(listener);
    info!(socket = %state.config.socket_path.display(), "daemon ready");

    if let Err(e) = signal_loop().await {
        error!("signal handling failed: {e}");
        state.shutdown().await;
        return ExitCode::FAILURE;
    }

    state.shutdown().await;
    info!("daemon stopped");
    ExitCode::SUCCESS
}

/// Block until a terminating signal arrives. SIGHUP is logged and ignored.
async fn signal_loop() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigquit = signal(SignalKind::quit())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down...");
                return Ok(());
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down...");
                return Ok(());
            }
            _ = sigquit.recv() => {
                info!("received SIGQUIT, shutting down...");
                return Ok(());
            }
            _ = sighup.recv() => {
                info!("ignoring SIGHUP");
            }
        }
    }
}

type LogGuard = Option<tracing_appender::non_blocking::WorkerGuard>;

fn setup_logging(config: &Config, stderr: bool) -> Result<LogGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    }

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = config
        .log_path
        .parent()
        .ok_or_else(|| std::io::Error::other("log path has no parent"))?;
    let name = config
        .log_path
        .file_name()
        .ok_or_else(|| std::io::Error::other("log path has no file name"))?;
    let appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();
    Ok(Some(guard))
}
