// src/lib.rs

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod tree;
pub mod watch;

use tracing::{debug, warn};

use crate::config::StalkConfig;
use crate::dispatch::Dispatcher;
use crate::errors::Result;
use crate::exec::ShellCommandRunner;
use crate::fs::RealFileSystem;
use crate::watch::NotifyService;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the `notify`-backed notification service
/// - the shell command runner
/// - directory enumeration + registration (via [`Dispatcher::setup`])
/// - Ctrl-C / SIGTERM handling
///
/// Returns `Ok(())` only after a shutdown signal.
pub async fn run(config: StalkConfig) -> Result<()> {
    debug!(?config, "starting stalk");

    let service = NotifyService::new()?;
    let runner = ShellCommandRunner::new(config.shell.clone());
    let dispatcher = Dispatcher::setup(&config, &RealFileSystem, service, runner)?;

    dispatcher.run(shutdown_signal()).await
}

/// Resolves on Ctrl-C (and SIGTERM on unix).
///
/// If no signal handler can be installed, never resolves: the process is
/// then only stopped by being killed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
