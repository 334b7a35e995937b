//! Stop requests from the OS and from background code.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::DaemonError;

/// Lifecycle signal delivered to the host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    /// Stop the service (SIGTERM, SIGINT, Ctrl-C, or a fatal startup error).
    Shutdown,
    /// SIGHUP. Definitions are loaded once, so this is only logged.
    Reload,
}

impl std::fmt::Display for HostSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostSignal::Shutdown => write!(f, "SHUTDOWN"),
            HostSignal::Reload => write!(f, "RELOAD"),
        }
    }
}

/// Ability to ask the hosting process to stop.
pub trait HostControl: Send + Sync {
    fn request_stop(&self);
}

/// Fans OS signals and stop requests out to subscribers.
#[derive(Clone)]
pub struct SignalHandler {
    sender: broadcast::Sender<HostSignal>,
    shutdown_requested: Arc<AtomicBool>,
}

impl SignalHandler {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self {
            sender,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostSignal> {
        self.sender.subscribe()
    }

    pub fn send(&self, signal: HostSignal) {
        debug!("Sending signal: {}", signal);
        if signal == HostSignal::Shutdown {
            self.shutdown_requested.store(true, Ordering::SeqCst);
        }
        let _ = self.sender.send(signal);
    }

    pub fn request_shutdown(&self) {
        self.send(HostSignal::Shutdown);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Wait until a shutdown is requested. Returns at once if one already was.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.subscribe();
        if self.is_shutdown_requested() {
            return;
        }
        loop {
            match rx.recv().await {
                Ok(HostSignal::Shutdown) | Err(broadcast::error::RecvError::Closed) => return,
                Ok(HostSignal::Reload) => {
                    warn!("Reload is not supported; restart the service to apply new definitions");
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    if self.is_shutdown_requested() {
                        return;
                    }
                }
            }
        }
    }

    /// Install OS signal handlers (Unix).
    #[cfg(unix)]
    pub fn install_os_handlers(&self) -> Result<(), DaemonError> {
        use tokio::signal::unix::{SignalKind, signal};

        let listen = |kind: SignalKind, name: &'static str, forward: HostSignal| {
            let mut stream = signal(kind).map_err(|e| DaemonError::SignalSetup(e.to_string()))?;
            let handler = self.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    info!("Received {}", name);
                    handler.send(forward);
                }
            });
            Ok::<(), DaemonError>(())
        };

        listen(SignalKind::terminate(), "SIGTERM", HostSignal::Shutdown)?;
        listen(SignalKind::interrupt(), "SIGINT", HostSignal::Shutdown)?;
        listen(SignalKind::hangup(), "SIGHUP", HostSignal::Reload)?;

        info!("OS signal handlers installed (SIGTERM, SIGINT, SIGHUP)");
        Ok(())
    }

    /// Install OS signal handlers (non-Unix fallback).
    #[cfg(not(unix))]
    pub fn install_os_handlers(&self) -> Result<(), DaemonError> {
        let handler = self.clone();

        // Only Ctrl+C is available on non-Unix
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received Ctrl+C");
                handler.request_shutdown();
            }
        });

        info!("OS signal handlers installed (Ctrl+C only)");
        Ok(())
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl HostControl for SignalHandler {
    fn request_stop(&self) {
        info!("Stop requested");
        self.request_shutdown();
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
