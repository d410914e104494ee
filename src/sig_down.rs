//! SIGINT/SIGTERM → [`CancellationToken`].

use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

/// Cancels its token on the first SIGINT or SIGTERM.
pub struct SigDown {
    cancellation_token: CancellationToken,
}

impl SigDown {
    /// Install the signal handlers. Must be called inside a tokio runtime.
    pub fn try_new() -> std::io::Result<Self> {
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let cancellation_token = CancellationToken::new();
        let token = cancellation_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => tracing::info!("SIGINT received, shutting down"),
                _ = sigterm.recv() => tracing::info!("SIGTERM received, shutting down"),
            }
            token.cancel();
        });
        Ok(Self { cancellation_token })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}
