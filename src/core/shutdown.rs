//! # OS termination signals.
//!
//! [`wait_for_shutdown_signal`] completes with the [`ShutdownSignal`] that arrived.
//! Used by [`TopicRegistry::shutdown_on_signal`](crate::TopicRegistry::shutdown_on_signal).
//!
//! - **Unix**: `SIGINT` (Ctrl-C), `SIGTERM`, `SIGQUIT`
//! - **Elsewhere**: Ctrl-C via [`tokio::signal::ctrl_c`]

use std::io;

/// Signal that requested the shutdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ShutdownSignal {
    Interrupt,
    #[cfg_attr(not(unix), allow(dead_code))]
    Terminate,
    #[cfg_attr(not(unix), allow(dead_code))]
    Quit,
}

impl ShutdownSignal {
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "interrupt",
            ShutdownSignal::Terminate => "terminate",
            ShutdownSignal::Quit => "quit",
        }
    }
}

/// Waits for the first termination signal. Fails if a handler cannot be installed.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> io::Result<ShutdownSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let received = tokio::select! {
        _ = interrupt.recv() => ShutdownSignal::Interrupt,
        _ = terminate.recv() => ShutdownSignal::Terminate,
        _ = quit.recv() => ShutdownSignal::Quit,
    };
    Ok(received)
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> io::Result<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_name_the_signal() {
        assert_eq!(ShutdownSignal::Interrupt.as_label(), "interrupt");
        assert_eq!(ShutdownSignal::Terminate.as_label(), "terminate");
        assert_eq!(ShutdownSignal::Quit.as_label(), "quit");
    }
}
