use tokio::sync::watch;

/// Run-scoped cancellation. `true` once shutdown was requested; late
/// subscribers still observe it.
pub type ShutdownSender = watch::Sender<bool>;
pub type ShutdownReceiver = watch::Receiver<bool>;

#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(false)
}

/// Ask every holder of a receiver to stop. Idempotent.
pub fn request_shutdown(shutdown_tx: &ShutdownSender) {
    shutdown_tx.send_replace(true);
}

#[must_use]
pub fn is_shutdown(shutdown_rx: &ShutdownReceiver) -> bool {
    *shutdown_rx.borrow()
}

/// Resolves once shutdown is requested. Never resolves if every sender is
/// dropped without requesting it.
pub async fn wait_for_shutdown(shutdown_rx: &mut ShutdownReceiver) {
    let requested = shutdown_rx.wait_for(|stop| *stop).await.map(drop);
    if requested.is_err() {
        std::future::pending::<()>().await;
    }
}
