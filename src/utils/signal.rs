use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Resolves on Ctrl+C and cancels `token` so background jobs stop with the server.
pub async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            crate::error::log_error(&e);
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            #[cfg(not(windows))]
            println!();
            tracing::info!("Ctrl+C recieved. Please wait, this could take a while.");
        }
        _ = token.cancelled() => {}
    }

    token.cancel();
}
