use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::Result;

/// Cancels `token` on SIGINT or SIGTERM.
pub fn install_signal_handlers(token: CancellationToken) -> Result<()> {
	let t = token.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!("received SIGINT");
			t.cancel();
		}
	});

	let mut sigterm = signal(SignalKind::terminate())?;
	tokio::spawn(async move {
		if sigterm.recv().await.is_some() {
			info!("received SIGTERM");
			token.cancel();
		}
	});

	Ok(())
}
