use std::time::Duration;

use crate::{Error, Result};

/// Bounded, named channel. Senders wait for room; `Rx` offers timed and draining reads.
pub fn new_channel<T>(name: &'static str, capacity: usize) -> (Tx<T>, Rx<T>) {
	let (tx, rx) = flume::bounded(capacity);

	(Tx(tx, name), Rx(rx, name))
}

pub struct Tx<T>(flume::Sender<T>, &'static str);

impl<T> Tx<T> {
	pub async fn send(&self, value: impl Into<T>) -> Result<()> {
		self.0.send_async(value.into()).await?;
		Ok(())
	}

	/// Returns false when the value was not queued (channel full or closed).
	#[cfg(test)]
	pub fn try_send(&self, value: impl Into<T>) -> bool {
		self.0.try_send(value.into()).is_ok()
	}
}

impl<T> Clone for Tx<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone(), self.1)
	}
}

pub struct Rx<T>(flume::Receiver<T>, &'static str);

impl<T> Rx<T> {
	pub fn name(&self) -> &'static str {
		self.1
	}

	/// Waits up to `timeout` for one value. `Ok(None)` on timeout.
	pub async fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>> {
		match tokio::time::timeout(timeout, self.0.recv_async()).await {
			Ok(Ok(value)) => Ok(Some(value)),
			Ok(Err(_)) => Err(Error::ChannelClosed),
			Err(_elapsed) => Ok(None),
		}
	}

	/// Moves already queued values into `out` until it holds `max` items. Never waits.
	pub fn drain_into(&self, out: &mut Vec<T>, max: usize) {
		while out.len() < max {
			match self.0.try_recv() {
				Ok(value) => out.push(value),
				Err(_) => break,
			}
		}
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;

	#[tokio::test]
	async fn trx_recv_timeout_returns_none_when_idle() -> Result<()> {
		let (_tx, rx) = new_channel::<u32>("idle", 4);

		let res = rx.recv_timeout(Duration::from_millis(10)).await?;

		assert!(res.is_none());
		Ok(())
	}

	#[tokio::test]
	async fn trx_recv_timeout_reports_closed_channel() {
		let (tx, rx) = new_channel::<u32>("closed", 4);
		drop(tx);

		let res = rx.recv_timeout(Duration::from_millis(10)).await;

		assert!(matches!(res, Err(Error::ChannelClosed)));
	}

	#[tokio::test]
	async fn trx_drain_into_respects_max_and_order() -> Result<()> {
		// -- Setup & Fixtures
		let (tx, rx) = new_channel::<u32>("drain", 8);
		for i in 0..5u32 {
			tx.send(i).await?;
		}

		// -- Exec
		let mut out = Vec::new();
		rx.drain_into(&mut out, 3);

		// -- Check
		assert_eq!(out, vec![0, 1, 2]);
		rx.drain_into(&mut out, 10);
		assert_eq!(out, vec![0, 1, 2, 3, 4]);

		Ok(())
	}

	#[test]
	fn trx_try_send_fails_when_full() {
		let (tx, _rx) = new_channel::<u32>("full", 1);

		assert!(tx.try_send(1u32));
		assert!(!tx.try_send(2u32));
	}
}

// endregion: --- Tests
