use std::time::{Duration, Instant};

use sysprobe_common::Event;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{channel::EventSource, event::SyscallEvent, sink::SinkSet, Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsumerStats {
	pub delivered: u64,
	pub lost: u64,
}

/// Polls an [`EventSource`] and forwards each record to the sinks exactly once.
pub struct EventConsumer {
	poll_timeout: Duration,
	delivered: u64,
}

impl EventConsumer {
	pub fn new(poll_timeout: Duration) -> Self {
		Self {
			poll_timeout,
			delivered: 0,
		}
	}

	/// Loops until `stop` is cancelled. A poll in flight when the stop arrives is abandoned;
	/// records it would have returned stay queued for `drain`.
	/// The channel closing before a stop request is an error: its producers are gone.
	pub async fn run<C: EventSource>(
		&mut self,
		channel: &mut C,
		sinks: &mut SinkSet,
		stop: &CancellationToken,
	) -> Result<()> {
		while !stop.is_cancelled() {
			let batch = tokio::select! {
				_ = stop.cancelled() => break,
				res = channel.poll(self.poll_timeout) => res,
			};
			match batch {
				Ok(batch) => self.forward(batch, sinks),
				Err(Error::ChannelClosed) => {
					warn!("event channel closed before stop was requested");
					return Err(Error::ChannelClosed);
				}
				Err(err) => return Err(err),
			}
		}
		Ok(())
	}

	/// Forwards what is already queued, never waiting for new records. Stops when the
	/// queue is empty or `budget` is spent, whichever comes first.
	pub fn drain<C: EventSource>(&mut self, channel: &mut C, sinks: &mut SinkSet, budget: Duration) {
		let deadline = Instant::now() + budget;
		while Instant::now() < deadline {
			let batch = channel.try_drain();
			if batch.is_empty() {
				break;
			}
			debug!("drained {} events", batch.len());
			self.forward(batch, sinks);
		}
	}

	pub fn stats(&self, lost: u64) -> ConsumerStats {
		ConsumerStats {
			delivered: self.delivered,
			lost,
		}
	}

	fn forward(&mut self, batch: Vec<Event>, sinks: &mut SinkSet) {
		for evt in &batch {
			sinks.dispatch(&SyscallEvent::from(evt));
			self.delivered += 1;
		}
	}
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use crate::{
		channel::MemoryEventChannel,
		sink::{ConsoleSink, Sink},
		test_support::{fx_event, SharedBuf},
	};
	use sysprobe_common::Syscall;

	struct BrokenSink;

	impl Sink for BrokenSink {
		fn name(&self) -> &str {
			"broken"
		}

		fn write_event(&mut self, _evt: &SyscallEvent) -> crate::Result<()> {
			Err(Error::custom("log file unwritable"))
		}
	}

	fn fx_sinks() -> (SinkSet, SharedBuf) {
		let buf = SharedBuf::default();
		let mut sinks = SinkSet::new();
		sinks.push(BrokenSink);
		sinks.push(ConsoleSink::new(buf.clone()));
		(sinks, buf)
	}

	#[tokio::test]
	async fn consumer_forwards_each_event_once() -> Result<()> {
		// -- Setup & Fixtures
		let mut chan = MemoryEventChannel::new(16);
		let producer = chan.producer();
		producer.submit(fx_event(Syscall::Read, 0));
		producer.submit(fx_event(Syscall::Write, 0));
		let (mut sinks, buf) = fx_sinks();
		let stop = CancellationToken::new();
		let mut consumer = EventConsumer::new(Duration::from_millis(10));

		// -- Exec
		let stopper = {
			let stop = stop.clone();
			tokio::spawn(async move {
				tokio::time::sleep(Duration::from_millis(60)).await;
				stop.cancel();
			})
		};
		consumer.run(&mut chan, &mut sinks, &stop).await?;
		stopper.await?;

		// -- Check
		let mut lines = buf.lines();
		lines.sort();
		assert_eq!(lines, vec!["hello sys_read was called", "hello sys_write was called"]);
		assert_eq!(consumer.stats(chan.lost()), ConsumerStats { delivered: 2, lost: 0 });
		Ok(())
	}

	#[tokio::test]
	async fn consumer_stops_without_waiting_out_the_poll() -> Result<()> {
		// -- Setup & Fixtures
		let mut chan = MemoryEventChannel::new(4);
		let (mut sinks, _buf) = fx_sinks();
		let stop = CancellationToken::new();
		let poll_timeout = Duration::from_millis(500);
		let mut consumer = EventConsumer::new(poll_timeout);

		// -- Exec
		let canceller = {
			let stop = stop.clone();
			tokio::spawn(async move {
				tokio::time::sleep(Duration::from_millis(30)).await;
				stop.cancel();
			})
		};
		let start = Instant::now();
		consumer.run(&mut chan, &mut sinks, &stop).await?;
		canceller.await?;

		// -- Check
		assert!(start.elapsed() < poll_timeout, "run took {:?}", start.elapsed());
		assert_eq!(consumer.stats(0).delivered, 0);
		Ok(())
	}

	#[tokio::test]
	async fn consumer_run_fails_when_channel_closes_before_stop() {
		// -- Setup & Fixtures
		let mut chan = MemoryEventChannel::new(4);
		let producer = chan.producer();
		producer.submit(fx_event(Syscall::Read, 0));
		chan.detach_producers();
		drop(producer);
		let (mut sinks, buf) = fx_sinks();
		let mut consumer = EventConsumer::new(Duration::from_millis(10));

		// -- Exec
		let res = consumer.run(&mut chan, &mut sinks, &CancellationToken::new()).await;

		// -- Check
		assert!(matches!(res, Err(Error::ChannelClosed)));
		assert_eq!(buf.lines(), vec!["hello sys_read was called"]);
	}

	#[test]
	fn consumer_drain_returns_at_once_on_idle_channel() {
		let mut chan = MemoryEventChannel::new(4);
		let (mut sinks, _buf) = fx_sinks();
		let mut consumer = EventConsumer::new(Duration::from_millis(10));

		let start = Instant::now();
		consumer.drain(&mut chan, &mut sinks, Duration::from_secs(5));

		assert!(start.elapsed() < Duration::from_secs(1));
	}

	#[tokio::test]
	async fn consumer_drain_forwards_buffered_events_after_stop() -> Result<()> {
		// -- Setup & Fixtures
		let mut chan = MemoryEventChannel::new(16);
		let producer = chan.producer();
		for _ in 0..3 {
			producer.submit(fx_event(Syscall::Write, 0));
		}
		let (mut sinks, buf) = fx_sinks();
		let stop = CancellationToken::new();
		stop.cancel();
		let mut consumer = EventConsumer::new(Duration::from_millis(10));

		// -- Exec
		consumer.run(&mut chan, &mut sinks, &stop).await?;
		consumer.drain(&mut chan, &mut sinks, Duration::from_millis(50));

		// -- Check
		assert_eq!(buf.lines().len(), 3);
		assert_eq!(consumer.stats(0).delivered, 3);
		Ok(())
	}
}

// endregion: --- Tests
