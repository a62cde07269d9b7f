//! Startup and teardown ordering.
//!
//! `Created → Loaded → Configured → Attached → Running → Draining → Detached → Closed`.
//! A failed step jumps forward to release: detach, then close. Nothing is retried.

use std::time::Duration;

use sysprobe_common::Config;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
	channel::EventSource,
	consumer::{ConsumerStats, EventConsumer},
	sink::SinkSet,
	Error, Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
	Created,
	Loaded,
	Configured,
	Attached,
	Running,
	Draining,
	Detached,
	Closed,
}

#[derive(Debug)]
pub struct Lifecycle {
	phase: Phase,
}

impl Lifecycle {
	pub fn new() -> Self {
		Self { phase: Phase::Created }
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	/// Moves to `to`, which must be strictly later than the current phase.
	pub fn advance(&mut self, to: Phase) -> Result<()> {
		if to <= self.phase {
			return Err(Error::InvalidTransition { from: self.phase, to });
		}
		debug!("lifecycle {:?} -> {:?}", self.phase, to);
		self.phase = to;
		Ok(())
	}
}

/// What the controller drives. Implemented over aya for the real probes and faked in tests.
pub trait TracerBackend {
	type Channel: EventSource;

	/// Parses the object and gets every program through the verifier.
	fn load(&mut self) -> Result<()>;

	fn configure(&mut self, config: Config) -> Result<()>;

	/// Attaches every probe, or none.
	fn attach(&mut self) -> Result<()>;

	fn open_channel(&mut self) -> Result<Self::Channel>;

	/// Idempotent, never fails; problems are logged.
	fn detach(&mut self);

	/// Releases the loaded object. Idempotent.
	fn close(&mut self);
}

#[derive(Clone, Copy, Debug)]
pub struct RunSettings {
	pub poll_timeout: Duration,
	pub drain_timeout: Duration,
}

impl Default for RunSettings {
	fn default() -> Self {
		Self {
			poll_timeout: Duration::from_millis(100),
			drain_timeout: Duration::from_millis(100),
		}
	}
}

pub struct LifecycleController<B: TracerBackend> {
	backend: B,
	lifecycle: Lifecycle,
	settings: RunSettings,
}

impl<B: TracerBackend> LifecycleController<B> {
	pub fn new(backend: B, settings: RunSettings) -> Self {
		Self {
			backend,
			lifecycle: Lifecycle::new(),
			settings,
		}
	}

	pub fn phase(&self) -> Phase {
		self.lifecycle.phase()
	}

	/// Runs the whole tracer until `stop` is cancelled. Whatever happens, probes are
	/// detached and the object closed before this returns. A channel that dies before
	/// the stop request, or fails to close, makes the run an error.
	pub async fn run(&mut self, config: Config, sinks: &mut SinkSet, stop: CancellationToken) -> Result<ConsumerStats> {
		let mut channel = match self.start(config) {
			Ok(channel) => channel,
			Err(err) => {
				warn!("startup failed in phase {:?}: {err}", self.phase());
				self.release();
				return Err(err);
			}
		};

		println!("eBPF program loaded and attached successfully!");
		println!("Monitoring sys_read and sys_write calls...");
		println!();

		let mut consumer = EventConsumer::new(self.settings.poll_timeout);
		let consumed = consumer.run(&mut channel, sinks, &stop).await;

		println!("\nShutting down...");
		self.enter(Phase::Draining);
		if consumed.is_ok() {
			consumer.drain(&mut channel, sinks, self.settings.drain_timeout);
		}

		let lost = channel.lost();
		let closed = channel.close().await;
		if let Err(err) = &closed {
			warn!("event channel did not close cleanly: {err}");
		}
		self.release();

		consumed?;
		closed?;
		let stats = consumer.stats(lost);
		info!("consumer stopped: {} events delivered, {} lost", stats.delivered, stats.lost);
		Ok(stats)
	}

	fn start(&mut self, config: Config) -> Result<B::Channel> {
		self.backend.load()?;
		self.lifecycle.advance(Phase::Loaded)?;

		self.backend.configure(config)?;
		self.lifecycle.advance(Phase::Configured)?;

		self.backend.attach()?;
		self.lifecycle.advance(Phase::Attached)?;

		let channel = self.backend.open_channel()?;
		self.lifecycle.advance(Phase::Running)?;

		Ok(channel)
	}

	/// Detach, then close. Safe from any phase.
	fn release(&mut self) {
		self.backend.detach();
		self.enter(Phase::Detached);
		self.backend.close();
		self.enter(Phase::Closed);
	}

	fn enter(&mut self, phase: Phase) {
		if let Err(err) = self.lifecycle.advance(phase) {
			debug!("{err}");
		}
	}
}

// region:    --- Tests


// endregion: --- Tests
