//! Transport from the probes to the consumer.
//!
//! The kernel writes into one perf ring per CPU. A reader task per CPU copies the
//! records into a single bounded queue, which the consumer polls with a timeout.
//! Records from one CPU keep their order; nothing is promised across CPUs.

use std::{
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	time::Duration,
};

use aya::{
	maps::{
		perf::{AsyncPerfEventArray, AsyncPerfEventArrayBuffer, Events},
		Map, MapData,
	},
	util::online_cpus,
};
use bytes::BytesMut;
use sysprobe_common::{Event, EVENT_SIZE};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
	event::parse_event_from_bytes,
	supervisor::Supervisor,
	trx::{new_channel, Rx, Tx},
	Error, Result,
};

/// Upper bound on records returned by one `poll`.
pub const MAX_BATCH: usize = 1024;

const QUEUE_CAPACITY: usize = 4096;
const READ_BUFFERS: usize = 16;

pub trait EventSource {
	/// Waits up to `timeout` for records, then returns whatever is already queued without waiting again.
	/// An empty batch means the timeout elapsed.
	async fn poll(&mut self, timeout: Duration) -> Result<Vec<Event>>;

	/// Returns what is already queued, at most [`MAX_BATCH`] records. Never waits.
	fn try_drain(&mut self) -> Vec<Event>;

	/// Records known to have been dropped because a buffer was full.
	fn lost(&self) -> u64;

	/// Stops the producers feeding this source.
	async fn close(&mut self) -> Result<()>;
}

async fn poll_queue(rx: &Rx<Event>, timeout: Duration) -> Result<Vec<Event>> {
	let mut batch = Vec::new();
	if let Some(first) = rx.recv_timeout(timeout).await? {
		batch.push(first);
		rx.drain_into(&mut batch, MAX_BATCH);
	}
	Ok(batch)
}

fn drain_queue(rx: &Rx<Event>) -> Vec<Event> {
	let mut batch = Vec::new();
	rx.drain_into(&mut batch, MAX_BATCH);
	batch
}

// region:    --- Perf

pub struct PerfEventChannel {
	rx: Rx<Event>,
	lost: Arc<AtomicU64>,
	readers: Option<Supervisor>,
}

impl PerfEventChannel {
	/// Opens a ring of `page_count` pages on every online CPU and starts one reader per ring.
	pub fn open(map: Map, page_count: usize) -> Result<Self> {
		let mut perf_array = AsyncPerfEventArray::try_from(map)?;
		let cpus = online_cpus().map_err(|(msg, err)| Error::custom(format!("{msg}: {err}")))?;

		let (tx, rx) = new_channel::<Event>("perf_events", QUEUE_CAPACITY);
		let lost = Arc::new(AtomicU64::new(0));
		let mut readers = Supervisor::new();

		for cpu_id in cpus {
			let buf = perf_array.open(cpu_id, Some(page_count))?;
			let reader = CpuReader {
				cpu_id,
				buf,
				tx: tx.clone(),
				lost: lost.clone(),
				stop: readers.token(),
			};
			readers.spawn(reader.run());
		}
		debug!("{}: readers started, {page_count} pages per cpu", rx.name());

		Ok(Self {
			rx,
			lost,
			readers: Some(readers),
		})
	}
}

impl EventSource for PerfEventChannel {
	async fn poll(&mut self, timeout: Duration) -> Result<Vec<Event>> {
		poll_queue(&self.rx, timeout).await
	}

	fn try_drain(&mut self) -> Vec<Event> {
		drain_queue(&self.rx)
	}

	fn lost(&self) -> u64 {
		self.lost.load(Ordering::Relaxed)
	}

	async fn close(&mut self) -> Result<()> {
		match self.readers.take() {
			Some(readers) => readers.shutdown().await,
			None => Ok(()),
		}
	}
}

struct CpuReader {
	cpu_id: u32,
	buf: AsyncPerfEventArrayBuffer<MapData>,
	tx: Tx<Event>,
	lost: Arc<AtomicU64>,
	stop: CancellationToken,
}

impl CpuReader {
	async fn run(mut self) -> Result<()> {
		let mut bufs = (0..READ_BUFFERS)
			.map(|_| BytesMut::with_capacity(EVENT_SIZE))
			.collect::<Vec<_>>();

		loop {
			let events = tokio::select! {
				_ = self.stop.cancelled() => break,
				res = self.buf.read_events(&mut bufs) => res?,
			};

			for evt in decode_batch(self.cpu_id, &bufs, &events, &self.lost) {
				tokio::select! {
					_ = self.stop.cancelled() => return Ok(()),
					res = self.tx.send(evt) => {
						if res.is_err() {
							debug!("cpu {}: consumer gone, reader exiting", self.cpu_id);
							return Ok(());
						}
					}
				}
			}
		}

		Ok(())
	}
}

/// Decodes the first `events.read` samples of one read, skipping undecodable ones,
/// and adds the kernel-reported losses to `lost`.
fn decode_batch(cpu_id: u32, bufs: &[BytesMut], events: &Events, lost: &AtomicU64) -> Vec<Event> {
	if events.lost > 0 {
		lost.fetch_add(events.lost as u64, Ordering::Relaxed);
		warn!("cpu {cpu_id}: perf buffer full, dropped {} samples", events.lost);
	}

	bufs.iter()
		.take(events.read)
		.filter_map(|data| match parse_event_from_bytes(data) {
			Ok(evt) => Some(evt),
			Err(err) => {
				warn!("cpu {cpu_id}: skipping undecodable sample: {err}");
				None
			}
		})
		.collect()
}

// endregion: --- Perf

// region:    --- Memory

/// In-process stand-in for the perf channel: bounded, `submit` never waits and drops when full.
#[cfg(test)]
pub struct MemoryEventChannel {
	tx: Option<Tx<Event>>,
	rx: Rx<Event>,
	lost: Arc<AtomicU64>,
	closed: bool,
	close_error: Option<&'static str>,
}

#[cfg(test)]
#[derive(Clone)]
pub struct MemoryProducer {
	tx: Tx<Event>,
	lost: Arc<AtomicU64>,
}

#[cfg(test)]
impl MemoryEventChannel {
	pub fn new(capacity: usize) -> Self {
		let (tx, rx) = new_channel::<Event>("memory_events", capacity);
		Self {
			tx: Some(tx),
			rx,
			lost: Arc::new(AtomicU64::new(0)),
			closed: false,
			close_error: None,
		}
	}

	/// Panics once `detach_producers` has been called.
	pub fn producer(&self) -> MemoryProducer {
		let Some(tx) = self.tx.as_ref() else {
			panic!("producers already detached");
		};
		MemoryProducer {
			tx: tx.clone(),
			lost: self.lost.clone(),
		}
	}

	/// Drops the channel's own sender, so polling reports `ChannelClosed` once every
	/// producer handed out so far is gone and the queue is empty.
	pub fn detach_producers(&mut self) {
		self.tx = None;
	}

	/// Makes `close` fail, as a perf channel does when a reader task errored.
	pub fn fail_close_with(&mut self, msg: &'static str) {
		self.close_error = Some(msg);
	}

	pub fn is_closed(&self) -> bool {
		self.closed
	}
}

#[cfg(test)]
impl MemoryProducer {
	/// Returns false if the record was dropped.
	pub fn submit(&self, evt: Event) -> bool {
		let queued = self.tx.try_send(evt);
		if !queued {
			self.lost.fetch_add(1, Ordering::Relaxed);
		}
		queued
	}
}

#[cfg(test)]
impl EventSource for MemoryEventChannel {
	async fn poll(&mut self, timeout: Duration) -> Result<Vec<Event>> {
		poll_queue(&self.rx, timeout).await
	}

	fn try_drain(&mut self) -> Vec<Event> {
		drain_queue(&self.rx)
	}

	fn lost(&self) -> u64 {
		self.lost.load(Ordering::Relaxed)
	}

	async fn close(&mut self) -> Result<()> {
		self.closed = true;
		match self.close_error {
			Some(msg) => Err(Error::custom(msg)),
			None => Ok(()),
		}
	}
}

// endregion: --- Memory

// region:    --- Tests


// endregion: --- Tests
