use std::{fmt, sync::Arc, time::SystemTime};

use sysprobe_common::Event;
use zerocopy::FromBytes;

use crate::{Error, Result};

/// Consumer-side copy of an [`Event`] with its text fields decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyscallEvent {
	pub pid: u32,
	pub tgid: u32,
	pub comm: Arc<str>,
	pub func_name: Arc<str>,
	pub timestamp: u64,
}

impl From<&Event> for SyscallEvent {
	fn from(evt: &Event) -> Self {
		Self {
			pid: evt.pid,
			tgid: evt.tgid,
			comm: Arc::from(String::from_utf8_lossy(evt.comm_bytes())),
			func_name: Arc::from(String::from_utf8_lossy(evt.func_name_bytes())),
			timestamp: evt.timestamp,
		}
	}
}

impl SyscallEvent {
	/// `[<wall clock>] hello <func_name> was called by <comm> (PID: <pid>, TGID: <tgid>)`
	pub fn detailed_line(&self, now: SystemTime) -> String {
		format!(
			"[{}] {} by {} (PID: {}, TGID: {})",
			humantime::format_rfc3339_nanos(now),
			self,
			self.comm,
			self.pid,
			self.tgid
		)
	}
}

impl fmt::Display for SyscallEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "hello {} was called", self.func_name)
	}
}

/// Copies an `Event` out of a raw perf sample. Trailing bytes are ignored.
pub fn parse_event_from_bytes(data: &[u8]) -> Result<Event> {
	let (evt, _rest) = Event::read_from_prefix(data).map_err(|_| Error::InvalidEventSize(data.len()))?;
	Ok(evt)
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>; // For tests.

	use super::*;
	use std::time::{Duration, UNIX_EPOCH};
	use sysprobe_common::{padded, Syscall, EVENT_SIZE};
	use zerocopy::IntoBytes;

	fn fx_event(syscall: Syscall) -> Event {
		Event {
			pid: 101,
			tgid: 100,
			comm: padded(b"bash"),
			func_name: syscall.func_name(),
			timestamp: 42,
		}
	}

	#[test]
	fn event_parse_from_unaligned_sample() -> Result<()> {
		// -- Setup & Fixtures
		let fx_evt = fx_event(Syscall::Write);
		let mut raw = vec![0u8; EVENT_SIZE + 1];
		raw[1..].copy_from_slice(fx_evt.as_bytes());

		// -- Exec
		let evt = parse_event_from_bytes(&raw[1..])?;

		// -- Check
		assert_eq!(evt, fx_evt);
		Ok(())
	}

	#[test]
	fn event_parse_rejects_truncated_sample() {
		let fx_evt = fx_event(Syscall::Read);

		let res = parse_event_from_bytes(&fx_evt.as_bytes()[..EVENT_SIZE - 8]);

		assert!(matches!(res, Err(Error::InvalidEventSize(40))));
	}

	#[test]
	fn event_decode_preserves_fields() -> Result<()> {
		// -- Setup & Fixtures
		let fx_evt = Event {
			comm: *b"sixteen-chars-xx",
			..fx_event(Syscall::Read)
		};

		// -- Exec
		let evt = SyscallEvent::from(&parse_event_from_bytes(fx_evt.as_bytes())?);

		// -- Check
		assert_eq!(evt.pid, 101);
		assert_eq!(evt.tgid, 100);
		assert_eq!(&*evt.comm, "sixteen-chars-xx");
		assert_eq!(&*evt.func_name, "sys_read");
		assert_eq!(evt.timestamp, 42);
		Ok(())
	}

	#[test]
	fn event_lines_match_log_formats() {
		// -- Setup & Fixtures
		let evt = SyscallEvent::from(&fx_event(Syscall::Write));
		let fx_now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

		// -- Exec
		let short = evt.to_string();
		let detailed = evt.detailed_line(fx_now);

		// -- Check
		assert_eq!(short, "hello sys_write was called");
		assert_eq!(
			detailed,
			"[2023-11-14T22:13:20.000000000Z] hello sys_write was called by bash (PID: 101, TGID: 100)"
		);
	}
}

// endregion: --- Tests
