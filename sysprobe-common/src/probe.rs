//! Probe engine shared by every syscall entry program.
//!
//! Runs in kernel context: no allocation, bounded loops only, no blocking. Everything the
//! probe may touch goes through [`ProbeEnv`], which the eBPF crate backs with
//! helpers and maps.

use crate::{Config, Event, Syscall, COMM_LEN};

/// What a probe can reach while it runs.
pub trait ProbeEnv {
	/// Current control record, `None` until userspace has written it.
	fn config(&self) -> Option<&Config>;

	fn pid_tgid(&self) -> u64;

	fn comm(&self) -> [u8; COMM_LEN];

	/// Monotonic clock in nanoseconds.
	fn ktime_ns(&self) -> u64;

	/// Hands the event to the per-CPU channel. A full buffer drops it.
	fn submit(&self, event: &Event);

	/// Best-effort line on the debug channel, never on the event channel.
	fn diagnose(&self, event: &Event);
}

/// Captures one syscall entry. Always returns 0 so the traced call is unaffected.
#[inline(always)]
pub fn trace_entry<E: ProbeEnv>(env: &E, syscall: Syscall) -> u32 {
	let verbose = match env.config() {
		Some(config) => config.is_verbose(),
		None => return 0,
	};

	let pid_tgid = env.pid_tgid();
	let event = Event {
		pid: pid_tgid as u32,
		tgid: (pid_tgid >> 32) as u32,
		comm: env.comm(),
		func_name: syscall.func_name(),
		timestamp: env.ktime_ns(),
	};

	env.submit(&event);

	if verbose {
		env.diagnose(&event);
	}

	0
}

// region:    --- Tests


// endregion: --- Tests
