use crate::{trim_nul, COMM_LEN, FUNC_NAME_LEN};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Record pushed by a probe into the `EVENTS` perf array, one per traced call.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Event {
	pub pid: u32,                       //  0..4   | thread id, low word of pid_tgid
	pub tgid: u32,                      //  4..8   | process id, high word of pid_tgid
	pub comm: [u8; COMM_LEN],           //  8..24
	pub func_name: [u8; FUNC_NAME_LEN], // 24..40  | "sys_read" / "sys_write"
	pub timestamp: u64,                 // 40..48  | bpf_ktime_get_ns
}

pub const EVENT_SIZE: usize = 48;

const _: () = {
	assert!(core::mem::size_of::<Event>() == EVENT_SIZE);
	assert!(core::mem::align_of::<Event>() == 8);
	assert!(core::mem::offset_of!(Event, pid) == 0);
	assert!(core::mem::offset_of!(Event, tgid) == 4);
	assert!(core::mem::offset_of!(Event, comm) == 8);
	assert!(core::mem::offset_of!(Event, func_name) == 24);
	assert!(core::mem::offset_of!(Event, timestamp) == 40);
};

impl Event {
	pub fn comm_bytes(&self) -> &[u8] {
		trim_nul(&self.comm)
	}

	pub fn func_name_bytes(&self) -> &[u8] {
		trim_nul(&self.func_name)
	}
}

// region:    --- Tests


// endregion: --- Tests
