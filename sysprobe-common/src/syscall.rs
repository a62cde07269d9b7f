use crate::{padded, FUNC_NAME_LEN};

/// The syscalls with an entry probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Syscall {
	Read,
	Write,
}

impl Syscall {
	pub const ALL: [Syscall; 2] = [Syscall::Read, Syscall::Write];

	/// Bare syscall name, as found after the arch prefix of the kernel symbol.
	pub const fn name(self) -> &'static str {
		match self {
			Syscall::Read => "read",
			Syscall::Write => "write",
		}
	}

	/// Name of the kprobe program in the eBPF object.
	pub const fn program_name(self) -> &'static str {
		match self {
			Syscall::Read => "sys_read",
			Syscall::Write => "sys_write",
		}
	}

	/// Value stored in `Event::func_name`.
	pub const fn func_name(self) -> [u8; FUNC_NAME_LEN] {
		match self {
			Syscall::Read => padded(b"sys_read"),
			Syscall::Write => padded(b"sys_write"),
		}
	}
}

// region:    --- Tests


// endregion: --- Tests
