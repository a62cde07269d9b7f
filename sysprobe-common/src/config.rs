use crate::trim_nul;
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const MESSAGE_LEN: usize = 64;

/// Slot of the single `Config` entry in `CONFIG_MAP`.
pub const CONFIG_KEY: u32 = 0;

/// Control record written once by userspace into `CONFIG_MAP` before probes are relied upon.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Config {
	pub verbose: u32,                // 0..4   | 0 = off
	pub message: [u8; MESSAGE_LEN], // 4..68  | NUL terminated, at most 63 bytes of text
}

const _: () = {
	assert!(core::mem::size_of::<Config>() == 68);
	assert!(core::mem::offset_of!(Config, message) == 4);
};

impl Config {
	/// Builds a config, truncating `message` to fit with its NUL terminator.
	/// Truncation never splits a UTF-8 character.
	pub fn new(verbose: bool, message: &str) -> Self {
		let mut len = message.len().min(MESSAGE_LEN - 1);
		while !message.is_char_boundary(len) {
			len -= 1;
		}

		let mut buf = [0u8; MESSAGE_LEN];
		buf[..len].copy_from_slice(&message.as_bytes()[..len]);

		Self {
			verbose: verbose as u32,
			message: buf,
		}
	}

	pub fn is_verbose(&self) -> bool {
		self.verbose != 0
	}

	pub fn message_bytes(&self) -> &[u8] {
		trim_nul(&self.message)
	}
}

impl Default for Config {
	fn default() -> Self {
		Self::new(false, "")
	}
}

#[cfg(feature = "user")]
unsafe impl aya::Pod for Config {}

// region:    --- Tests


// endregion: --- Tests
