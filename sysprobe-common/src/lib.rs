#![cfg_attr(not(test), no_std)]

// region:    --- Modules
mod config;
mod event;
mod probe;
mod syscall;
// endregion: --- Modules

pub use config::*;
pub use event::*;
pub use probe::*;
pub use syscall::*;

/// Width of the kernel's `TASK_COMM_LEN`.
pub const COMM_LEN: usize = 16;
pub const FUNC_NAME_LEN: usize = 16;

/// Returns the bytes of a fixed-width, NUL-padded text field up to the first NUL.
/// A field with no NUL is returned whole.
pub fn trim_nul(field: &[u8]) -> &[u8] {
	let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
	&field[..len]
}

/// Views a trimmed text field as `&str` for diagnostics. Task names are arbitrary
/// bytes (`prctl(PR_SET_NAME)`), so invalid UTF-8 yields a placeholder.
pub fn field_str(field: &[u8]) -> &str {
	core::str::from_utf8(field).unwrap_or("<non-utf8>")
}

/// Copies `text` into a NUL-padded array at compile time. Extra bytes are dropped.
pub const fn padded<const N: usize>(text: &[u8]) -> [u8; N] {
	let mut out = [0u8; N];
	let mut i = 0;
	while i < text.len() && i < N {
		out[i] = text[i];
		i += 1;
	}
	out
}

// region:    --- Tests


// endregion: --- Tests
