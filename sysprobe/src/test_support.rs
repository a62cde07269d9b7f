use std::{
	io::{self, Write},
	sync::{Arc, Mutex},
};

use sysprobe_common::{padded, Event, Syscall};

/// `Write` target whose contents stay readable after the writer has been moved into a sink.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
	pub fn lines(&self) -> Vec<String> {
		let buf = self.0.lock().map(|b| b.clone()).unwrap_or_default();
		String::from_utf8_lossy(&buf).lines().map(str::to_string).collect()
	}
}

impl Write for SharedBuf {
	fn write(&mut self, data: &[u8]) -> io::Result<usize> {
		let mut buf = self.0.lock().map_err(|_| io::Error::other("poisoned"))?;
		buf.extend_from_slice(data);
		Ok(data.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

pub fn fx_event(syscall: Syscall, timestamp: u64) -> Event {
	Event {
		pid: 1,
		tgid: 1,
		comm: padded(b"sh"),
		func_name: syscall.func_name(),
		timestamp,
	}
}
