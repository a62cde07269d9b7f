use std::{
	fs::{File, OpenOptions},
	io::{self, Stdout, Write},
	path::{Path, PathBuf},
	time::SystemTime,
};

use tracing::{debug, warn};

use crate::{event::SyscallEvent, Result};

/// A destination for formatted event lines.
pub trait Sink: Send {
	fn name(&self) -> &str;

	fn write_event(&mut self, evt: &SyscallEvent) -> Result<()>;
}

pub struct ConsoleSink<W: Write + Send> {
	out: W,
}

impl ConsoleSink<Stdout> {
	pub fn stdout() -> Self {
		Self { out: io::stdout() }
	}
}

impl<W: Write + Send> ConsoleSink<W> {
	pub fn new(out: W) -> Self {
		Self { out }
	}
}

impl<W: Write + Send> Sink for ConsoleSink<W> {
	fn name(&self) -> &str {
		"console"
	}

	fn write_event(&mut self, evt: &SyscallEvent) -> Result<()> {
		writeln!(self.out, "{evt}")?;
		self.out.flush()?;
		Ok(())
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineFormat {
	/// `hello <func_name> was called`
	#[default]
	Short,
	/// Wall clock, comm, pid and tgid on top of the short line.
	Detailed,
}

/// Appends one line per event to a log file. The file is created if missing.
pub struct FileSink {
	path: PathBuf,
	file: File,
	format: LineFormat,
}

impl FileSink {
	pub fn open(path: impl AsRef<Path>, format: LineFormat) -> Result<Self> {
		let path = path.as_ref().to_path_buf();
		let file = OpenOptions::new().create(true).append(true).open(&path)?;
		debug!("appending events to {}", path.display());

		Ok(Self { path, file, format })
	}
}

impl Sink for FileSink {
	fn name(&self) -> &str {
		self.path.to_str().unwrap_or("log file")
	}

	fn write_event(&mut self, evt: &SyscallEvent) -> Result<()> {
		let mut line = match self.format {
			LineFormat::Short => evt.to_string(),
			LineFormat::Detailed => evt.detailed_line(SystemTime::now()),
		};
		line.push('\n');

		// one write per line; O_APPEND keeps lines whole
		self.file.write_all(line.as_bytes())?;
		Ok(())
	}
}

struct SinkSlot {
	sink: Box<dyn Sink>,
	failed: bool,
}

/// Fans each event out to every sink. A sink that fails once is reported and skipped afterwards.
#[derive(Default)]
pub struct SinkSet {
	slots: Vec<SinkSlot>,
}

impl SinkSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, sink: impl Sink + 'static) {
		self.slots.push(SinkSlot {
			sink: Box::new(sink),
			failed: false,
		});
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	/// Returns how many sinks took the event.
	pub fn dispatch(&mut self, evt: &SyscallEvent) -> usize {
		let mut written = 0;
		for slot in self.slots.iter_mut().filter(|s| !s.failed) {
			match slot.sink.write_event(evt) {
				Ok(()) => written += 1,
				Err(err) => {
					warn!("sink '{}' failed, no further events will be written to it: {err}", slot.sink.name());
					slot.failed = true;
				}
			}
		}
		written
	}
}

// region:    --- Tests


// endregion: --- Tests
