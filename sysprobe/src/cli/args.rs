use std::{path::Path, path::PathBuf, time::Duration};

use clap::Parser;
use sysprobe_common::Config;

use crate::{lifecycle::RunSettings, sink::LineFormat};

#[derive(Parser, Debug)]
#[command(name = "sysprobe", about = "Log every read and write syscall entry through eBPF kprobes")]
pub struct Cli {
	/// Have the probes emit a diagnostic line with the caller's name and PID for every call
	#[arg(short, long)]
	pub verbose: bool,

	/// Custom message stored with the probe config (max 63 bytes, longer input is truncated)
	#[arg(short, long, default_value = "Default probe message")]
	pub message: String,

	/// File the event lines are appended to
	#[arg(long, default_value = "syscalls.log")]
	pub log_file: PathBuf,

	/// Only write event lines to stdout
	#[arg(long)]
	pub no_log_file: bool,

	/// Prefix log file lines with the wall clock and add comm, PID and TGID
	#[arg(long, conflicts_with = "no_log_file")]
	pub detailed_log: bool,

	#[arg(long, default_value = "100ms", value_parser = parse_timeout, help = "How long one poll of the event channel may wait (e.g., 100ms, 1s)")]
	pub poll_timeout: Duration,

	#[arg(long, value_parser = parse_timeout, help = "How long to keep forwarding buffered events after a stop request. Defaults to the poll timeout")]
	pub drain_timeout: Option<Duration>,

	/// Pages per CPU for the perf ring, a power of two
	#[arg(long, default_value_t = 64, value_parser = parse_page_count)]
	pub perf_pages: usize,
}

impl Cli {
	pub fn config(&self) -> Config {
		Config::new(self.verbose, &self.message)
	}

	pub fn run_settings(&self) -> RunSettings {
		RunSettings {
			poll_timeout: self.poll_timeout,
			drain_timeout: self.drain_timeout.unwrap_or(self.poll_timeout),
		}
	}

	pub fn log_target(&self) -> Option<(&Path, LineFormat)> {
		if self.no_log_file {
			return None;
		}
		let format = if self.detailed_log {
			LineFormat::Detailed
		} else {
			LineFormat::Short
		};
		Some((self.log_file.as_path(), format))
	}
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
	let timeout: Duration = s.parse::<humantime::Duration>().map_err(|e| e.to_string())?.into();
	if timeout.is_zero() {
		return Err("timeout must be greater than zero".to_string());
	}
	Ok(timeout)
}

fn parse_page_count(s: &str) -> Result<usize, String> {
	let pages: usize = s.parse().map_err(|e| format!("{e}"))?;
	if !pages.is_power_of_two() {
		return Err(format!("{pages} is not a power of two"));
	}
	Ok(pages)
}

// region:    --- Tests


// endregion: --- Tests
