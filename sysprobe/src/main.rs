// region:    --- Modules
mod channel;
mod cli;
mod consumer;
mod control;
mod error;
mod event;
mod lifecycle;
mod loader;
mod signals;
mod sink;
mod supervisor;
mod trx;

#[cfg(test)]
mod test_support;
// endregion: --- Modules

use crate::{
	cli::args::Cli,
	lifecycle::LifecycleController,
	loader::AyaTracer,
	signals::install_signal_handlers,
	sink::{ConsoleSink, FileSink, SinkSet},
};

pub use self::error::{Error, Result};
use clap::Parser;
use sysprobe_common::Config;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};
use tracing::{debug, warn};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Cli::parse();
	// Probe diagnostics from aya-log arrive at info level, so that is the floor unless RUST_LOG says otherwise.
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_target(false)
		.with_env_filter(
			EnvFilter::builder()
				.with_default_directive(LevelFilter::INFO.into())
				.from_env_lossy(),
		)
		.init();

	// Bump the memlock rlimit. This is needed for older kernels that don't use the
	// new memcg based accounting, see https://lwn.net/Articles/837122/
	let rlim = libc::rlimit {
		rlim_cur: libc::RLIM_INFINITY,
		rlim_max: libc::RLIM_INFINITY,
	};
	let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
	if ret != 0 {
		// memcg-accounted kernels load fine without it; older ones fail at load
		warn!(
			"remove limit on locked memory failed, ret is: {ret}, program load may fail: {}",
			std::io::Error::last_os_error()
		);
	}

	let config = args.config();
	print_banner(&config);

	let mut sinks = SinkSet::new();
	sinks.push(ConsoleSink::stdout());
	if let Some((path, format)) = args.log_target() {
		match FileSink::open(path, format) {
			Ok(sink) => sinks.push(sink),
			Err(err) => warn!("could not open log file {}, continuing without it: {err}", path.display()),
		}
	}
	debug!("{} sinks configured", sinks.len());

	let stop = CancellationToken::new();
	install_signal_handlers(stop.clone())?;

	let tracer = AyaTracer::new(
		aya::include_bytes_aligned!(concat!(env!("OUT_DIR"), "/sysprobe")),
		args.perf_pages,
	);
	let mut controller = LifecycleController::new(tracer, args.run_settings());
	controller.run(config, &mut sinks, stop).await?;

	println!("eBPF probe shutdown complete.");
	Ok(())
}

fn print_banner(config: &Config) {
	println!("eBPF Probe Program");
	println!("==================");
	println!(
		"Verbose mode: {}",
		if config.is_verbose() { "enabled" } else { "disabled" }
	);
	println!("Message: {}", String::from_utf8_lossy(config.message_bytes()));
	println!("Press Ctrl+C to stop");
	println!();
}
