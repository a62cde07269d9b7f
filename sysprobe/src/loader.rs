use std::env::consts::ARCH;

use aya::{
	programs::{kprobe::KProbeLinkId, KProbe},
	Ebpf,
};
use sysprobe_common::{Config, Syscall};
use tracing::{debug, info, warn};

use crate::{
	channel::PerfEventChannel,
	control::{ControlStore, MapControlStore},
	lifecycle::TracerBackend,
	Error, Result,
};

const CONFIG_MAP: &str = "CONFIG_MAP";
const EVENTS_MAP: &str = "EVENTS";

/// Kernel symbol of the syscall entry point on `arch`.
pub fn kernel_symbol(arch: &str, syscall: Syscall) -> String {
	let prefix = match arch {
		"x86_64" => "__x64_sys_",
		"aarch64" => "__arm64_sys_",
		"s390x" => "__s390x_sys_",
		"riscv64" => "__riscv_sys_",
		_ => "sys_",
	};
	format!("{prefix}{}", syscall.name())
}

/// The kprobe programs of the embedded object, driven through aya.
pub struct AyaTracer {
	image: &'static [u8],
	perf_pages: usize,
	ebpf: Option<Ebpf>,
	links: Vec<(Syscall, KProbeLinkId)>,
}

impl AyaTracer {
	pub fn new(image: &'static [u8], perf_pages: usize) -> Self {
		Self {
			image,
			perf_pages,
			ebpf: None,
			links: Vec::new(),
		}
	}

	fn ebpf_mut(&mut self) -> Result<&mut Ebpf> {
		self.ebpf.as_mut().ok_or(Error::EbpfNotLoaded)
	}

	fn attach_one(&mut self, syscall: Syscall) -> Result<()> {
		let symbol = kernel_symbol(ARCH, syscall);
		let ebpf = self.ebpf.as_mut().ok_or(Error::EbpfNotLoaded)?;
		let program = kprobe_mut(ebpf, syscall)?;

		let link_id = program.attach(&symbol, 0).inspect_err(|err| {
			warn!("failed to attach {} to {symbol}: {err}", syscall.program_name());
		})?;
		self.links.push((syscall, link_id));
		info!("attached {} to {symbol}", syscall.program_name());

		Ok(())
	}
}

fn kprobe_mut(ebpf: &mut Ebpf, syscall: Syscall) -> Result<&mut KProbe> {
	let name = syscall.program_name();
	let program: &mut KProbe = ebpf.program_mut(name).ok_or(Error::EbpfProgNotFound(name))?.try_into()?;
	Ok(program)
}

impl TracerBackend for AyaTracer {
	type Channel = PerfEventChannel;

	fn load(&mut self) -> Result<()> {
		let mut ebpf = Ebpf::load(self.image)?;
		if let Err(e) = aya_log::EbpfLogger::init(&mut ebpf) {
			// This can happen if you remove all log statements from your eBPF program.
			warn!("failed to initialize eBPF logger: {e}");
		}

		for syscall in Syscall::ALL {
			kprobe_mut(&mut ebpf, syscall)?.load()?;
			debug!("{} passed the verifier", syscall.program_name());
		}

		self.ebpf = Some(ebpf);
		Ok(())
	}

	fn configure(&mut self, config: Config) -> Result<()> {
		let map = self.ebpf_mut()?.map_mut(CONFIG_MAP).ok_or(Error::EbpfMapNotFound(CONFIG_MAP))?;
		let mut store = MapControlStore::new(map)?;
		store.set(config)?;

		let committed = store.get()?.ok_or_else(|| Error::custom("config slot empty after write"))?;
		debug!("config committed, verbose: {}", committed.is_verbose());
		Ok(())
	}

	fn attach(&mut self) -> Result<()> {
		for syscall in Syscall::ALL {
			if let Err(err) = self.attach_one(syscall) {
				self.detach();
				return Err(err);
			}
		}
		Ok(())
	}

	fn open_channel(&mut self) -> Result<PerfEventChannel> {
		let pages = self.perf_pages;
		let map = self.ebpf_mut()?.take_map(EVENTS_MAP).ok_or(Error::EbpfMapNotFound(EVENTS_MAP))?;
		PerfEventChannel::open(map, pages)
	}

	fn detach(&mut self) {
		let Some(ebpf) = self.ebpf.as_mut() else {
			self.links.clear();
			return;
		};

		for (syscall, link_id) in self.links.drain(..).rev() {
			let res = kprobe_mut(ebpf, syscall).and_then(|program| program.detach(link_id).map_err(Error::from));
			match res {
				Ok(()) => info!("detached {}", syscall.program_name()),
				Err(err) => warn!("failed to detach {}: {err}", syscall.program_name()),
			}
		}
	}

	fn close(&mut self) {
		if self.ebpf.take().is_some() {
			debug!("eBPF object released");
		}
	}
}

// region:    --- Tests


// endregion: --- Tests
