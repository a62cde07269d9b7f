use aya_ebpf::{
	helpers::{bpf_get_current_comm, bpf_get_current_pid_tgid, r#gen::bpf_ktime_get_ns},
	programs::ProbeContext,
};
use aya_log_ebpf::info;
use sysprobe_common::{field_str, Config, Event, ProbeEnv, COMM_LEN, CONFIG_KEY};

use crate::{CONFIG_MAP, EVENTS};

pub struct KprobeEnv<'a> {
	ctx: &'a ProbeContext,
}

impl<'a> KprobeEnv<'a> {
	#[inline(always)]
	pub fn new(ctx: &'a ProbeContext) -> Self {
		Self { ctx }
	}
}

impl ProbeEnv for KprobeEnv<'_> {
	#[inline(always)]
	fn config(&self) -> Option<&Config> {
		unsafe { CONFIG_MAP.get(&CONFIG_KEY) }
	}

	#[inline(always)]
	fn pid_tgid(&self) -> u64 {
		bpf_get_current_pid_tgid()
	}

	#[inline(always)]
	fn comm(&self) -> [u8; COMM_LEN] {
		bpf_get_current_comm().unwrap_or([0u8; COMM_LEN])
	}

	#[inline(always)]
	fn ktime_ns(&self) -> u64 {
		unsafe { bpf_ktime_get_ns() }
	}

	#[inline(always)]
	fn submit(&self, event: &Event) {
		// output() always targets the current CPU buffer; the kernel counts the loss when it is full
		EVENTS.output(self.ctx, event, 0);
	}

	#[inline(always)]
	fn diagnose(&self, event: &Event) {
		let func_name = field_str(event.func_name_bytes());
		let comm = field_str(event.comm_bytes());
		info!(self.ctx, "hello {} was called by {} (PID: {})", func_name, comm, event.pid);
	}
}
