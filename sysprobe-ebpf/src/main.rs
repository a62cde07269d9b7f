#![no_std]
#![no_main]

use aya_ebpf::{
	macros::{kprobe, map},
	maps::{HashMap, PerfEventArray},
	programs::ProbeContext,
};
use sysprobe_common::{trace_entry, Config, Event, Syscall};

mod env;

use env::KprobeEnv;

/// Single slot, key 0. Written once by userspace before the probes are attached;
/// until then a lookup misses and the probes do nothing.
#[map]
static CONFIG_MAP: HashMap<u32, Config> = HashMap::with_max_entries(1, 0);

#[map]
static EVENTS: PerfEventArray<Event> = PerfEventArray::new(0);

#[kprobe]
pub fn sys_read(ctx: ProbeContext) -> u32 {
	trace_entry(&KprobeEnv::new(&ctx), Syscall::Read)
}

#[kprobe]
pub fn sys_write(ctx: ProbeContext) -> u32 {
	trace_entry(&KprobeEnv::new(&ctx), Syscall::Write)
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
	loop {}
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";
