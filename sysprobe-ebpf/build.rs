use which::which;

// bpf-linker is an undeclared dependency of this crate; rebuild when it changes.
fn main() {
	match which("bpf-linker") {
		Ok(path) => println!("cargo:rerun-if-changed={}", path.display()),
		Err(err) => println!("cargo:warning=bpf-linker not found in PATH: {err}"),
	}
}
