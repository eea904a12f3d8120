//! End-to-end tests of the nv-i2c binary.

use std::process::Command;

fn nv_i2c(args: &[&str]) -> (i32, String, String) {
	let output = Command::new(env!("CARGO_BIN_EXE_nv-i2c"))
		.args(args)
		.env_remove("RUST_LOG")
		.output()
		.expect("failed to execute nv-i2c");
	(
		output.status.code().unwrap_or(-1),
		String::from_utf8_lossy(&output.stdout).to_string(),
		String::from_utf8_lossy(&output.stderr).to_string(),
	)
}

#[test]
fn lists_default_ports() {
	let (code, stdout, _) = nv_i2c(&[]);
	assert_eq!(code, 0);
	assert_eq!(stdout, "port 0x00: type 0005\nport 0x01: type 0005\n");
}

#[test]
fn write_then_fail_sets_exit_code() {
	let (code, stdout, _) = nv_i2c(&["wr", "1", "0x50", "0", "1"]);
	assert_eq!(code, 1);
	assert!(stdout.contains("50[00]: 01 I/O failure"));
}

#[test]
fn unknown_transport_is_rejected() {
	let (code, stdout, stderr) = nv_i2c(&["-b", "nouveau"]);
	assert_eq!(code, 1);
	assert!(stdout.is_empty());
	assert!(stderr.contains("unknown transport 'nouveau'"), "{stderr}");
}

#[test]
fn missing_port_exits_with_enoent() {
	let (code, _, stderr) = nv_i2c(&["scan", "5"]);
	assert_eq!(code, 2);
	assert!(stderr.contains("I2C port 5 does not exist"), "{stderr}");
}
