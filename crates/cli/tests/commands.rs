//! Integration tests for command output against the in-process transport.

use clap::Parser;
use nv_i2c::cli::Cli;
use nv_i2c::commands;
use nv_i2c::error::CliError;
use nvif_runtime::NullDriver;

fn run(args: &[&str]) -> (String, Result<(), CliError>, NullDriver) {
	let cli = Cli::try_parse_from(std::iter::once("nv-i2c").chain(args.iter().copied())).unwrap();
	let driver = NullDriver::new();
	let mut out = Vec::new();
	let result = commands::run(&cli, &driver, &mut out);
	(String::from_utf8(out).unwrap(), result, driver)
}

#[test]
fn lists_ports_without_a_command() {
	let (out, result, _) = run(&["-c", "NvI2cPorts=3"]);
	result.unwrap();
	assert_eq!(out, "port 0x00: type 0005\nport 0x01: type 0005\nport 0x02: type 0005\n");
}

#[test]
fn scan_marks_answering_addresses() {
	let (out, result, _) = run(&["-c", "NvI2cDevice=0:0x50,NvI2cDevice=0:0x1c", "scan", "0"]);
	result.unwrap();

	let lines: Vec<&str> = out.lines().collect();
	assert_eq!(lines[0], "port 0x00: type 0005");
	assert_eq!(lines.len(), 1 + 8);
	assert!(lines[2].starts_with("10:"));
	assert!(lines[2].contains(" 1c"));
	assert!(lines[6].starts_with("50: 50 --"));
	assert_eq!(out.matches("--").count(), 126);
}

#[test]
fn scan_of_one_device_dumps_registers() {
	let (out, result, _) = run(&["-c", "NvI2cDevice=1:0x50", "scan", "1", "0x50"]);
	result.unwrap();

	let lines: Vec<&str> = out.lines().collect();
	assert_eq!(lines.len(), 1 + 16);
	assert_eq!(lines[16], "f0: 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00");
}

#[test]
fn rd_prints_value() {
	let (out, result, _) = run(&["-c", "NvI2cDevice=0:0x50", "rd", "0", "0x50", "0x10"]);
	result.unwrap();
	assert_eq!(out, "port 0x00: type 0005\n50[10]: 00\n");
}

#[test]
fn rd_from_silent_address_reports_error() {
	let (out, result, _) = run(&["rd", "0", "0x51", "0"]);
	assert!(result.unwrap_err().is_output_already_printed());
	assert!(out.starts_with("port 0x00: type 0005\n51[00]: "));
	assert!(out.contains("no device at 0x51"));
}

#[test]
fn wr_echoes_the_transfer() {
	let (out, result, _) = run(&["-c", "NvI2cDevice=0:0x50", "wr", "0", "0x50", "3", "0x7e"]);
	result.unwrap();
	assert_eq!(out, "port 0x00: type 0005\n50[03]: 7e\n");

	let (out, result, _) = run(&["wr", "0", "0x50", "3", "0x7e"]);
	assert!(result.is_err());
	assert!(out.starts_with("port 0x00: type 0005\n50[03]: 7e I/O failure"));
}

#[test]
fn missing_port_is_reported() {
	let (out, result, _) = run(&["rd", "9", "0x50", "0"]);
	assert!(matches!(result, Err(CliError::PortNotFound(9))));
	assert!(out.is_empty());
}

#[test]
fn session_is_destroyed_on_every_path() {
	for args in [&["scan", "0"][..], &["rd", "9", "0", "0"][..], &["rd", "0", "0x20", "0"][..]] {
		let (_, _, driver) = run(args);
		let stats = driver.manager().stats();
		assert_eq!((stats.active, stats.constructed, stats.destroyed), (0, 1, 1), "{args:?}");
		assert!(driver.manager().last_dump().unwrap().is_clean(), "{args:?}");
	}
}

#[test]
fn bad_config_fails_before_output() {
	let (out, result, driver) = run(&["-c", "NvI2cPorts=0x40"]);
	assert!(matches!(result, Err(CliError::Runtime(nvif_runtime::Error::DeviceCreation { .. }))));
	assert!(out.is_empty());
	assert_eq!(driver.manager().stats().constructed, 0);
}
