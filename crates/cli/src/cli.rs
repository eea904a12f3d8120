use clap::{Parser, Subcommand};
use nvif_protocol::ANY_DEVICE;
use nvif_runtime::NULL_DRIVER;
use nvif_runtime::config::parse_number;

use crate::styles::cli_styles;

#[derive(Parser, Debug)]
#[command(name = "nv-i2c")]
#[command(about = "Inspect and drive the I2C ports of an nvif device")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase log verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Device selector; all-ones picks whatever the transport provides
	#[arg(short = 'a', long, value_name = "DEVICE", value_parser = parse_u64, default_value_t = ANY_DEVICE)]
	pub device: u64,

	/// Transport to open the session through
	#[arg(short = 'b', long = "driver", value_name = "NAME", default_value = NULL_DRIVER)]
	pub driver: String,

	/// Root configuration, e.g. "NvI2cPorts=4,NvI2cDevice=0:0x50"
	#[arg(short = 'c', long, value_name = "CONFIG")]
	pub config: Option<String>,

	/// Session debug level, optionally with per-subsystem overrides
	#[arg(short = 'd', long, value_name = "LEVEL", default_value = "error")]
	pub debug: String,

	/// Without a command, every port is listed
	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	/// Probe every bus address, or dump every register of one device
	Scan {
		#[arg(value_parser = parse_port)]
		port: u8,
		#[arg(value_parser = parse_addr)]
		addr: Option<u8>,
	},
	/// Read one register
	Rd {
		#[arg(value_parser = parse_port)]
		port: u8,
		#[arg(value_parser = parse_addr)]
		addr: u8,
		#[arg(value_parser = parse_byte)]
		reg: u8,
	},
	/// Write one register
	Wr {
		#[arg(value_parser = parse_port)]
		port: u8,
		#[arg(value_parser = parse_addr)]
		addr: u8,
		#[arg(value_parser = parse_byte)]
		reg: u8,
		#[arg(value_parser = parse_byte)]
		val: u8,
	},
}

impl Command {
	/// Port the command operates on.
	pub fn port(&self) -> u8 {
		match *self {
			Command::Scan { port, .. } | Command::Rd { port, .. } | Command::Wr { port, .. } => port,
		}
	}
}

fn parse_u64(s: &str) -> Result<u64, String> {
	parse_number(s).ok_or_else(|| format!("'{s}' is not a number"))
}

fn parse_bounded(s: &str, limit: u64, what: &str) -> Result<u8, String> {
	let value = parse_u64(s)?;
	if value >= limit {
		return Err(format!("{what} {value:#x} is out of range (must be below {limit:#x})"));
	}
	Ok(value as u8)
}

fn parse_port(s: &str) -> Result<u8, String> {
	parse_bounded(s, 256, "port")
}

fn parse_addr(s: &str) -> Result<u8, String> {
	parse_bounded(s, 128, "address")
}

fn parse_byte(s: &str) -> Result<u8, String> {
	parse_bounded(s, 256, "value")
}
