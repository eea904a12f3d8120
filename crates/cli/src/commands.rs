//! Command execution.

use std::io::Write;

use nvif_protocol::{
	ANY_DEVICE, DeviceArgs, I2C_PORT_V0_RD, I2C_PORT_V0_WR, I2cRead, I2cValue, I2cWrite, NV_DEVICE,
	NV_DEVICE_V0_DISABLE_CORE, NV_DEVICE_V0_DISABLE_I2C, NV_DEVICE_V0_DISABLE_IDENTIFY, NV_DEVICE_V0_DISABLE_MMIO,
	NV_DEVICE_V0_DISABLE_VBIOS, NV_DEVICE_V0_I2C_PORTS, NVIF_CLASS_I2C_PORT, PortArgs, PortInfo,
};
use nvif_runtime::{Channel, Driver, SessionRequest};
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::{CliError, Result};
use crate::output;

/// Name the tool's session is opened under.
pub const SESSION_NAME: &str = "nv-i2c";

const DEVICE_HANDLE: u32 = 1;
const PORT_HANDLE: u32 = 2;

/// Subsystems the tool needs; everything else is left disabled.
const NEEDED: u64 = NV_DEVICE_V0_DISABLE_IDENTIFY
	| NV_DEVICE_V0_DISABLE_MMIO
	| NV_DEVICE_V0_DISABLE_VBIOS
	| NV_DEVICE_V0_DISABLE_CORE
	| NV_DEVICE_V0_DISABLE_I2C;

/// Runs `cli` against `driver`, writing results to `out`.
///
/// The session is destroyed before returning, whatever the outcome.
pub fn run<W: Write>(cli: &Cli, driver: &dyn Driver, out: &mut W) -> Result<()> {
	let mut request = SessionRequest::new(SESSION_NAME)
		.with_device(cli.device)
		.with_debug(&cli.debug);
	if let Some(config) = cli.config.as_deref() {
		request = request.with_config(config);
	}

	let session = driver.create(request)?;
	debug!(target = "nv_i2c", driver = driver.name(), "session opened");

	let result = execute(cli.command, session.channel(), out);
	driver.destroy(session);
	result
}

fn execute<W: Write>(command: Option<Command>, client: Channel, out: &mut W) -> Result<()> {
	let device = client.elevated(true).create(
		DEVICE_HANDLE,
		NV_DEVICE,
		DeviceArgs {
			device: ANY_DEVICE,
			disable: !NEEDED,
			debug0: 0,
		},
	)?;
	let ports: Vec<PortInfo> = device.mthd(NV_DEVICE_V0_I2C_PORTS, ())?;

	let Some(command) = command else {
		for port in &ports {
			output::write_port(out, port)?;
		}
		return Ok(());
	};

	let index = command.port();
	let info = ports
		.iter()
		.find(|port| port.index == index)
		.ok_or(CliError::PortNotFound(index))?;
	output::write_port(out, info)?;
	let port = device.create(PORT_HANDLE, NVIF_CLASS_I2C_PORT, PortArgs { index })?;

	match command {
		Command::Scan { addr: None, .. } => {
			let cells = (0..128u8).map(|addr| read(&port, addr, 0).ok().map(|_| addr));
			output::write_grid(out, cells)?;
		}
		Command::Scan { addr: Some(addr), .. } => {
			let cells = (0..=255u8).map(|reg| read(&port, addr, reg).ok());
			output::write_grid(out, cells)?;
		}
		Command::Rd { addr, reg, .. } => {
			output::write_register(out, addr, reg)?;
			match read(&port, addr, reg) {
				Ok(val) => writeln!(out, "{val:02x}")?,
				Err(err) => {
					writeln!(out, "{err}")?;
					return Err(CliError::OutputAlreadyPrinted);
				}
			}
		}
		Command::Wr { addr, reg, val, .. } => {
			output::write_register(out, addr, reg)?;
			write!(out, "{val:02x}")?;
			let result = port.mthd_no_result(
				I2C_PORT_V0_WR,
				I2cWrite {
					addr: addr.into(),
					reg: reg.into(),
					val: val.into(),
				},
			);
			if let Err(err) = &result {
				write!(out, " {err}")?;
			}
			writeln!(out)?;
			if result.is_err() {
				return Err(CliError::OutputAlreadyPrinted);
			}
		}
	}
	Ok(())
}

fn read(port: &Channel, addr: u8, reg: u8) -> nvif_runtime::Result<u8> {
	let value: I2cValue = port.mthd(
		I2C_PORT_V0_RD,
		I2cRead {
			addr: addr.into(),
			reg: reg.into(),
		},
	)?;
	Ok(value.val)
}
