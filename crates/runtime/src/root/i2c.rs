//! Synthetic I2C subsystem of the resource root.
//!
//! Each port owns a bus of 7-bit addresses. Devices attached through the
//! config answer with a 256-byte register file; every other address NACKs.
//! Register files live as long as the root and are shared by all sessions.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::error::DispatchError;

/// Most ports a root can expose.
pub const MAX_PORTS: usize = 16;

/// Type code reported for bit-banged ports.
pub const PORT_TYPE_BIT: u16 = 0x0005;

/// Number of 7-bit bus addresses.
pub const BUS_ADDRESSES: u32 = 128;

/// Number of registers in a synthetic device.
pub const DEVICE_REGISTERS: u32 = 256;

type RegisterFile = Box<[u8; DEVICE_REGISTERS as usize]>;

/// The I2C subsystem: a fixed set of ports.
#[derive(Debug)]
pub struct I2c {
	ports: Vec<I2cPort>,
}

impl I2c {
	/// Builds `ports` ports and attaches a blank device at each `(port, addr)`.
	///
	/// Callers validate the topology beforehand.
	pub(crate) fn new(ports: u8, devices: &[(u8, u8)]) -> Self {
		let ports = (0..ports)
			.map(|index| {
				let bus = devices
					.iter()
					.filter(|(port, _)| *port == index)
					.map(|(_, addr)| (*addr, Box::new([0u8; DEVICE_REGISTERS as usize])))
					.collect();
				I2cPort {
					index,
					kind: PORT_TYPE_BIT,
					bus: Mutex::new(bus),
				}
			})
			.collect();
		Self { ports }
	}

	pub fn ports(&self) -> &[I2cPort] {
		&self.ports
	}

	/// Looks a port up by index.
	pub fn find(&self, index: u8) -> Option<&I2cPort> {
		self.ports.iter().find(|port| port.index == index)
	}

	/// Total number of attached devices across all ports.
	pub fn device_count(&self) -> usize {
		self.ports.iter().map(|port| port.bus.lock().len()).sum()
	}
}

/// One I2C port and the devices on its bus.
#[derive(Debug)]
pub struct I2cPort {
	index: u8,
	kind: u16,
	bus: Mutex<BTreeMap<u8, RegisterFile>>,
}

impl I2cPort {
	pub fn index(&self) -> u8 {
		self.index
	}

	pub fn kind(&self) -> u16 {
		self.kind
	}

	/// Reads register `reg` of the device at `addr`.
	pub fn read(&self, addr: u8, reg: u8) -> Result<u8, DispatchError> {
		let bus = self.bus.lock();
		let regs = bus.get(&addr).ok_or_else(|| self.nack(addr))?;
		Ok(regs[reg as usize])
	}

	/// Writes register `reg` of the device at `addr`.
	pub fn write(&self, addr: u8, reg: u8, val: u8) -> Result<(), DispatchError> {
		let mut bus = self.bus.lock();
		let regs = bus.get_mut(&addr).ok_or_else(|| self.nack(addr))?;
		regs[reg as usize] = val;
		Ok(())
	}

	/// Addresses that acknowledge on this bus.
	pub fn devices(&self) -> Vec<u8> {
		self.bus.lock().keys().copied().collect()
	}

	fn nack(&self, addr: u8) -> DispatchError {
		DispatchError::IoFailure(format!("no device at {addr:#04x} on port {}", self.index))
	}
}
