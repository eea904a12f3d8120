//! The shared resource root.
//!
//! A [`ResourceRoot`] stands for one enumerated device and its subsystems. The
//! [`SessionManager`](crate::manager::SessionManager) builds it when the first
//! session opens and tears it down when the last one leaves. Sessions keep a
//! [`Weak`](std::sync::Weak) reference and upgrade it per command.
//!
//! The `root()` accessors on sessions and the manager hand out strong
//! references for inspection. Holding one past teardown keeps a detached
//! instance alive: its counters stop moving and the next session still gets a
//! fresh root with a new [`id`](ResourceRoot::id).

pub mod i2c;


use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use bitflags::bitflags;
use nvif_protocol::{
	ANY_DEVICE, NV_DEVICE_V0_DISABLE_CORE, NV_DEVICE_V0_DISABLE_I2C, NV_DEVICE_V0_DISABLE_IDENTIFY,
	NV_DEVICE_V0_DISABLE_MMIO, NV_DEVICE_V0_DISABLE_VBIOS,
};
use tracing::debug;

use self::i2c::{BUS_ADDRESSES, I2c, MAX_PORTS};
use crate::config::{Config, DebugConfig, parse_number};
use crate::error::{Error, Result};

bitflags! {
	/// Subsystems of a device; bit values match the `disable` mask of `NV_DEVICE`.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct Subsystems: u64 {
		const IDENTIFY = NV_DEVICE_V0_DISABLE_IDENTIFY;
		const MMIO = NV_DEVICE_V0_DISABLE_MMIO;
		const VBIOS = NV_DEVICE_V0_DISABLE_VBIOS;
		const CORE = NV_DEVICE_V0_DISABLE_CORE;
		const I2C = NV_DEVICE_V0_DISABLE_I2C;
	}
}

/// PCI-style bus address, `dddd:bb:ss.f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusAddress {
	pub domain: u16,
	pub bus: u8,
	pub slot: u8,
	pub function: u8,
}

/// Synthetic address the in-process transport binds its root to.
pub const NULL_BUS_ADDRESS: BusAddress = BusAddress {
	domain: 0,
	bus: 0,
	slot: 0,
	function: 0,
};

impl BusAddress {
	/// Device handle derived from the address, used to match device selectors.
	pub fn handle(&self) -> u64 {
		(u64::from(self.domain) << 32)
			| (u64::from(self.bus) << 16)
			| (u64::from(self.slot) << 8)
			| u64::from(self.function)
	}
}

impl fmt::Display for BusAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:04x}:{:02x}:{:02x}.{:x}", self.domain, self.bus, self.slot, self.function)
	}
}

impl FromStr for BusAddress {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let bad = || Error::Configuration(format!("'{s}' is not a dddd:bb:ss.f bus address"));
		let (domain, rest) = s.split_once(':').ok_or_else(bad)?;
		let (bus, rest) = rest.split_once(':').ok_or_else(bad)?;
		let (slot, function) = rest.split_once('.').ok_or_else(bad)?;

		let function = u8::from_str_radix(function, 16).map_err(|_| bad())?;
		if function > 7 {
			return Err(bad());
		}
		Ok(Self {
			domain: u16::from_str_radix(domain, 16).map_err(|_| bad())?,
			bus: u8::from_str_radix(bus, 16).map_err(|_| bad())?,
			slot: u8::from_str_radix(slot, 16).map_err(|_| bad())?,
			function,
		})
	}
}

/// Root settings extracted from a config string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootConfig {
	/// Number of I2C ports, `NvI2cPorts`.
	pub ports: u64,
	/// Attached synthetic devices as `(port, addr)`, `NvI2cDevice`.
	pub devices: Vec<(u8, u8)>,
	/// Subsystems switched off for the whole root, `NvDisable`.
	pub disabled: Subsystems,
	/// Reported chipset, `NvChipset`.
	pub chipset: u32,
}

impl Default for RootConfig {
	fn default() -> Self {
		Self {
			ports: 2,
			devices: Vec::new(),
			disabled: Subsystems::empty(),
			chipset: 0,
		}
	}
}

const KNOWN_KEYS: [&str; 4] = ["NvI2cPorts", "NvI2cDevice", "NvDisable", "NvChipset"];

impl RootConfig {
	/// Extracts root settings, rejecting values that do not parse.
	///
	/// Topology is not checked here; [`ResourceRoot::create`] does that.
	pub fn from_config(config: &Config) -> Result<Self> {
		let mut root = Self::default();

		if let Some(ports) = config.get_number("NvI2cPorts")? {
			root.ports = ports;
		}

		for entry in config.get_all("NvI2cDevice") {
			root.devices.push(parse_device(entry)?);
		}

		if let Some(names) = config.get("NvDisable") {
			root.disabled = bitflags::parser::from_str::<Subsystems>(names)
				.map_err(|err| Error::Configuration(format!("NvDisable={names}: {err}")))?;
		}

		if let Some(chipset) = config.get_number("NvChipset")? {
			root.chipset = u32::try_from(chipset)
				.map_err(|_| Error::Configuration(format!("NvChipset={chipset:#x} is out of range")))?;
		}

		for key in config.keys() {
			if !KNOWN_KEYS.contains(&key) {
				debug!(target = "nvif.config", key, "ignoring unknown config key");
			}
		}

		Ok(root)
	}
}

fn parse_device(entry: &str) -> Result<(u8, u8)> {
	let bad = || Error::Configuration(format!("NvI2cDevice={entry} is not <port>:<addr>"));
	let (port, addr) = entry.split_once(':').ok_or_else(bad)?;
	let port = parse_number(port).and_then(|p| u8::try_from(p).ok()).ok_or_else(bad)?;
	let addr = parse_number(addr).ok_or_else(bad)?;
	if addr >= u64::from(BUS_ADDRESSES) {
		return Err(Error::Configuration(format!(
			"NvI2cDevice={entry}: address {addr:#x} is not a 7-bit address"
		)));
	}
	Ok((port, addr as u8))
}

static NEXT_ROOT_ID: AtomicU64 = AtomicU64::new(1);

/// The constructed device tree shared by every session.
///
/// Counters are atomics so concurrent dispatches never need the manager lock.
#[derive(Debug)]
pub struct ResourceRoot {
	id: u64,
	address: BusAddress,
	enabled: Subsystems,
	chipset: u32,
	debug: DebugConfig,
	i2c: Option<I2c>,
	live_objects: AtomicUsize,
	dispatches: AtomicU64,
	sessions_served: AtomicU64,
}

impl ResourceRoot {
	/// Builds a root at `address` from an already-parsed config.
	pub(crate) fn create(address: BusAddress, config: &RootConfig, debug: DebugConfig) -> Result<Self> {
		let fail = |reason: String| Error::DeviceCreation {
			address: address.to_string(),
			reason,
		};

		let enabled = Subsystems::all() - config.disabled;
		let i2c = if enabled.contains(Subsystems::I2C) {
			if config.ports > MAX_PORTS as u64 {
				return Err(fail(format!(
					"{} I2C ports requested, at most {MAX_PORTS} supported",
					config.ports
				)));
			}
			let ports = config.ports as u8;
			let mut seen = Vec::with_capacity(config.devices.len());
			for &(port, addr) in &config.devices {
				if port >= ports {
					return Err(fail(format!("device {addr:#04x} attached to missing I2C port {port}")));
				}
				if seen.contains(&(port, addr)) {
					return Err(fail(format!("two devices at {addr:#04x} on I2C port {port}")));
				}
				seen.push((port, addr));
			}
			Some(I2c::new(ports, &config.devices))
		} else {
			None
		};

		Ok(Self {
			id: NEXT_ROOT_ID.fetch_add(1, Ordering::SeqCst),
			address,
			enabled,
			chipset: config.chipset,
			debug,
			i2c,
			live_objects: AtomicUsize::new(0),
			dispatches: AtomicU64::new(0),
			sessions_served: AtomicU64::new(0),
		})
	}

	/// Process-unique identity of this root instance.
	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn address(&self) -> BusAddress {
		self.address
	}

	/// Device handle sessions select this root by.
	pub fn handle(&self) -> u64 {
		self.address.handle()
	}

	/// Whether a device selector picks this root.
	pub fn matches(&self, selector: u64) -> bool {
		selector == ANY_DEVICE || selector == self.handle()
	}

	pub fn enabled(&self) -> Subsystems {
		self.enabled
	}

	pub fn chipset(&self) -> u32 {
		self.chipset
	}

	pub fn name(&self) -> &'static str {
		"NULL"
	}

	pub fn debug(&self) -> &DebugConfig {
		&self.debug
	}

	/// The I2C subsystem, absent when disabled.
	pub fn i2c(&self) -> Option<&I2c> {
		self.i2c.as_ref()
	}

	/// Objects currently alive across all sessions.
	pub fn live_objects(&self) -> usize {
		self.live_objects.load(Ordering::SeqCst)
	}

	pub(crate) fn object_created(&self) {
		self.live_objects.fetch_add(1, Ordering::SeqCst);
	}

	pub(crate) fn objects_destroyed(&self, count: usize) {
		self.live_objects.fetch_sub(count, Ordering::SeqCst);
	}

	pub(crate) fn record_dispatch(&self) {
		self.dispatches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn session_attached(&self) {
		self.sessions_served.fetch_add(1, Ordering::Relaxed);
	}

	/// Snapshot of the root's bookkeeping, emitted when it is torn down.
	pub fn dump(&self) -> RootDump {
		RootDump {
			id: self.id,
			address: self.address.to_string(),
			sessions_served: self.sessions_served.load(Ordering::Relaxed),
			dispatches: self.dispatches.load(Ordering::Relaxed),
			live_objects: self.live_objects(),
			i2c_ports: self.i2c.as_ref().map_or(0, |i2c| i2c.ports().len()),
			i2c_devices: self.i2c.as_ref().map_or(0, I2c::device_count),
		}
	}
}

/// Diagnostic snapshot of a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDump {
	pub id: u64,
	pub address: String,
	pub sessions_served: u64,
	pub dispatches: u64,
	/// Objects nobody released; non-zero means some session leaked state.
	pub live_objects: usize,
	pub i2c_ports: usize,
	pub i2c_devices: usize,
}

impl RootDump {
	pub fn is_clean(&self) -> bool {
		self.live_objects == 0
	}
}
