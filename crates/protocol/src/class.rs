//! Object classes, method numbers and their argument payloads.

use serde::{Deserialize, Serialize};

/// Class of the per-session client object at handle `0`.
pub const NVIF_CLASS_CLIENT: u32 = 0x8000_0000;
/// Device object giving access to the shared resource root.
pub const NV_DEVICE: u32 = 0x0000_0080;
/// One port of the device's I2C subsystem.
pub const NVIF_CLASS_I2C_PORT: u32 = 0x8000_0094;

/// Device selector matching whatever device the transport provides.
pub const ANY_DEVICE: u64 = !0;

/// `NV_DEVICE` method: returns [`DeviceInfo`].
pub const NV_DEVICE_V0_INFO: u32 = 0x00;
/// `NV_DEVICE` method: returns a list of [`PortInfo`].
pub const NV_DEVICE_V0_I2C_PORTS: u32 = 0x10;

/// Subsystem bits accepted in [`DeviceArgs::disable`].
pub const NV_DEVICE_V0_DISABLE_IDENTIFY: u64 = 1 << 0;
pub const NV_DEVICE_V0_DISABLE_MMIO: u64 = 1 << 1;
pub const NV_DEVICE_V0_DISABLE_VBIOS: u64 = 1 << 2;
pub const NV_DEVICE_V0_DISABLE_CORE: u64 = 1 << 3;
pub const NV_DEVICE_V0_DISABLE_I2C: u64 = 1 << 4;

/// `NVIF_CLASS_I2C_PORT` method: reads one register, returns [`I2cValue`].
pub const I2C_PORT_V0_RD: u32 = 0x00;
/// `NVIF_CLASS_I2C_PORT` method: writes one register.
pub const I2C_PORT_V0_WR: u32 = 0x01;

/// Port event raised after every completed transfer; payload is [`XferEvent`].
pub const I2C_PORT_EVENT_XFER: u32 = 0x01;

/// Constructor arguments for [`NV_DEVICE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceArgs {
	/// Device to bind, or [`ANY_DEVICE`] for whatever the transport provides.
	#[serde(default = "any_device")]
	pub device: u64,
	/// Subsystems to leave disabled for this object.
	#[serde(default)]
	pub disable: u64,
	/// Per-subsystem debug overrides.
	#[serde(default)]
	pub debug0: u64,
}

impl Default for DeviceArgs {
	fn default() -> Self {
		Self {
			device: ANY_DEVICE,
			disable: 0,
			debug0: 0,
		}
	}
}

fn any_device() -> u64 {
	ANY_DEVICE
}

/// Bus platform a device sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
	Pci,
	Pcie,
	Soc,
}

/// Reply of [`NV_DEVICE_V0_INFO`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
	/// Bus address in `dddd:bb:ss.f` form.
	pub bus_address: String,
	pub platform: Platform,
	pub chipset: u32,
	pub name: String,
	/// Subsystem bits enabled for the queried object.
	pub enabled: u64,
}

/// Constructor arguments for [`NVIF_CLASS_I2C_PORT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortArgs {
	pub index: u8,
}

/// One entry of the [`NV_DEVICE_V0_I2C_PORTS`] reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
	pub index: u8,
	/// Port implementation type.
	#[serde(rename = "type")]
	pub kind: u16,
}

/// Arguments of [`I2C_PORT_V0_RD`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct I2cRead {
	pub addr: u32,
	pub reg: u32,
}

/// Arguments of [`I2C_PORT_V0_WR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct I2cWrite {
	pub addr: u32,
	pub reg: u32,
	pub val: u32,
}

/// Reply of [`I2C_PORT_V0_RD`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct I2cValue {
	pub val: u8,
}

/// Payload of [`I2C_PORT_EVENT_XFER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XferEvent {
	pub port: u8,
	pub addr: u8,
	pub reg: u8,
	pub val: u8,
	pub write: bool,
}
