use std::sync::Arc;

use nvif_protocol::{
	DeviceArgs, DeviceInfo, NV_DEVICE, NV_DEVICE_V0_I2C_PORTS, NV_DEVICE_V0_INFO, NVIF_CLASS_I2C_PORT,
	Platform, PortInfo,
};
use serde_json::Value;
use tracing::debug;

use super::{Context, Object, PortObject, decode_args};
use crate::error::DispatchError;
use crate::root::Subsystems;

/// A session's view of the resource root.
///
/// Subsystems masked off at construction stay invisible to this object even
/// though the root provides them.
#[derive(Debug)]
pub struct DeviceObject {
	enabled: Subsystems,
	debug0: u64,
	privileged: bool,
}

impl DeviceObject {
	pub(crate) fn create(ctx: &Context<'_>, args: &Value) -> Result<Self, DispatchError> {
		let args: DeviceArgs = decode_args(args)?;
		if !ctx.root.matches(args.device) {
			return Err(DispatchError::NotFound(format!("no device {:#x}", args.device)));
		}
		// bits for subsystems this root does not know about are ignored
		let enabled = ctx.root.enabled() - Subsystems::from_bits_truncate(args.disable);
		debug!(
			target = "nvif.device",
			session = %ctx.session,
			enabled = enabled.bits(),
			privileged = ctx.elevated,
			"device object created"
		);
		Ok(Self {
			enabled,
			debug0: args.debug0,
			privileged: ctx.elevated,
		})
	}

	pub fn enabled(&self) -> Subsystems {
		self.enabled
	}

	/// Debug overrides the object was created with.
	pub fn debug0(&self) -> u64 {
		self.debug0
	}

	/// Whether the object was created by an elevated caller.
	pub fn privileged(&self) -> bool {
		self.privileged
	}

	fn check_mmio(&self, ctx: &Context<'_>) -> Result<(), DispatchError> {
		if !(self.privileged || ctx.elevated) {
			return Err(DispatchError::PermissionDenied("register access needs an elevated caller".into()));
		}
		if !self.enabled.contains(Subsystems::MMIO) {
			return Err(DispatchError::NotFound("MMIO is disabled".into()));
		}
		Err(DispatchError::IoFailure(format!("{} has no register aperture", ctx.root.name())))
	}
}

impl Object for DeviceObject {
	fn class(&self) -> u32 {
		NV_DEVICE
	}

	fn sclass(&self, _ctx: &Context<'_>) -> Vec<u32> {
		vec![NVIF_CLASS_I2C_PORT]
	}

	fn new_child(&self, ctx: &Context<'_>, _class: u32, args: &Value) -> Result<Arc<dyn Object>, DispatchError> {
		if !self.enabled.contains(Subsystems::I2C) {
			return Err(DispatchError::NotFound("I2C is disabled".into()));
		}
		Ok(Arc::new(PortObject::create(ctx, args)?))
	}

	fn mthd(&self, ctx: &Context<'_>, method: u32, _args: &Value) -> Result<Value, DispatchError> {
		match method {
			NV_DEVICE_V0_INFO => {
				let chipset = if self.enabled.contains(Subsystems::IDENTIFY) { ctx.root.chipset() } else { 0 };
				let info = DeviceInfo {
					bus_address: ctx.root.address().to_string(),
					platform: Platform::Pci,
					chipset,
					name: ctx.root.name().to_string(),
					enabled: self.enabled.bits(),
				};
				Ok(serde_json::to_value(info)?)
			}
			NV_DEVICE_V0_I2C_PORTS => {
				let i2c = ctx
					.root
					.i2c()
					.filter(|_| self.enabled.contains(Subsystems::I2C))
					.ok_or_else(|| DispatchError::NotFound("I2C is disabled".into()))?;
				let ports: Vec<PortInfo> = i2c
					.ports()
					.iter()
					.map(|port| PortInfo {
						index: port.index(),
						kind: port.kind(),
					})
					.collect();
				Ok(serde_json::to_value(ports)?)
			}
			_ => Err(DispatchError::Unsupported(format!("method {method:#x} on NV_DEVICE"))),
		}
	}

	fn rd(&self, ctx: &Context<'_>, _size: u8, _addr: u32) -> Result<u32, DispatchError> {
		self.check_mmio(ctx)?;
		Ok(0)
	}

	fn wr(&self, ctx: &Context<'_>, _size: u8, _addr: u32, _data: u32) -> Result<(), DispatchError> {
		self.check_mmio(ctx)
	}

	fn map(&self, ctx: &Context<'_>) -> Result<(u64, u64), DispatchError> {
		Err(DispatchError::Unsupported(format!("{} has no mappable aperture", ctx.root.name())))
	}
}
