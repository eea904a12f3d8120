use nvif_protocol::{
	I2C_PORT_EVENT_XFER, I2C_PORT_V0_RD, I2C_PORT_V0_WR, I2cRead, I2cValue, I2cWrite, NVIF_CLASS_I2C_PORT, PortArgs,
	XferEvent,
};
use serde_json::Value;
use tracing::trace;

use super::{Context, EventSource, Object, decode_args};
use crate::config::DebugLevel;
use crate::error::DispatchError;
use crate::root::i2c::{BUS_ADDRESSES, DEVICE_REGISTERS, I2cPort};

/// Handle on one I2C port of the root.
#[derive(Debug)]
pub struct PortObject {
	index: u8,
	events: EventSource,
}

impl PortObject {
	pub(crate) fn create(ctx: &Context<'_>, args: &Value) -> Result<Self, DispatchError> {
		let args: PortArgs = decode_args(args)?;
		Self::port(ctx, args.index)?;
		Ok(Self {
			index: args.index,
			events: EventSource::new(&[I2C_PORT_EVENT_XFER]),
		})
	}

	pub fn index(&self) -> u8 {
		self.index
	}

	fn port<'a>(ctx: &Context<'a>, index: u8) -> Result<&'a I2cPort, DispatchError> {
		ctx.root
			.i2c()
			.and_then(|i2c| i2c.find(index))
			.ok_or_else(|| DispatchError::NotFound(format!("I2C port {index}")))
	}

	fn transferred(&self, ctx: &Context<'_>, event: XferEvent) {
		if ctx.root.debug().level_for("I2C") >= DebugLevel::Trace {
			trace!(
				target = "nvif.i2c",
				port = event.port,
				addr = event.addr,
				reg = event.reg,
				val = event.val,
				write = event.write,
				"transfer"
			);
		}
		let armed = self.events.armed(I2C_PORT_EVENT_XFER);
		if armed.is_empty() {
			return;
		}
		let Ok(payload) = serde_json::to_value(event) else {
			return;
		};
		for index in armed {
			ctx.raise(index, I2C_PORT_EVENT_XFER, payload.clone());
		}
	}
}

fn bus_address(addr: u32) -> Result<u8, DispatchError> {
	if addr >= BUS_ADDRESSES {
		return Err(DispatchError::InvalidArgument(format!("{addr:#x} is not a 7-bit address")));
	}
	Ok(addr as u8)
}

fn byte(what: &str, value: u32) -> Result<u8, DispatchError> {
	if value >= DEVICE_REGISTERS {
		return Err(DispatchError::InvalidArgument(format!("{what} {value:#x} does not fit in a byte")));
	}
	Ok(value as u8)
}

impl Object for PortObject {
	fn class(&self) -> u32 {
		NVIF_CLASS_I2C_PORT
	}

	fn mthd(&self, ctx: &Context<'_>, method: u32, args: &Value) -> Result<Value, DispatchError> {
		match method {
			I2C_PORT_V0_RD => {
				let args: I2cRead = decode_args(args)?;
				let addr = bus_address(args.addr)?;
				let reg = byte("register", args.reg)?;
				let val = Self::port(ctx, self.index)?.read(addr, reg)?;
				self.transferred(
					ctx,
					XferEvent {
						port: self.index,
						addr,
						reg,
						val,
						write: false,
					},
				);
				Ok(serde_json::to_value(I2cValue { val })?)
			}
			I2C_PORT_V0_WR => {
				if !ctx.elevated {
					return Err(DispatchError::PermissionDenied("I2C writes need an elevated caller".into()));
				}
				let args: I2cWrite = decode_args(args)?;
				let addr = bus_address(args.addr)?;
				let reg = byte("register", args.reg)?;
				let val = byte("value", args.val)?;
				Self::port(ctx, self.index)?.write(addr, reg, val)?;
				self.transferred(
					ctx,
					XferEvent {
						port: self.index,
						addr,
						reg,
						val,
						write: true,
					},
				);
				Ok(Value::Null)
			}
			_ => Err(DispatchError::Unsupported(format!("method {method:#x} on I2C port"))),
		}
	}

	fn events(&self) -> Option<&EventSource> {
		Some(&self.events)
	}

	fn init(&self) {
		self.events.resume();
	}

	fn fini(&self, suspend: bool) {
		if suspend {
			self.events.suspend();
		} else {
			self.events.clear();
		}
	}
}
