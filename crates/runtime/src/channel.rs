//! Channel - typed command proxy for one object of a session.
//!
//! A [`Channel`] frames requests, dispatches them in-process and decodes the
//! replies, so callers work with [`Op`]s and typed method payloads instead of
//! raw buffers.

use std::sync::Arc;

use nvif_protocol::{Op, Reply, Request};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::ioctl::{Mapping, PendingHandle};
use crate::session::{Session, SessionCore};

/// Typed handle on one object of a session.
///
/// Channels keep the session's state alive but not the session itself: once
/// the session is finalized every call fails with
/// [`Error::InvalidStateTransition`].
#[derive(Clone)]
pub struct Channel {
	handle: u32,
	elevated: bool,
	session: Arc<SessionCore>,
}

impl Channel {
	pub(crate) fn new(handle: u32, session: Arc<SessionCore>) -> Self {
		Self {
			handle,
			elevated: false,
			session,
		}
	}

	/// Handle of the object this channel addresses.
	pub fn handle(&self) -> u32 {
		self.handle
	}

	/// Returns a channel that dispatches with elevated privileges.
	pub fn elevated(mut self, elevated: bool) -> Self {
		self.elevated = elevated;
		self
	}

	/// Channel for another object of the same session.
	pub fn object(&self, handle: u32) -> Channel {
		Self {
			handle,
			elevated: self.elevated,
			session: Arc::clone(&self.session),
		}
	}

	/// Sends `op` to the object and decodes the reply.
	pub fn send(&self, op: Op) -> Result<(Reply, Option<PendingHandle>)> {
		let frame = nvif_protocol::encode(&Request::new(self.handle, op))?;
		let dispatched = self.session.dispatch(self.elevated, &frame)?;
		Ok((dispatched.decode()?, dispatched.pending))
	}

	fn reply(&self, op: Op) -> Result<Reply> {
		self.send(op).map(|(reply, _)| reply)
	}

	/// Round-trips a no-op and returns the protocol version.
	pub fn nop(&self) -> Result<u8> {
		match self.reply(Op::Nop)? {
			Reply::Nop { version } => Ok(version),
			_ => Err(Error::UnexpectedReply("nop")),
		}
	}

	/// Classes this object can create.
	pub fn sclass(&self) -> Result<Vec<u32>> {
		match self.reply(Op::Sclass)? {
			Reply::Sclass { classes } => Ok(classes),
			_ => Err(Error::UnexpectedReply("sclass")),
		}
	}

	/// Creates a child object and returns a channel for it.
	pub fn create<A: Serialize>(&self, handle: u32, class: u32, args: A) -> Result<Channel> {
		let args = serde_json::to_value(args).map_err(nvif_protocol::FrameError::from)?;
		match self.reply(Op::New { handle, class, args })? {
			Reply::New { handle, .. } => Ok(self.object(handle)),
			_ => Err(Error::UnexpectedReply("new")),
		}
	}

	/// Invokes `method` with `params` and decodes its result.
	pub fn mthd<P: Serialize, R: DeserializeOwned>(&self, method: u32, params: P) -> Result<R> {
		let args = serde_json::to_value(params).map_err(nvif_protocol::FrameError::from)?;
		match self.reply(Op::Mthd { method, args })? {
			Reply::Mthd { data } => Ok(serde_json::from_value(data).map_err(nvif_protocol::FrameError::from)?),
			_ => Err(Error::UnexpectedReply("mthd")),
		}
	}

	/// Invokes a method whose result is ignored.
	pub fn mthd_no_result<P: Serialize>(&self, method: u32, params: P) -> Result<()> {
		let _: Value = self.mthd(method, params)?;
		Ok(())
	}

	pub fn rd(&self, size: u8, addr: u32) -> Result<u32> {
		match self.reply(Op::Rd { size, addr })? {
			Reply::Rd { data } => Ok(data),
			_ => Err(Error::UnexpectedReply("rd")),
		}
	}

	pub fn wr(&self, size: u8, addr: u32, data: u32) -> Result<()> {
		match self.reply(Op::Wr { size, addr, data })? {
			Reply::Wr => Ok(()),
			_ => Err(Error::UnexpectedReply("wr")),
		}
	}

	/// Allocates a notifier slot for `event`.
	pub fn ntfy_new(&self, event: u32) -> Result<u8> {
		self.ntfy(Op::NtfyNew { event }, "ntfy_new")
	}

	/// Arms a notifier slot.
	pub fn ntfy_get(&self, index: u8) -> Result<()> {
		self.ntfy(Op::NtfyGet { index }, "ntfy_get").map(drop)
	}

	/// Disarms a notifier slot.
	pub fn ntfy_put(&self, index: u8) -> Result<()> {
		self.ntfy(Op::NtfyPut { index }, "ntfy_put").map(drop)
	}

	pub fn ntfy_del(&self, index: u8) -> Result<()> {
		self.ntfy(Op::NtfyDel { index }, "ntfy_del").map(drop)
	}

	fn ntfy(&self, op: Op, name: &'static str) -> Result<u8> {
		match self.reply(op)? {
			Reply::Ntfy { index } => Ok(index),
			_ => Err(Error::UnexpectedReply(name)),
		}
	}

	/// Maps the object's window through `driver`.
	///
	/// Fails with [`Error::UnsupportedCapability`] when the transport has no
	/// mapping support.
	pub fn map(&self, driver: &dyn Driver, session: &Session) -> Result<Mapping> {
		let (handle, length) = match self.reply(Op::Map)? {
			Reply::Map { handle, length } => (handle, length),
			_ => return Err(Error::UnexpectedReply("map")),
		};
		let size = u32::try_from(length).map_err(|_| Error::UnsupportedCapability {
			driver: driver.name(),
			capability: "map beyond 4 GiB",
		})?;
		driver.map(session, handle, size).ok_or(Error::UnsupportedCapability {
			driver: driver.name(),
			capability: "map",
		})
	}

	/// Deletes the object and everything below it.
	pub fn delete(self) -> Result<()> {
		match self.reply(Op::Del)? {
			Reply::Del => Ok(()),
			_ => Err(Error::UnexpectedReply("del")),
		}
	}
}

impl std::fmt::Debug for Channel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Channel")
			.field("session", &self.session.name())
			.field("handle", &self.handle)
			.field("elevated", &self.elevated)
			.finish()
	}
}
