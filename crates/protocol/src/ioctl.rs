//! Request and reply envelopes.
//!
//! Every command targets one object by handle. Handle `0` always names the
//! session's own client object; everything else is created with [`Op::New`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision understood by this crate.
pub const IOCTL_VERSION: u8 = 0;

/// Handle of the client object at the root of every session's tree.
pub const CLIENT_HANDLE: u32 = 0;

/// A single command addressed to an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
	/// Protocol revision, must equal [`IOCTL_VERSION`].
	pub version: u8,
	/// Target object handle.
	pub object: u32,
	/// Operation to perform on the target.
	#[serde(flatten)]
	pub op: Op,
}

impl Request {
	/// Builds a request for the current protocol revision.
	pub fn new(object: u32, op: Op) -> Self {
		Self {
			version: IOCTL_VERSION,
			object,
			op,
		}
	}
}

/// Operations an object may be asked to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Op {
	/// Round-trip with no side effects, replies with the protocol version.
	Nop,
	/// Lists the classes the target can create as children.
	Sclass,
	/// Creates a child object under the target.
	New {
		/// Caller-chosen handle for the new object, unique within the session.
		handle: u32,
		/// Class of the object to create.
		class: u32,
		/// Class-specific constructor arguments.
		#[serde(default)]
		args: Value,
	},
	/// Deletes the target and all of its children.
	Del,
	/// Invokes a class-specific method.
	Mthd {
		method: u32,
		#[serde(default)]
		args: Value,
	},
	/// Reads `size` bytes (1, 2 or 4) at `addr` in the target's register space.
	Rd { size: u8, addr: u32 },
	/// Writes `data` of `size` bytes at `addr` in the target's register space.
	Wr { size: u8, addr: u32, data: u32 },
	/// Requests a mappable window for the target.
	Map,
	/// Releases a window obtained through [`Op::Map`].
	Unmap,
	/// Allocates a notifier slot for `event` on the target.
	NtfyNew { event: u32 },
	/// Frees a notifier slot.
	NtfyDel { index: u8 },
	/// Arms a notifier slot.
	NtfyGet { index: u8 },
	/// Disarms a notifier slot.
	NtfyPut { index: u8 },
}

impl Op {
	/// Short name used in logs.
	pub fn name(&self) -> &'static str {
		match self {
			Op::Nop => "nop",
			Op::Sclass => "sclass",
			Op::New { .. } => "new",
			Op::Del => "del",
			Op::Mthd { .. } => "mthd",
			Op::Rd { .. } => "rd",
			Op::Wr { .. } => "wr",
			Op::Map => "map",
			Op::Unmap => "unmap",
			Op::NtfyNew { .. } => "ntfy_new",
			Op::NtfyDel { .. } => "ntfy_del",
			Op::NtfyGet { .. } => "ntfy_get",
			Op::NtfyPut { .. } => "ntfy_put",
		}
	}
}

/// Successful result of a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
	Nop { version: u8 },
	Sclass { classes: Vec<u32> },
	New { handle: u32, class: u32 },
	Del,
	Mthd {
		#[serde(default)]
		data: Value,
	},
	Rd { data: u32 },
	Wr,
	/// Opaque mapping handle and window length, to be passed to the transport's `map`.
	Map { handle: u64, length: u64 },
	Unmap,
	Ntfy { index: u8 },
}
