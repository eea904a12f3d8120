//! Command interpreter.
//!
//! [`execute`] decodes one framed [`Request`], runs it against the session's
//! object tree and encodes the [`Reply`]. Failures come back as
//! [`DispatchError`] values; a failed command leaves the tree as it was.
//! Events raised while a command runs are appended to the caller's queue
//! instead of being delivered in place.


use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use nvif_protocol::{CLIENT_HANDLE, FrameError, IOCTL_VERSION, Op, Reply, Request};
use tracing::{debug, trace};

use crate::config::DebugLevel;
use crate::error::DispatchError;
use crate::notify::NotifyEvent;
use crate::object::{Context, EventSource, Object};
use crate::root::ResourceRoot;
use crate::session::SessionCore;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// A handle created by a command, reported back to the transport so it can
/// later service map and unmap requests for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingHandle {
	pub handle: u32,
	pub class: u32,
	/// Process-unique token for the new object.
	pub token: u64,
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
	/// Framed reply buffer.
	pub reply: Vec<u8>,
	pub pending: Option<PendingHandle>,
}

impl Dispatched {
	/// Decodes the reply buffer.
	pub fn decode(&self) -> Result<Reply, FrameError> {
		nvif_protocol::decode(&self.reply)
	}
}

/// A window returned by a transport's `map`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
	pub address: usize,
	pub size: u32,
}

fn check_size(size: u8) -> Result<(), DispatchError> {
	match size {
		1 | 2 | 4 => Ok(()),
		_ => Err(DispatchError::InvalidArgument(format!("access size {size} is not 1, 2 or 4"))),
	}
}

fn events(object: &dyn Object) -> Result<&EventSource, DispatchError> {
	object
		.events()
		.ok_or_else(|| DispatchError::Unsupported(format!("class {:#x} raises no events", object.class())))
}

pub(crate) fn execute(
	session: &SessionCore,
	root: &ResourceRoot,
	elevated: bool,
	command: &[u8],
	raised: &mut Vec<NotifyEvent>,
) -> Result<Dispatched, DispatchError> {
	let request: Request = nvif_protocol::decode(command)?;
	root.record_dispatch();
	if request.version != IOCTL_VERSION {
		return Err(DispatchError::Unsupported(format!("protocol version {}", request.version)));
	}

	if session.debug().level_for("IOCTL") >= DebugLevel::Trace {
		trace!(
			target = "nvif.ioctl",
			session = session.name(),
			object = request.object,
			op = request.op.name(),
			elevated,
			"dispatch"
		);
	}

	let queue = RefCell::new(Vec::new());
	let result = run(session, root, elevated, request.object, request.op, &queue);
	raised.append(&mut queue.into_inner());
	if let Err(err) = &result {
		debug!(
			target = "nvif.ioctl",
			session = session.name(),
			object = request.object,
			errno = err.errno(),
			error = %err,
			"command failed"
		);
	}
	let (reply, pending) = result?;

	Ok(Dispatched {
		reply: nvif_protocol::encode(&reply)?,
		pending,
	})
}

fn run(
	session: &SessionCore,
	root: &ResourceRoot,
	elevated: bool,
	handle: u32,
	op: Op,
	raised: &RefCell<Vec<NotifyEvent>>,
) -> Result<(Reply, Option<PendingHandle>), DispatchError> {
	let objects = session.objects();
	let object = objects.get(handle).ok_or(DispatchError::BadHandle(handle))?;
	let ctx = Context {
		root,
		elevated,
		handle,
		session: session.name_arc(),
		raised,
	};

	let reply = match op {
		Op::Nop => Reply::Nop {
			version: IOCTL_VERSION,
		},
		Op::Sclass => Reply::Sclass {
			classes: object.sclass(&ctx),
		},
		Op::New { handle: child, class, args } => {
			if objects.contains(child) {
				return Err(DispatchError::InvalidArgument(format!("handle {child:#x} is already in use")));
			}
			if !object.sclass(&ctx).contains(&class) {
				return Err(DispatchError::Unsupported(format!(
					"class {class:#x} under class {:#x}",
					object.class()
				)));
			}
			let created = object.new_child(&ctx, class, &args)?;
			objects.insert(child, Some(handle), created)?;
			root.object_created();
			let pending = PendingHandle {
				handle: child,
				class,
				token: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
			};
			return Ok((Reply::New { handle: child, class }, Some(pending)));
		}
		Op::Del => {
			if handle == CLIENT_HANDLE {
				return Err(DispatchError::PermissionDenied("the client object cannot be deleted".into()));
			}
			let removed = objects.remove_tree(handle);
			for object in &removed {
				object.fini(false);
			}
			root.objects_destroyed(removed.len());
			Reply::Del
		}
		Op::Mthd { method, args } => Reply::Mthd {
			data: object.mthd(&ctx, method, &args)?,
		},
		Op::Rd { size, addr } => {
			check_size(size)?;
			Reply::Rd {
				data: object.rd(&ctx, size, addr)?,
			}
		}
		Op::Wr { size, addr, data } => {
			check_size(size)?;
			object.wr(&ctx, size, addr, data)?;
			Reply::Wr
		}
		Op::Map => {
			let (handle, length) = object.map(&ctx)?;
			Reply::Map { handle, length }
		}
		Op::Unmap => {
			object.unmap(&ctx)?;
			Reply::Unmap
		}
		Op::NtfyNew { event } => Reply::Ntfy {
			index: events(object.as_ref())?.alloc(event)?,
		},
		Op::NtfyDel { index } => {
			events(object.as_ref())?.free(index)?;
			Reply::Ntfy { index }
		}
		Op::NtfyGet { index } => {
			events(object.as_ref())?.arm(index, true)?;
			Reply::Ntfy { index }
		}
		Op::NtfyPut { index } => {
			events(object.as_ref())?.arm(index, false)?;
			Reply::Ntfy { index }
		}
	};

	Ok((reply, None))
}
