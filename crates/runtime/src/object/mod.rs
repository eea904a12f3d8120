//! Per-session object tree.
//!
//! Every session owns an [`ObjectStore`] mapping caller-chosen handles to
//! [`Object`]s. Handle `0` is the session's client; everything else hangs off
//! it through `new` commands. Objects reach the shared root only through the
//! [`Context`] handed to each call.

mod client;
mod device;
mod event;
mod port;


use std::cell::RefCell;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use downcast_rs::{DowncastSync, impl_downcast};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub(crate) use self::client::ClientObject;
pub use self::device::DeviceObject;
pub use self::event::{EventSource, MAX_NOTIFIERS};
pub use self::port::PortObject;
use crate::error::DispatchError;
use crate::notify::NotifyEvent;
use crate::root::ResourceRoot;

/// What an object sees of its surroundings during one command.
pub struct Context<'a> {
	/// The shared root, kept alive for the duration of the command.
	pub root: &'a ResourceRoot,
	/// Whether the caller asked to bypass permission checks.
	pub elevated: bool,
	/// Handle of the object being addressed.
	pub handle: u32,
	pub(crate) session: &'a Arc<str>,
	pub(crate) raised: &'a RefCell<Vec<NotifyEvent>>,
}

impl Context<'_> {
	/// Raises an event through the session's notification hook.
	///
	/// Events are queued and delivered once the command has finished and the
	/// session lock is released.
	pub fn raise(&self, index: u8, event: u32, payload: Value) {
		self.raised.borrow_mut().push(NotifyEvent {
			session: Arc::clone(self.session),
			object: self.handle,
			index,
			event,
			payload,
		});
	}
}

/// An object in a session's tree.
///
/// Defaults reject every operation as unsupported, so classes only implement
/// what they actually provide.
pub trait Object: DowncastSync {
	/// Class identifier.
	fn class(&self) -> u32;

	/// Classes that may be created as children of this object.
	fn sclass(&self, _ctx: &Context<'_>) -> Vec<u32> {
		Vec::new()
	}

	/// Constructs a child of `class`; only called for classes in [`Object::sclass`].
	fn new_child(&self, _ctx: &Context<'_>, class: u32, _args: &Value) -> Result<Arc<dyn Object>, DispatchError> {
		Err(DispatchError::Unsupported(format!("class {class:#x} has no constructor here")))
	}

	fn mthd(&self, _ctx: &Context<'_>, method: u32, _args: &Value) -> Result<Value, DispatchError> {
		Err(DispatchError::Unsupported(format!(
			"method {method:#x} on class {:#x}",
			self.class()
		)))
	}

	fn rd(&self, _ctx: &Context<'_>, _size: u8, _addr: u32) -> Result<u32, DispatchError> {
		Err(DispatchError::Unsupported(format!("rd on class {:#x}", self.class())))
	}

	fn wr(&self, _ctx: &Context<'_>, _size: u8, _addr: u32, _data: u32) -> Result<(), DispatchError> {
		Err(DispatchError::Unsupported(format!("wr on class {:#x}", self.class())))
	}

	/// Returns `(handle, length)` of a mappable window.
	fn map(&self, _ctx: &Context<'_>) -> Result<(u64, u64), DispatchError> {
		Err(DispatchError::Unsupported(format!("map on class {:#x}", self.class())))
	}

	fn unmap(&self, _ctx: &Context<'_>) -> Result<(), DispatchError> {
		Err(DispatchError::Unsupported(format!("unmap on class {:#x}", self.class())))
	}

	/// Notifier slots, for classes that raise events.
	fn events(&self) -> Option<&EventSource> {
		None
	}

	/// Brings the object back after a suspend.
	fn init(&self) {}

	/// Quiesces the object; `suspend` is false when the object is going away.
	fn fini(&self, _suspend: bool) {}
}

impl_downcast!(sync Object);

/// Decodes constructor or method arguments; omitted arguments read as `{}`.
pub(crate) fn decode_args<T: DeserializeOwned>(args: &Value) -> Result<T, DispatchError> {
	let args = match args {
		Value::Null => Value::Object(serde_json::Map::new()),
		other => other.clone(),
	};
	Ok(serde_json::from_value(args)?)
}

struct Node {
	object: Arc<dyn Object>,
	parent: Option<u32>,
}

/// Thread-safe registry of a session's objects by handle.
///
/// Lookups go straight to the map. Insertions and cascade removals also take
/// `tree`, so a child is never attached to a parent that is being removed.
pub struct ObjectStore {
	nodes: DashMap<u32, Node>,
	tree: Mutex<()>,
}

impl Default for ObjectStore {
	fn default() -> Self {
		Self::new()
	}
}

impl ObjectStore {
	pub fn new() -> Self {
		Self {
			nodes: DashMap::new(),
			tree: Mutex::new(()),
		}
	}

	/// Inserts `object` under `parent`, failing if `handle` is taken or the
	/// parent no longer exists.
	pub fn insert(&self, handle: u32, parent: Option<u32>, object: Arc<dyn Object>) -> Result<(), DispatchError> {
		let _tree = self.tree.lock();
		if let Some(parent) = parent {
			if !self.nodes.contains_key(&parent) {
				return Err(DispatchError::BadHandle(parent));
			}
		}
		match self.nodes.entry(handle) {
			Entry::Occupied(_) => Err(DispatchError::InvalidArgument(format!("handle {handle:#x} is already in use"))),
			Entry::Vacant(slot) => {
				slot.insert(Node { object, parent });
				Ok(())
			}
		}
	}

	pub fn get(&self, handle: u32) -> Option<Arc<dyn Object>> {
		self.nodes.get(&handle).map(|node| Arc::clone(&node.object))
	}

	pub fn contains(&self, handle: u32) -> bool {
		self.nodes.contains_key(&handle)
	}

	/// Looks up `handle` and downcasts it to a concrete class.
	pub fn get_as<T: Object>(&self, handle: u32) -> Option<Arc<T>> {
		self.get(handle).and_then(|object| object.into_any_arc().downcast::<T>().ok())
	}

	/// Removes `handle` and every descendant, returning the removed objects
	/// children first.
	pub fn remove_tree(&self, handle: u32) -> Vec<Arc<dyn Object>> {
		let _tree = self.tree.lock();
		let mut order = vec![handle];
		let mut next = 0;
		while next < order.len() {
			let parent = order[next];
			order.extend(
				self.nodes
					.iter()
					.filter(|node| node.parent == Some(parent))
					.map(|node| *node.key()),
			);
			next += 1;
		}

		order
			.into_iter()
			.rev()
			.filter_map(|handle| self.nodes.remove(&handle).map(|(_, node)| node.object))
			.collect()
	}

	/// Every live object, in no particular order.
	pub fn objects(&self) -> Vec<Arc<dyn Object>> {
		self.nodes.iter().map(|node| Arc::clone(&node.object)).collect()
	}

	pub fn handles(&self) -> Vec<u32> {
		let mut handles: Vec<u32> = self.nodes.iter().map(|node| *node.key()).collect();
		handles.sort_unstable();
		handles
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Drops every object and returns how many there were.
	pub fn clear(&self) -> usize {
		let _tree = self.tree.lock();
		let count = self.nodes.len();
		self.nodes.clear();
		count
	}
}
