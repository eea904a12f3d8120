//! Sessions and their lifecycle.
//!
//! A [`Session`] is one client's attachment to the shared resource root. It is
//! created `Active`, may move between `Active` and `Suspended` any number of
//! times, and ends `Finalized` exactly once: either through
//! [`Driver::destroy`](crate::driver::Driver::destroy), which consumes it, or
//! when it is dropped.
//!
//! Lifecycle changes take the session's state lock for writing, while dispatch
//! holds it for reading. A suspend or destroy therefore waits for in-flight
//! commands of the same session and never interleaves with them.


use std::fmt;
use std::sync::{Arc, Weak};

use nvif_protocol::{ANY_DEVICE, CLIENT_HANDLE};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::channel::Channel;
use crate::config::{DebugConfig, DebugLevel};
use crate::error::{DispatchError, Error, Result};
use crate::ioctl::{self, Dispatched};
use crate::manager::SessionManager;
use crate::notify::{NotifyEvent, Notifier};
use crate::object::{ClientObject, ObjectStore};
use crate::root::ResourceRoot;

/// Longest accepted session name.
pub const MAX_NAME_LEN: usize = 31;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
	/// Being constructed; never observable from outside.
	Uninitialized,
	Active,
	Suspended,
	Finalized,
}

impl SessionState {
	pub fn as_str(&self) -> &'static str {
		match self {
			SessionState::Uninitialized => "uninitialized",
			SessionState::Active => "active",
			SessionState::Suspended => "suspended",
			SessionState::Finalized => "finalized",
		}
	}
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Parameters for opening a session.
///
/// # Example
///
/// ```ignore
/// let request = SessionRequest::new("nv-i2c")
///     .with_config("NvI2cDevice=0:0x50")
///     .with_debug("trace");
/// let session = driver.create(request)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRequest<'a> {
	/// Client name, used in logs and notifications.
	pub name: &'a str,
	/// Device selector. Recorded on the session; the in-process transport
	/// binds every client to its single root whatever the value.
	pub device: u64,
	/// Root configuration, only honored by the session that builds the root.
	pub config: Option<&'a str>,
	/// Debug level string for this session.
	pub debug: Option<&'a str>,
}

impl<'a> SessionRequest<'a> {
	pub fn new(name: &'a str) -> Self {
		Self {
			name,
			device: ANY_DEVICE,
			config: None,
			debug: None,
		}
	}

	pub fn with_device(mut self, device: u64) -> Self {
		self.device = device;
		self
	}

	pub fn with_config(mut self, config: &'a str) -> Self {
		self.config = Some(config);
		self
	}

	pub fn with_debug(mut self, debug: &'a str) -> Self {
		self.debug = Some(debug);
		self
	}
}

/// State shared by a session and the channels derived from it.
pub(crate) struct SessionCore {
	name: Arc<str>,
	device: u64,
	debug: DebugConfig,
	root: Weak<ResourceRoot>,
	notifier: Arc<Notifier>,
	objects: ObjectStore,
	state: RwLock<SessionState>,
}

impl SessionCore {
	/// Builds the session's client object against `root`.
	pub(crate) fn new(
		request: &SessionRequest<'_>,
		debug: DebugConfig,
		root: &Arc<ResourceRoot>,
		notifier: Arc<Notifier>,
	) -> Result<Self> {
		let fail = |reason: String| Error::SessionCreation {
			name: request.name.to_string(),
			reason,
		};

		if request.name.is_empty() {
			return Err(fail("name is empty".into()));
		}
		if request.name.len() > MAX_NAME_LEN {
			return Err(fail(format!("name is longer than {MAX_NAME_LEN} bytes")));
		}

		let core = Self {
			name: Arc::from(request.name),
			device: request.device,
			debug,
			root: Arc::downgrade(root),
			notifier,
			objects: ObjectStore::new(),
			state: RwLock::new(SessionState::Uninitialized),
		};
		core.objects
			.insert(CLIENT_HANDLE, None, Arc::new(ClientObject))
			.map_err(|err| fail(err.to_string()))?;
		root.object_created();
		*core.state.write() = SessionState::Active;
		Ok(core)
	}

	pub(crate) fn name(&self) -> &str {
		&self.name
	}

	pub(crate) fn state(&self) -> SessionState {
		*self.state.read()
	}

	pub(crate) fn debug(&self) -> &DebugConfig {
		&self.debug
	}

	pub(crate) fn objects(&self) -> &ObjectStore {
		&self.objects
	}

	pub(crate) fn name_arc(&self) -> &Arc<str> {
		&self.name
	}

	pub(crate) fn device(&self) -> u64 {
		self.device
	}

	pub(crate) fn root(&self) -> Option<Arc<ResourceRoot>> {
		self.root.upgrade()
	}

	/// Runs one command against the session's object tree.
	///
	/// Events raised by the command reach subscribers after the state guard
	/// is released, so handlers may dispatch on or change the lifecycle of
	/// this same session.
	pub(crate) fn dispatch(&self, elevated: bool, command: &[u8]) -> Result<Dispatched> {
		let mut raised = Vec::new();
		let result = self.dispatch_active(elevated, command, &mut raised);
		for event in &raised {
			self.notifier.deliver(event);
		}
		result
	}

	fn dispatch_active(&self, elevated: bool, command: &[u8], raised: &mut Vec<NotifyEvent>) -> Result<Dispatched> {
		let state = self.state.read();
		if *state != SessionState::Active {
			return Err(Error::InvalidStateTransition {
				op: "dispatch",
				state: *state,
			});
		}
		let root = self
			.root
			.upgrade()
			.ok_or_else(|| DispatchError::IoFailure("resource root is gone".into()))?;

		ioctl::execute(self, &root, elevated, command, raised).map_err(Error::from)
	}

	pub(crate) fn suspend(&self) -> Result<()> {
		let mut state = self.state.write();
		if *state != SessionState::Active {
			return Err(Error::InvalidStateTransition {
				op: "suspend",
				state: *state,
			});
		}
		for object in self.objects.objects() {
			object.fini(true);
		}
		*state = SessionState::Suspended;
		debug!(target = "nvif.session", session = %self.name, "suspended");
		Ok(())
	}

	pub(crate) fn resume(&self) -> Result<()> {
		let mut state = self.state.write();
		if *state != SessionState::Suspended {
			return Err(Error::InvalidStateTransition {
				op: "resume",
				state: *state,
			});
		}
		for object in self.objects.objects() {
			object.init();
		}
		*state = SessionState::Active;
		debug!(target = "nvif.session", session = %self.name, "resumed");
		Ok(())
	}

	/// Tears the object tree down; returns false if it already was.
	pub(crate) fn finalize(&self) -> bool {
		let mut state = self.state.write();
		if *state == SessionState::Finalized {
			return false;
		}
		for object in self.objects.objects() {
			object.fini(false);
		}
		let released = self.objects.clear();
		match self.root.upgrade() {
			Some(root) => root.objects_destroyed(released),
			None => warn!(target = "nvif.session", session = %self.name, "resource root vanished before session"),
		}
		*state = SessionState::Finalized;
		debug!(target = "nvif.session", session = %self.name, released, "finalized");
		true
	}
}

/// One client's attachment to the resource root.
///
/// Dropping a session finalizes it and releases its share of the root.
pub struct Session {
	core: Arc<SessionCore>,
	manager: Arc<SessionManager>,
	driver: &'static str,
}

impl Session {
	pub(crate) fn new(core: SessionCore, manager: Arc<SessionManager>, driver: &'static str) -> Self {
		Self {
			core: Arc::new(core),
			manager,
			driver,
		}
	}

	pub fn name(&self) -> &str {
		self.core.name()
	}

	/// Device selector the session was opened with.
	pub fn device(&self) -> u64 {
		self.core.device()
	}

	pub fn state(&self) -> SessionState {
		self.core.state()
	}

	/// Name of the transport that created the session.
	pub fn driver(&self) -> &'static str {
		self.driver
	}

	pub fn debug_level(&self) -> DebugLevel {
		self.core.debug().level()
	}

	/// The root this session is attached to, while it exists.
	///
	/// The reference is for inspection; keeping it does not keep the root
	/// attached to the manager.
	pub fn root(&self) -> Option<Arc<ResourceRoot>> {
		self.core.root()
	}

	/// Handles of the session's live objects, in ascending order.
	pub fn handles(&self) -> Vec<u32> {
		self.core.objects().handles()
	}

	/// Typed helper bound to the session's client object.
	pub fn channel(&self) -> Channel {
		Channel::new(CLIENT_HANDLE, Arc::clone(&self.core))
	}

	pub(crate) fn core(&self) -> &SessionCore {
		&self.core
	}

	/// Whether this session belongs to `manager`.
	pub(crate) fn is_managed_by(&self, manager: &Arc<SessionManager>) -> bool {
		Arc::ptr_eq(&self.manager, manager)
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("name", &self.name())
			.field("driver", &self.driver)
			.field("state", &self.state())
			.finish()
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		if self.core.finalize() {
			self.manager.release(self.core.name());
		}
	}
}
