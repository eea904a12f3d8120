//! Transport contract and registry.
//!
//! A [`Driver`] moves sessions and command buffers between a client and some
//! resource root. The only built-in transport is the in-process
//! [`NullDriver`](crate::null::NullDriver), registered as `"null"`; the
//! registry exists so callers pick transports by name the same way regardless
//! of which ones are compiled in.

use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ioctl::{Dispatched, Mapping};
use crate::null::NullDriver;
use crate::session::{Session, SessionRequest};

/// Operations every transport provides.
///
/// Implementations must be callable from any thread.
pub trait Driver: Send + Sync {
	/// Registry name of the transport.
	fn name(&self) -> &'static str;

	/// Opens a session, constructing the resource root if needed.
	fn create(&self, request: SessionRequest<'_>) -> Result<Session>;

	/// Finalizes a session and releases its share of the root.
	fn destroy(&self, session: Session);

	/// Moves an `Active` session to `Suspended`.
	fn suspend(&self, session: &Session) -> Result<()>;

	/// Moves a `Suspended` session back to `Active`.
	fn resume(&self, session: &Session) -> Result<()>;

	/// Runs one framed command against the session's objects.
	fn dispatch(&self, session: &Session, elevated: bool, command: &[u8]) -> Result<Dispatched>;

	/// Maps an object window into the caller's address space, if supported.
	fn map(&self, session: &Session, handle: u64, size: u32) -> Option<Mapping>;

	/// Releases a window returned by [`Driver::map`].
	fn unmap(&self, session: &Session, mapping: Mapping);

	/// Whether the root outlives its last session.
	fn keep(&self) -> bool {
		false
	}
}

/// Transports by name, in registration order.
pub struct DriverRegistry {
	drivers: RwLock<IndexMap<&'static str, Arc<dyn Driver>>>,
}

impl DriverRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self {
			drivers: RwLock::new(IndexMap::new()),
		}
	}

	/// A registry holding the built-in transports.
	pub fn with_defaults() -> Self {
		let registry = Self::new();
		registry.register(Arc::new(NullDriver::new()));
		registry
	}

	/// Adds `driver`, returning any transport it replaced.
	pub fn register(&self, driver: Arc<dyn Driver>) -> Option<Arc<dyn Driver>> {
		let name = driver.name();
		debug!(target = "nvif.driver", name, "registering transport");
		self.drivers.write().insert(name, driver)
	}

	/// Looks a transport up by name.
	///
	/// # Errors
	///
	/// Returns [`Error::Configuration`] for unknown names.
	pub fn find(&self, name: &str) -> Result<Arc<dyn Driver>> {
		let drivers = self.drivers.read();
		drivers.get(name).cloned().ok_or_else(|| {
			let known: Vec<&str> = drivers.keys().copied().collect();
			Error::Configuration(format!("unknown transport '{name}' (available: {})", known.join(", ")))
		})
	}

	pub fn names(&self) -> Vec<&'static str> {
		self.drivers.read().keys().copied().collect()
	}
}

impl Default for DriverRegistry {
	fn default() -> Self {
		Self::with_defaults()
	}
}

static DRIVERS: LazyLock<DriverRegistry> = LazyLock::new(DriverRegistry::with_defaults);

/// Process-wide registry, populated with the built-in transports.
pub fn drivers() -> &'static DriverRegistry {
	&DRIVERS
}

/// Shorthand for `drivers().find(name)`.
pub fn find_driver(name: &str) -> Result<Arc<dyn Driver>> {
	drivers().find(name)
}
