//! The in-process transport.
//!
//! Commands are executed synchronously on the caller's thread against a
//! resource root living in the same process, bound to the synthetic address
//! `0000:00:00.0`. Nothing can be mapped.

use std::sync::Arc;

use tracing::debug;

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::ioctl::{Dispatched, Mapping};
use crate::manager::SessionManager;
use crate::root::NULL_BUS_ADDRESS;
use crate::session::{Session, SessionRequest};

/// Registry name of the in-process transport.
pub const NULL_DRIVER: &str = "null";

/// In-process transport sharing one lazily built root among its sessions.
#[derive(Debug)]
pub struct NullDriver {
	manager: Arc<SessionManager>,
}

impl Default for NullDriver {
	fn default() -> Self {
		Self::new()
	}
}

impl NullDriver {
	pub fn new() -> Self {
		Self {
			manager: Arc::new(SessionManager::new(NULL_BUS_ADDRESS)),
		}
	}

	pub fn manager(&self) -> &Arc<SessionManager> {
		&self.manager
	}

	fn check_owner(&self, session: &Session) -> Result<()> {
		if session.is_managed_by(&self.manager) {
			Ok(())
		} else {
			Err(Error::Configuration(format!(
				"session '{}' was not opened by this {NULL_DRIVER} transport",
				session.name()
			)))
		}
	}
}

impl Driver for NullDriver {
	fn name(&self) -> &'static str {
		NULL_DRIVER
	}

	fn create(&self, request: SessionRequest<'_>) -> Result<Session> {
		self.manager.open(NULL_DRIVER, request)
	}

	fn destroy(&self, session: Session) {
		debug!(target = "nvif.null", session = session.name(), "destroy");
		drop(session);
	}

	fn suspend(&self, session: &Session) -> Result<()> {
		self.check_owner(session)?;
		session.core().suspend()
	}

	fn resume(&self, session: &Session) -> Result<()> {
		self.check_owner(session)?;
		session.core().resume()
	}

	fn dispatch(&self, session: &Session, elevated: bool, command: &[u8]) -> Result<Dispatched> {
		self.check_owner(session)?;
		session.core().dispatch(elevated, command)
	}

	fn map(&self, _session: &Session, _handle: u64, _size: u32) -> Option<Mapping> {
		None
	}

	fn unmap(&self, _session: &Session, _mapping: Mapping) {}
}
