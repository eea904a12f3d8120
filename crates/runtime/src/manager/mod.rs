//! Reference-counted ownership of the resource root.
//!
//! The [`SessionManager`] builds the root when the first session opens and
//! tears it down when the last one closes. Its counter and the root slot sit
//! behind one lock, so construction, attachment and teardown never interleave
//! across threads.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{Config, DebugConfig};
use crate::error::Result;
use crate::notify::Notifier;
use crate::root::{BusAddress, ResourceRoot, RootConfig, RootDump};
use crate::session::{Session, SessionCore, SessionRequest};

#[derive(Debug, Default)]
struct ManagerState {
	active: usize,
	root: Option<Arc<ResourceRoot>>,
	constructed: u64,
	destroyed: u64,
	last_dump: Option<RootDump>,
}

/// Snapshot of a manager's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerStats {
	/// Sessions currently holding the root.
	pub active: usize,
	/// Roots built so far.
	pub constructed: u64,
	/// Roots torn down so far.
	pub destroyed: u64,
	/// Id of the current root, if one exists.
	pub root: Option<u64>,
}

/// Owns the shared root and counts the sessions using it.
#[derive(Debug)]
pub struct SessionManager {
	address: BusAddress,
	notifier: Arc<Notifier>,
	state: Mutex<ManagerState>,
}

impl SessionManager {
	/// A manager whose roots live at `address`.
	pub fn new(address: BusAddress) -> Self {
		Self {
			address,
			notifier: Arc::new(Notifier::new()),
			state: Mutex::new(ManagerState::default()),
		}
	}

	pub fn address(&self) -> BusAddress {
		self.address
	}

	/// The hook every session's notifications are delivered through.
	pub fn notifier(&self) -> &Arc<Notifier> {
		&self.notifier
	}

	pub fn active_sessions(&self) -> usize {
		self.state.lock().active
	}

	/// The current root, if any session holds it.
	///
	/// For inspection only; see the [`root`](crate::root) module on retained
	/// references.
	pub fn root(&self) -> Option<Arc<ResourceRoot>> {
		self.state.lock().root.clone()
	}

	pub fn stats(&self) -> ManagerStats {
		let state = self.state.lock();
		ManagerStats {
			active: state.active,
			constructed: state.constructed,
			destroyed: state.destroyed,
			root: state.root.as_ref().map(|root| root.id()),
		}
	}

	/// Diagnostic dump taken when the most recent root was torn down.
	pub fn last_dump(&self) -> Option<RootDump> {
		self.state.lock().last_dump.clone()
	}

	/// Opens a session, building the root if this is the first one.
	///
	/// On failure the counter and root are left exactly as they were.
	pub fn open(self: &Arc<Self>, driver: &'static str, request: SessionRequest<'_>) -> Result<Session> {
		let config = Config::parse(request.config)?;
		let root_config = RootConfig::from_config(&config)?;
		let debug = DebugConfig::parse(request.debug)?;

		let mut state = self.state.lock();
		let (root, built) = match &state.root {
			Some(root) => {
				if !config.is_empty() {
					debug!(
						target = "nvif.manager",
						session = request.name,
						root = root.id(),
						"root already exists; config ignored"
					);
				}
				(Arc::clone(root), false)
			}
			None => {
				let root = Arc::new(ResourceRoot::create(self.address, &root_config, debug.clone())?);
				info!(
					target = "nvif.manager",
					root = root.id(),
					address = %self.address,
					ports = root.i2c().map_or(0, |i2c| i2c.ports().len()),
					"resource root constructed"
				);
				state.constructed += 1;
				state.root = Some(Arc::clone(&root));
				(root, true)
			}
		};

		match SessionCore::new(&request, debug, &root, Arc::clone(&self.notifier)) {
			Ok(core) => {
				state.active += 1;
				root.session_attached();
				debug!(
					target = "nvif.manager",
					session = request.name,
					active = state.active,
					"session opened"
				);
				Ok(Session::new(core, Arc::clone(self), driver))
			}
			Err(err) => {
				if built {
					Self::teardown(&mut state);
				}
				Err(err)
			}
		}
	}

	/// Drops one session's share of the root.
	pub(crate) fn release(&self, session: &str) {
		let mut state = self.state.lock();
		let Some(active) = state.active.checked_sub(1) else {
			error!(target = "nvif.manager", session, "release without an active session");
			return;
		};
		state.active = active;
		debug!(target = "nvif.manager", session, active, "session closed");
		if active == 0 {
			Self::teardown(&mut state);
		}
	}

	fn teardown(state: &mut ManagerState) {
		let Some(root) = state.root.take() else {
			return;
		};
		let dump = root.dump();
		if dump.is_clean() {
			info!(
				target = "nvif.manager",
				root = dump.id,
				sessions = dump.sessions_served,
				dispatches = dump.dispatches,
				"resource root destroyed"
			);
		} else {
			warn!(
				target = "nvif.manager",
				root = dump.id,
				live_objects = dump.live_objects,
				"resource root destroyed with live objects"
			);
		}
		state.destroyed += 1;
		state.last_dump = Some(dump);
	}
}
