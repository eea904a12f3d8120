use std::sync::Arc;

use super::*;
use crate::error::Error;
use crate::root::NULL_BUS_ADDRESS;

fn manager() -> Arc<SessionManager> {
	Arc::new(SessionManager::new(NULL_BUS_ADDRESS))
}

#[test]
fn test_first_session_builds_root_last_tears_it_down() {
	let manager = manager();
	assert!(manager.root().is_none());

	let a = manager.open("null", SessionRequest::new("a")).unwrap();
	let root = manager.root().unwrap().id();
	let b = manager.open("null", SessionRequest::new("b")).unwrap();
	assert_eq!(manager.root().unwrap().id(), root);
	assert_eq!(manager.active_sessions(), 2);

	drop(a);
	assert_eq!(manager.stats().root, Some(root));

	drop(b);
	assert_eq!(
		manager.stats(),
		ManagerStats {
			active: 0,
			constructed: 1,
			destroyed: 1,
			root: None,
		}
	);
}

#[test]
fn test_new_root_after_teardown() {
	let manager = manager();
	let first = manager.open("null", SessionRequest::new("a")).unwrap();
	let first_root = first.root().unwrap().id();
	drop(first);

	let second = manager.open("null", SessionRequest::new("b")).unwrap();
	assert_ne!(second.root().unwrap().id(), first_root);
	assert_eq!(manager.stats().constructed, 2);
}

#[test]
fn test_retained_root_is_detached_after_teardown() {
	let manager = manager();
	let first = manager.open("null", SessionRequest::new("a")).unwrap();
	let retained = first.root().unwrap();
	drop(first);

	assert!(manager.root().is_none());
	assert!(retained.dump().is_clean());

	let second = manager.open("null", SessionRequest::new("b")).unwrap();
	second.channel().nop().unwrap();
	assert_ne!(manager.root().unwrap().id(), retained.id());
	assert_eq!(retained.dump().dispatches, 0);
}

#[test]
fn test_bad_config_leaves_no_trace() {
	let manager = manager();
	let err = manager
		.open("null", SessionRequest::new("a").with_config("NvI2cPorts"))
		.unwrap_err();
	assert!(matches!(err, Error::Configuration(_)), "{err:?}");
	assert_eq!(manager.stats().constructed, 0);

	let err = manager
		.open("null", SessionRequest::new("a").with_debug("chatty"))
		.unwrap_err();
	assert!(matches!(err, Error::Configuration(_)), "{err:?}");
	assert!(manager.root().is_none());
}

#[test]
fn test_device_creation_failure_leaves_no_root() {
	let manager = manager();
	let err = manager
		.open("null", SessionRequest::new("a").with_config("NvI2cPorts=99"))
		.unwrap_err();
	assert!(matches!(err, Error::DeviceCreation { .. }), "{err:?}");
	assert_eq!(manager.stats().constructed, 0);
	assert_eq!(manager.active_sessions(), 0);
}

#[test]
fn test_session_failure_on_fresh_root_rolls_back() {
	let manager = manager();
	let err = manager.open("null", SessionRequest::new("")).unwrap_err();
	assert!(matches!(err, Error::SessionCreation { .. }), "{err:?}");

	let stats = manager.stats();
	assert_eq!((stats.active, stats.constructed, stats.destroyed), (0, 1, 1));
	assert!(manager.root().is_none());
}

#[test]
fn test_session_failure_on_shared_root_keeps_it() {
	let manager = manager();
	let keeper = manager.open("null", SessionRequest::new("keeper")).unwrap();
	let root = manager.root().unwrap().id();

	assert!(manager.open("null", SessionRequest::new("")).is_err());
	assert_eq!(manager.active_sessions(), 1);
	assert_eq!(manager.root().unwrap().id(), root);
	drop(keeper);
}

#[test]
fn test_later_config_does_not_reconfigure_root() {
	let manager = manager();
	let _a = manager
		.open("null", SessionRequest::new("a").with_config("NvI2cPorts=4"))
		.unwrap();
	let b = manager
		.open("null", SessionRequest::new("b").with_config("NvI2cPorts=1"))
		.unwrap();
	assert_eq!(b.root().unwrap().i2c().unwrap().ports().len(), 4);
}

#[test]
fn test_teardown_dump_counts_sessions() {
	let manager = manager();
	let a = manager.open("null", SessionRequest::new("a")).unwrap();
	let b = manager.open("null", SessionRequest::new("b")).unwrap();
	a.channel().nop().unwrap();
	drop((a, b));

	let dump = manager.last_dump().unwrap();
	assert_eq!(dump.sessions_served, 2);
	assert_eq!(dump.dispatches, 1);
	assert!(dump.is_clean());
}
