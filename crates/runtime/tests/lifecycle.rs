//! Integration tests for session lifecycle and root ownership.

use std::sync::Barrier;
use std::thread;

use nvif_protocol::{NV_DEVICE, NV_DEVICE_V0_I2C_PORTS, PortInfo};
use nvif_runtime::{Driver, Error, NullDriver, SessionRequest, SessionState, find_driver};
use serde_json::json;

#[test]
fn concurrent_creates_build_one_root() {
	const SESSIONS: usize = 16;
	let driver = NullDriver::new();
	let barrier = Barrier::new(SESSIONS);

	let sessions: Vec<_> = thread::scope(|scope| {
		let handles: Vec<_> = (0..SESSIONS)
			.map(|i| {
				let driver = &driver;
				let barrier = &barrier;
				scope.spawn(move || {
					let name = format!("client-{i}");
					barrier.wait();
					driver.create(SessionRequest::new(&name)).unwrap()
				})
			})
			.collect();
		handles.into_iter().map(|handle| handle.join().unwrap()).collect()
	});

	let stats = driver.manager().stats();
	assert_eq!(stats.active, SESSIONS);
	assert_eq!(stats.constructed, 1);
	let root = stats.root.unwrap();
	assert!(sessions.iter().all(|session| session.root().unwrap().id() == root));

	thread::scope(|scope| {
		for session in sessions {
			let driver = &driver;
			scope.spawn(move || driver.destroy(session));
		}
	});

	let stats = driver.manager().stats();
	assert_eq!((stats.active, stats.constructed, stats.destroyed), (0, 1, 1));
	assert!(driver.manager().last_dump().unwrap().is_clean());
}

#[test]
fn root_survives_until_last_session() {
	let driver = NullDriver::new();
	let a = driver.create(SessionRequest::new("a")).unwrap();
	let b = driver.create(SessionRequest::new("b")).unwrap();
	let root = a.root().unwrap().id();

	driver.destroy(a);
	assert_eq!(b.root().unwrap().id(), root);
	b.channel().nop().unwrap();

	driver.destroy(b);
	assert!(driver.manager().root().is_none());

	let c = driver.create(SessionRequest::new("c")).unwrap();
	assert_ne!(c.root().unwrap().id(), root);
}

#[test]
fn suspend_keeps_objects() {
	let driver = NullDriver::new();
	let session = driver.create(SessionRequest::new("sleepy")).unwrap();
	let device = session.channel().create(1, NV_DEVICE, json!({})).unwrap();
	let handles = session.handles();

	driver.suspend(&session).unwrap();
	assert_eq!(session.state(), SessionState::Suspended);
	assert!(device.sclass().unwrap_err().is_invalid_state());
	driver.resume(&session).unwrap();

	assert_eq!(session.handles(), handles);
	let ports: Vec<PortInfo> = device.mthd(NV_DEVICE_V0_I2C_PORTS, json!({})).unwrap();
	assert_eq!(ports.len(), 2);
}

#[test]
fn suspended_session_still_pins_root() {
	let driver = NullDriver::new();
	let session = driver.create(SessionRequest::new("pin")).unwrap();
	driver.suspend(&session).unwrap();

	let other = driver.create(SessionRequest::new("other")).unwrap();
	driver.destroy(other);
	assert!(driver.manager().root().is_some());

	driver.destroy(session);
	assert!(driver.manager().root().is_none());
}

#[test]
fn dropping_a_session_releases_it() {
	let driver = NullDriver::new();
	{
		let _session = driver.create(SessionRequest::new("scoped")).unwrap();
		assert_eq!(driver.manager().active_sessions(), 1);
	}
	assert_eq!(driver.manager().active_sessions(), 0);
	assert_eq!(driver.manager().stats().destroyed, 1);
}

#[test]
fn destroy_releases_every_object() {
	let driver = NullDriver::new();
	let session = driver.create(SessionRequest::new("tidy")).unwrap();
	session.channel().create(1, NV_DEVICE, json!({})).unwrap();
	driver.destroy(session);

	let dump = driver.manager().last_dump().unwrap();
	assert_eq!(dump.live_objects, 0);
	assert_eq!(dump.sessions_served, 1);
}

#[test]
fn null_transport_cannot_map() {
	let driver = NullDriver::new();
	let session = driver.create(SessionRequest::new("mapper")).unwrap();
	let mapping = nvif_runtime::Mapping { address: 0, size: 4096 };

	assert!(driver.map(&session, 0, 4096).is_none());
	driver.unmap(&session, mapping);
	assert!(!driver.keep());
	assert_eq!(session.state(), SessionState::Active);
}

#[test]
fn failures_leave_counts_untouched() {
	let driver = NullDriver::new();
	for request in [
		SessionRequest::new("bad-config").with_config("NvI2cDevice=0:0x90"),
		SessionRequest::new("bad-debug").with_debug("loud"),
		SessionRequest::new("bad-topology").with_config("NvI2cPorts=1,NvI2cDevice=3:0x50"),
		SessionRequest::new(""),
	] {
		assert!(driver.create(request).is_err(), "{request:?}");
		assert_eq!(driver.manager().active_sessions(), 0);
		assert!(driver.manager().root().is_none());
	}

	let session = driver.create(SessionRequest::new("good")).unwrap();
	assert_eq!(driver.manager().active_sessions(), 1);
	driver.destroy(session);
}

#[test]
fn foreign_sessions_are_rejected() {
	let first = NullDriver::new();
	let second = NullDriver::new();
	let session = first.create(SessionRequest::new("mine")).unwrap();

	assert!(matches!(second.suspend(&session), Err(Error::Configuration(_))));
	assert_eq!(session.state(), SessionState::Active);
	first.destroy(session);
}

#[test]
fn registry_hands_out_the_null_transport() {
	let driver = find_driver("null").unwrap();
	let session = driver.create(SessionRequest::new("registry")).unwrap();
	assert_eq!(session.driver(), "null");
	driver.destroy(session);

	assert!(matches!(find_driver("nouveau"), Err(Error::Configuration(_))));
}
