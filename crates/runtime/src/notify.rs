//! Notification attachment point.
//!
//! Every session's hook points at the [`Notifier`] owned by its transport.
//! Objects raise [`NotifyEvent`]s through their session; the notifier fans
//! them out to subscribers in subscription order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

/// Unique identifier for notification handlers.
pub type HandlerId = u64;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

fn next_handler_id() -> HandlerId {
	NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Handler invoked for every delivered event.
pub type NotifyHandler = Arc<dyn Fn(&NotifyEvent) + Send + Sync>;

type HandlerMap = Arc<Mutex<IndexMap<HandlerId, NotifyHandler>>>;

/// An event raised by an object on behalf of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyEvent {
	/// Name of the session that owns the raising object.
	pub session: Arc<str>,
	/// Handle of the raising object.
	pub object: u32,
	/// Notifier slot the caller armed.
	pub index: u8,
	/// Event type the slot was allocated for.
	pub event: u32,
	pub payload: Value,
}

/// Shared dispatcher for notifications.
#[derive(Default)]
pub struct Notifier {
	handlers: HandlerMap,
}

impl Notifier {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler`; it stays registered until the returned
	/// [`Subscription`] is dropped.
	pub fn subscribe<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&NotifyEvent) + Send + Sync + 'static,
	{
		let id = next_handler_id();
		self.handlers.lock().insert(id, Arc::new(handler));
		Subscription {
			id,
			handlers: Some(Arc::downgrade(&self.handlers)),
		}
	}

	/// Delivers `event` to every subscriber and returns how many saw it.
	///
	/// Handlers run outside the notifier's lock, so they may subscribe or
	/// unsubscribe. Sessions call this after releasing their own state lock.
	pub fn deliver(&self, event: &NotifyEvent) -> usize {
		let handlers: Vec<NotifyHandler> = self.handlers.lock().values().cloned().collect();
		for handler in &handlers {
			handler(event);
		}
		handlers.len()
	}

	pub fn subscribers(&self) -> usize {
		self.handlers.lock().len()
	}
}

impl std::fmt::Debug for Notifier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Notifier")
			.field("subscribers", &self.subscribers())
			.finish()
	}
}

/// RAII handle that removes its handler on drop.
///
/// Holds a weak reference, so dropping it after the notifier is gone is a no-op.
pub struct Subscription {
	id: HandlerId,
	handlers: Option<Weak<Mutex<IndexMap<HandlerId, NotifyHandler>>>>,
}

impl Subscription {
	pub fn id(&self) -> HandlerId {
		self.id
	}

	/// Explicitly unsubscribes. Equivalent to dropping.
	pub fn unsubscribe(mut self) {
		self.remove();
	}

	fn remove(&mut self) {
		if let Some(map) = self.handlers.take().and_then(|weak| weak.upgrade()) {
			map.lock().shift_remove(&self.id);
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.remove();
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.handlers.is_some())
			.finish()
	}
}
