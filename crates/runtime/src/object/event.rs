//! Notifier slots of event-raising objects.

use parking_lot::Mutex;

use crate::error::DispatchError;

/// Slots one object can hand out.
pub const MAX_NOTIFIERS: usize = 8;

#[derive(Debug, Clone, Copy)]
struct Slot {
	event: u32,
	armed: bool,
	/// Armed state to restore once a suspend is over.
	resume_armed: bool,
}

/// Fixed table of notifier slots for one object.
///
/// A slot is allocated for a single event type (`ntfy_new`), armed with
/// `ntfy_get`, disarmed with `ntfy_put` and released with `ntfy_del`. Only
/// armed slots see events.
#[derive(Debug)]
pub struct EventSource {
	supported: &'static [u32],
	slots: Mutex<[Option<Slot>; MAX_NOTIFIERS]>,
}

impl EventSource {
	pub fn new(supported: &'static [u32]) -> Self {
		Self {
			supported,
			slots: Mutex::new([None; MAX_NOTIFIERS]),
		}
	}

	pub fn alloc(&self, event: u32) -> Result<u8, DispatchError> {
		if !self.supported.contains(&event) {
			return Err(DispatchError::Unsupported(format!("event {event:#x}")));
		}
		let mut slots = self.slots.lock();
		let index = slots
			.iter()
			.position(Option::is_none)
			.ok_or_else(|| DispatchError::InvalidArgument("no free notifier slots".into()))?;
		slots[index] = Some(Slot {
			event,
			armed: false,
			resume_armed: false,
		});
		Ok(index as u8)
	}

	pub fn free(&self, index: u8) -> Result<(), DispatchError> {
		let mut slots = self.slots.lock();
		let slot = Self::slot_mut(&mut slots, index)?;
		*slot = None;
		Ok(())
	}

	pub fn arm(&self, index: u8, armed: bool) -> Result<(), DispatchError> {
		let mut slots = self.slots.lock();
		let slot = Self::slot_mut(&mut slots, index)?;
		if let Some(slot) = slot {
			slot.armed = armed;
		}
		Ok(())
	}

	/// Indices of armed slots listening for `event`.
	pub fn armed(&self, event: u32) -> Vec<u8> {
		self.slots
			.lock()
			.iter()
			.enumerate()
			.filter_map(|(index, slot)| match slot {
				Some(slot) if slot.armed && slot.event == event => Some(index as u8),
				_ => None,
			})
			.collect()
	}

	/// Disarms everything, remembering what to re-arm on [`EventSource::resume`].
	pub fn suspend(&self) {
		for slot in self.slots.lock().iter_mut().flatten() {
			slot.resume_armed = slot.armed;
			slot.armed = false;
		}
	}

	pub fn resume(&self) {
		for slot in self.slots.lock().iter_mut().flatten() {
			slot.armed = slot.resume_armed;
		}
	}

	/// Releases every slot.
	pub fn clear(&self) {
		*self.slots.lock() = [None; MAX_NOTIFIERS];
	}

	fn slot_mut(slots: &mut [Option<Slot>; MAX_NOTIFIERS], index: u8) -> Result<&mut Option<Slot>, DispatchError> {
		match slots.get_mut(index as usize) {
			Some(slot) if slot.is_some() => Ok(slot),
			_ => Err(DispatchError::NotFound(format!("notifier slot {index}"))),
		}
	}
}
