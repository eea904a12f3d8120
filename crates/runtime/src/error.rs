//! Error types for the nvif runtime.

use nvif_protocol::FrameError;
use thiserror::Error;

use crate::session::SessionState;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by session lifecycle operations and the client helper.
#[derive(Debug, Error)]
pub enum Error {
	/// Unknown transport name, or an unparsable config or debug string.
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// The shared resource root could not be constructed.
	#[error("Failed to create device at {address}: {reason}")]
	DeviceCreation { address: String, reason: String },

	/// The per-session client could not be constructed.
	#[error("Failed to create session '{name}': {reason}")]
	SessionCreation { name: String, reason: String },

	/// A command was rejected by the resource root.
	#[error(transparent)]
	Dispatch(#[from] DispatchError),

	/// The transport does not provide the requested capability.
	#[error("Transport '{driver}' does not support {capability}")]
	UnsupportedCapability {
		driver: &'static str,
		capability: &'static str,
	},

	/// The operation is not permitted from the session's current state.
	#[error("Cannot {op} a session that is {state}")]
	InvalidStateTransition {
		op: &'static str,
		state: SessionState,
	},

	/// A reply frame could not be decoded.
	#[error("Protocol error: {0}")]
	Protocol(#[from] FrameError),

	/// The reply did not match the operation that was sent.
	#[error("Unexpected reply to {0}")]
	UnexpectedReply(&'static str),
}

impl Error {
	/// Returns the dispatch error if this is one.
	pub fn dispatch_error(&self) -> Option<&DispatchError> {
		match self {
			Error::Dispatch(err) => Some(err),
			_ => None,
		}
	}

	/// Returns true if the error came from a session in the wrong state.
	pub fn is_invalid_state(&self) -> bool {
		matches!(self, Error::InvalidStateTransition { .. })
	}
}

/// Failure results of a dispatched command.
///
/// These are values, never panics: the interpreter leaves session and root
/// state untouched whenever it returns one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
	/// The target handle does not name a live object in this session.
	#[error("Bad object handle {0:#x}")]
	BadHandle(u32),

	/// The command needs an elevated caller or object.
	#[error("Permission denied: {0}")]
	PermissionDenied(String),

	/// The addressed sub-resource does not exist.
	#[error("Not found: {0}")]
	NotFound(String),

	/// The synthetic hardware did not respond.
	#[error("I/O failure: {0}")]
	IoFailure(String),

	/// The buffer or its arguments are malformed, oversized or out of range.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// Unknown class, method, operation or protocol revision.
	#[error("Unsupported: {0}")]
	Unsupported(String),
}

impl DispatchError {
	/// Negative errno equivalent, for callers that want a numeric result code.
	pub fn errno(&self) -> i32 {
		match self {
			DispatchError::BadHandle(_) => -9,
			DispatchError::PermissionDenied(_) => -13,
			DispatchError::NotFound(_) => -2,
			DispatchError::IoFailure(_) => -5,
			DispatchError::InvalidArgument(_) => -22,
			DispatchError::Unsupported(_) => -38,
		}
	}
}

impl From<FrameError> for DispatchError {
	fn from(err: FrameError) -> Self {
		DispatchError::InvalidArgument(err.to_string())
	}
}

impl From<serde_json::Error> for DispatchError {
	fn from(err: serde_json::Error) -> Self {
		DispatchError::InvalidArgument(format!("bad arguments: {err}"))
	}
}
