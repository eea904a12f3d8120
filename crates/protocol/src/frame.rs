//! Command buffer framing.
//!
//! A frame is a 4-byte little-endian length followed by exactly that many bytes
//! of JSON. The same framing is used for requests and replies.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Largest frame, prefix included, that a transport accepts.
pub const MAX_COMMAND_SIZE: usize = 64 * 1024;

const PREFIX_LEN: usize = 4;

/// Reasons a buffer is not a valid frame.
#[derive(Debug, Error)]
pub enum FrameError {
	#[error("frame of {size} bytes exceeds the {max} byte limit")]
	Oversized { size: usize, max: usize },

	#[error("frame of {0} bytes is shorter than its length prefix")]
	Truncated(usize),

	#[error("length prefix says {declared} bytes but {actual} follow")]
	LengthMismatch { declared: usize, actual: usize },

	#[error("malformed payload: {0}")]
	Payload(#[from] serde_json::Error),
}

/// Encodes `value` into a frame.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, FrameError> {
	let body = serde_json::to_vec(value)?;
	let size = body.len() + PREFIX_LEN;
	if size > MAX_COMMAND_SIZE {
		return Err(FrameError::Oversized {
			size,
			max: MAX_COMMAND_SIZE,
		});
	}

	let mut frame = Vec::with_capacity(size);
	frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
	frame.extend_from_slice(&body);
	Ok(frame)
}

/// Decodes a frame, checking the size limit and the length prefix first.
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, FrameError> {
	if frame.len() > MAX_COMMAND_SIZE {
		return Err(FrameError::Oversized {
			size: frame.len(),
			max: MAX_COMMAND_SIZE,
		});
	}
	if frame.len() < PREFIX_LEN {
		return Err(FrameError::Truncated(frame.len()));
	}

	let (prefix, body) = frame.split_at(PREFIX_LEN);
	let declared = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
	if declared != body.len() {
		return Err(FrameError::LengthMismatch {
			declared,
			actual: body.len(),
		});
	}

	Ok(serde_json::from_slice(body)?)
}
