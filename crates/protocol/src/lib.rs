//! Wire types for the nvif command protocol.
//!
//! A session talks to the shared resource tree by handing opaque command
//! buffers to its transport. This crate defines what is inside those buffers:
//!
//! - [`ioctl`]: the request/reply envelope and the operations it carries
//! - [`frame`]: length-prefixed encoding of requests and replies
//! - [`class`]: object class identifiers, method numbers and their argument types
//!
//! Types here are pure data. Interpretation lives in `nvif-runtime`.

pub mod class;
pub mod frame;
pub mod ioctl;

pub use class::*;
pub use frame::{FrameError, MAX_COMMAND_SIZE, decode, encode};
pub use ioctl::*;
