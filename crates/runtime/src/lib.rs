//! nvif runtime - sessions, resource root and the in-process transport
//!
//! This crate turns opaque command buffers into operations on a shared,
//! reference-counted resource root:
//!
//! - **Transports**: the [`Driver`] contract and a by-name registry
//! - **Session manager**: builds the root for the first session, tears it
//!   down after the last
//! - **Sessions**: `Active`/`Suspended`/`Finalized` lifecycle with exactly-once
//!   teardown
//! - **Dispatcher**: decodes commands, runs them against the session's object
//!   tree, encodes replies
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  nv-i2c etc. │  Clients (Channel or raw buffers)
//! └──────┬───────┘
//!        │ Driver trait
//! ┌──────▼───────┐
//! │ nvif-runtime │  This crate
//! │  ┌────────┐  │
//! │  │ Null   │  │  In-process transport
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Manager│  │  Session count + root ownership
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Ioctl  │  │  Command interpreter over the object tree
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Root   │  │  Device, I2C ports, live object accounting
//! │  └────────┘  │
//! └──────────────┘
//! ```
//!
//! Sessions reference the root weakly; only the manager owns it. A session
//! that outlives its manager's root simply finds it gone.

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod ioctl;
pub mod manager;
pub mod notify;
pub mod null;
pub mod object;
pub mod root;
pub mod session;

pub use channel::Channel;
pub use config::{Config, DebugConfig, DebugLevel};
pub use driver::{Driver, DriverRegistry, drivers, find_driver};
pub use error::{DispatchError, Error, Result};
pub use ioctl::{Dispatched, Mapping, PendingHandle};
pub use manager::{ManagerStats, SessionManager};
pub use notify::{NotifyEvent, Notifier, Subscription};
pub use null::{NULL_DRIVER, NullDriver};
pub use root::{BusAddress, NULL_BUS_ADDRESS, ResourceRoot, RootConfig, RootDump, Subsystems};
pub use session::{Session, SessionRequest, SessionState};
