//! Starpoint focuser driver.
//!
//! The Starpoint is a stepper focuser on a USB serial line speaking a small
//! `#`-terminated ASCII protocol. See [`command`] for the wire format,
//! [`transport`] for the locking discipline, and [`StarpointFocuser`] for the
//! driver a host talks to.

pub mod command;
mod device;
#[cfg(test)]
mod mock;
pub mod setup;
pub mod text;
pub mod transport;

use std::time::Duration;

pub use command::{Command, TERMINATOR};
pub use device::{FocuserStatus, StarpointFocuser};
pub use setup::SetupRecord;
pub use transport::{
    LinkGuard, ReadOptions, SerialLink, StarpointError, StarpointResult, Transport,
    TransportConfig, DEFAULT_BAUD_RATE,
};

/// Name the focuser is published under.
pub const DEFAULT_NAME: &str = "Starpoint Focuser";

/// Reply to `PING#` that identifies a Starpoint focuser.
pub const PROBE_REPLY: &str = "FOUND1982";

/// Interval between status polls.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(1000);

/// Maximum travel assumed until the handshake reports the real one.
pub const DEFAULT_MAX_POSITION: u32 = 100_000;
