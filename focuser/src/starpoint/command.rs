//! Starpoint command framing.
//!
//! Every command is a short ASCII mnemonic, optionally followed by a decimal
//! argument, and terminated with `#`:
//!
//! ```text
//! PING#          -> FOUND1982#
//! GET#           -> 1234#
//! MOVEA5000#     (no reply)
//! MOVER14294967046#  (no reply, inward by 250)
//! STARTSETUP#    -> %-delimited setup record
//! ```
//!
//! Only queries are answered. Motion and configuration commands are
//! fire-and-forget; a successful send means the bytes left the host, not
//! that the focuser acted on them.

use std::fmt;

use crate::focuser_interface::FocusDirection;

/// Frame terminator for both commands and replies.
pub const TERMINATOR: char = '#';

/// A single Starpoint command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Identity probe, answered with [`PROBE_REPLY`](super::PROBE_REPLY).
    Ping,
    /// Query the device serial number.
    SerialNumber,
    /// Query the current position in ticks.
    GetPosition,
    /// Query the motion flag.
    Moving,
    /// Query the probe temperature.
    Temperature,
    /// Request the combined setup record.
    StartSetup,
    /// Move to an absolute position. Callers clamp before building this.
    MoveAbsolute(u32),
    /// Move by a number of ticks in a direction.
    MoveRelative {
        direction: FocusDirection,
        ticks: u32,
    },
    /// Overwrite the device position register.
    Sync(u32),
    /// Abort any motion in progress.
    Halt,
    /// Set the device-side maximum travel.
    SetMaxPosition(u32),
}

impl Command {
    /// Whether the focuser answers this command.
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            Self::Ping
                | Self::SerialNumber
                | Self::GetPosition
                | Self::Moving
                | Self::Temperature
                | Self::StartSetup
        )
    }

    /// Command mnemonic without arguments or terminator.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::SerialNumber => "GSNUM",
            Self::GetPosition => "GET",
            Self::Moving => "MOVING",
            Self::Temperature => "TEMP",
            Self::StartSetup => "STARTSETUP",
            Self::MoveAbsolute(_) => "MOVEA",
            Self::MoveRelative { .. } => "MOVER",
            Self::Sync(_) => "SYNC",
            Self::Halt => "HALT",
            Self::SetMaxPosition(_) => "SMAX",
        }
    }

    /// Render the complete wire frame, terminator included.
    pub fn frame(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())?;
        match *self {
            Self::MoveAbsolute(ticks) | Self::Sync(ticks) | Self::SetMaxPosition(ticks) => {
                write!(f, "{ticks}")?;
            }
            Self::MoveRelative { direction, ticks } => {
                // Inward moves carry a direction flag of 1 and the count negated
                // as a 32-bit unsigned value, which the firmware reads back as negative.
                let (flag, count) = match direction {
                    FocusDirection::Inward => (1, ticks.wrapping_neg()),
                    FocusDirection::Outward => (0, ticks),
                };
                write!(f, "{flag}{count}")?;
            }
            _ => {}
        }
        write!(f, "{TERMINATOR}")
    }
}
