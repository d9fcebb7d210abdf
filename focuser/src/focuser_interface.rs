//! Focuser interface trait for host frameworks.

use serde::Serialize;
use strum::Display;

/// Direction of a relative focus move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum FocusDirection {
    /// Toward the telescope (shorter draw tube).
    Inward,
    /// Away from the telescope.
    Outward,
}

/// State of a published motion indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum MotionState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Last request completed.
    Ok,
    /// A move is in progress.
    Busy,
    /// The last request failed.
    Alert,
}

/// Interface a host framework calls into for focuser control
///
/// Abstracts the focuser hardware so the host depends only on these
/// operations, and so control loops can be exercised against a mock.
pub trait FocuserInterface {
    /// Snapshot published by the host after each operation
    type Status;
    /// Error returned by fallible operations
    type Error: std::error::Error;

    /// Confirm device identity and seed initial state
    fn handshake(&self) -> Result<(), Self::Error>;

    /// Refresh position, motion and temperature (one polling tick)
    fn poll(&self) -> Self::Status;

    /// Start an absolute move; returns [`MotionState::Busy`] or [`MotionState::Alert`]
    fn move_absolute(&self, target_ticks: u32) -> MotionState;

    /// Start a relative move; returns [`MotionState::Busy`] or [`MotionState::Alert`]
    fn move_relative(&self, direction: FocusDirection, ticks: u32) -> MotionState;

    /// Declare the current position to be `ticks`
    fn sync(&self, ticks: u32) -> Result<(), Self::Error>;

    /// Stop any motion in progress
    fn abort(&self) -> Result<(), Self::Error>;

    /// Change the maximum travel
    fn set_max_position(&self, ticks: u32) -> Result<(), Self::Error>;
}
