//! Starpoint focuser driver.
//!
//! [`StarpointFocuser`] pairs a [`Transport`] with the state a host publishes
//! (position, travel limits, motion indicators, temperature, identity). The
//! hardware operations each issue one [`Command`] and decode its reply. The
//! [`FocuserInterface`] implementation layers the host-facing behaviour on
//! top: state updates, busy/alert indicators, and logging.
//!
//! The driver is `Sync`. Share it through an `Arc` between a polling thread
//! and whatever issues user requests; the transport lock keeps their commands
//! apart on the wire.
//!
//! # Example
//!
//! ```no_run
//! use focuser::focuser_interface::{FocuserInterface, MotionState};
//! use focuser::starpoint::{StarpointFocuser, TransportConfig, DEFAULT_BAUD_RATE};
//!
//! let focuser = StarpointFocuser::new(TransportConfig::default());
//! focuser.transport().open("/dev/ttyUSB0", DEFAULT_BAUD_RATE)?;
//! focuser.handshake()?;
//!
//! if focuser.move_absolute(12_000) == MotionState::Busy {
//!     let status = focuser.poll();
//!     println!("Position {} moving={}", status.position, status.moving);
//! }
//! # Ok::<(), focuser::starpoint::StarpointError>(())
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::command::Command;
use super::setup::SetupRecord;
use super::text::{to_double, to_u32, trim};
use super::transport::{StarpointError, StarpointResult, Transport, TransportConfig};
use super::{DEFAULT_MAX_POSITION, DEFAULT_NAME, PROBE_REPLY};
use crate::focuser_interface::{FocusDirection, FocuserInterface, MotionState};

/// Everything the host publishes about the focuser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocuserStatus {
    pub position: u32,
    pub min_position: u32,
    pub max_position: u32,
    pub moving: bool,
    /// Indicator for absolute moves
    pub absolute_state: MotionState,
    /// Indicator for relative moves
    pub relative_state: MotionState,
    /// Probe temperature in °C
    pub temperature: f64,
    pub firmware_version: String,
    pub serial_number: String,
}

impl Default for FocuserStatus {
    fn default() -> Self {
        Self {
            position: 0,
            min_position: 0,
            max_position: DEFAULT_MAX_POSITION,
            moving: false,
            absolute_state: MotionState::Idle,
            relative_state: MotionState::Idle,
            temperature: 0.0,
            firmware_version: String::new(),
            serial_number: String::new(),
        }
    }
}

/// Driver for one Starpoint focuser.
pub struct StarpointFocuser {
    transport: Transport,
    status: Mutex<FocuserStatus>,
}

impl StarpointFocuser {
    /// Create a driver with no link attached.
    pub fn new(config: TransportConfig) -> Self {
        Self::with_transport(Transport::new(config))
    }

    pub fn with_transport(transport: Transport) -> Self {
        Self {
            transport,
            status: Mutex::new(FocuserStatus::default()),
        }
    }

    /// The transport, for attaching and detaching the serial link.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Copy of the current published state.
    pub fn status(&self) -> FocuserStatus {
        self.state().clone()
    }

    fn state(&self) -> MutexGuard<'_, FocuserStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn query_trimmed(&self, command: Command) -> StarpointResult<String> {
        let mut reply = self.transport.query(&command)?;
        trim(&mut reply);
        Ok(reply)
    }

    // ==================== Hardware Operations ====================

    /// Confirm the device answers `PING` with the Starpoint token.
    pub fn probe(&self) -> StarpointResult<()> {
        debug!("Checking if device is a Starpoint focuser");
        let reply = self.query_trimmed(Command::Ping)?;
        if reply == PROBE_REPLY {
            Ok(())
        } else {
            Err(StarpointError::NotStarpoint { reply })
        }
    }

    pub fn read_serial_number(&self) -> StarpointResult<String> {
        let serial = self.query_trimmed(Command::SerialNumber)?;
        debug!("Device serial number: {}", serial);
        Ok(serial)
    }

    /// Current position in ticks.
    pub fn read_position(&self) -> StarpointResult<u32> {
        let reply = self.query_trimmed(Command::GetPosition)?;
        let position = to_u32(&reply, 10)
            .ok_or_else(|| StarpointError::ParseError(format!("Invalid position: {reply:?}")))?;
        debug!("Position: {}", position);
        Ok(position)
    }

    /// Motion flag.
    ///
    /// A reply of exactly `0` is reported as moving and anything else, even
    /// an unparseable reply, as stopped.
    pub fn read_moving(&self) -> StarpointResult<bool> {
        let reply = self.query_trimmed(Command::Moving)?;
        let moving = reply == "0";
        debug!("Moving: {}", moving);
        Ok(moving)
    }

    /// Probe temperature in °C.
    pub fn read_temperature(&self) -> StarpointResult<f64> {
        let reply = self.query_trimmed(Command::Temperature)?;
        let temperature = to_double(&reply)
            .ok_or_else(|| StarpointError::ParseError(format!("Invalid temperature: {reply:?}")))?;
        debug!("Temperature: {:.2}", temperature);
        Ok(temperature)
    }

    /// Request and parse the setup record.
    pub fn read_setup(&self) -> StarpointResult<SetupRecord> {
        let reply = self.query_trimmed(Command::StartSetup)?;
        SetupRecord::parse(&reply)
    }

    /// Send an absolute move, clamped into the current travel limits.
    ///
    /// Returns the target actually sent.
    pub fn send_move_absolute(&self, target: u32) -> StarpointResult<u32> {
        let (min, max) = {
            let state = self.state();
            (state.min_position, state.max_position)
        };
        // Not `clamp`: inverted limits must not panic, the minimum wins
        let ticks = target.min(max).max(min);
        self.transport.send_command(&Command::MoveAbsolute(ticks))?;
        debug!("Moving focuser to position {}", ticks);
        Ok(ticks)
    }

    /// Send a relative move. The device applies its own limits.
    pub fn send_move_relative(&self, direction: FocusDirection, ticks: u32) -> StarpointResult<()> {
        self.transport.send_command(&Command::MoveRelative { direction, ticks })?;
        debug!("Moving focuser {} by {}", direction, ticks);
        Ok(())
    }

    /// Overwrite the device position register.
    pub fn send_sync(&self, ticks: u32) -> StarpointResult<()> {
        self.transport.send_command(&Command::Sync(ticks))
    }

    pub fn send_halt(&self) -> StarpointResult<()> {
        self.transport.send_command(&Command::Halt)
    }

    /// Set the device-side maximum travel.
    pub fn send_max_position(&self, ticks: u32) -> StarpointResult<()> {
        self.transport.send_command(&Command::SetMaxPosition(ticks))?;
        debug!("Max position set to {}", ticks);
        Ok(())
    }
}

impl FocuserInterface for StarpointFocuser {
    type Status = FocuserStatus;
    type Error = StarpointError;

    fn handshake(&self) -> StarpointResult<()> {
        if let Err(e) = self.probe() {
            info!("No response, or device is not a Starpoint focuser: {}", e);
            return Err(e);
        }

        let setup = self.read_setup().inspect_err(|e| {
            error!("Unable to obtain focuser setup: {}", e);
        })?;

        {
            let mut state = self.state();
            state.firmware_version = setup.firmware_version.clone();
            state.temperature = setup.temperature;
            state.position = setup.position;
            state.max_position = setup.max_position;
            state.min_position = setup.min_position;
        }

        match self.read_serial_number() {
            Ok(serial) => self.state().serial_number = serial,
            Err(e) => warn!("Unable to read device serial number: {}", e),
        }

        info!(
            "Connected to {} (firmware {}, range {}-{})",
            DEFAULT_NAME, setup.firmware_version, setup.min_position, setup.max_position
        );
        Ok(())
    }

    fn poll(&self) -> FocuserStatus {
        if !self.transport.is_connected() {
            return self.status();
        }

        match self.read_position() {
            Ok(position) => self.state().position = position,
            Err(e) => warn!("Unable to read position: {}", e),
        }

        match self.read_moving() {
            Ok(moving) => {
                let indicator = if moving {
                    MotionState::Busy
                } else {
                    MotionState::Ok
                };
                let mut state = self.state();
                state.moving = moving;
                state.absolute_state = indicator;
                state.relative_state = indicator;
            }
            Err(e) => warn!("Unable to check if the focuser is moving: {}", e),
        }

        // An unreadable temperature keeps the last good value
        match self.read_temperature() {
            Ok(temperature) => self.state().temperature = temperature,
            Err(e) => warn!("Unable to read temperature: {}", e),
        }

        self.status()
    }

    fn move_absolute(&self, target_ticks: u32) -> MotionState {
        let indicator = match self.send_move_absolute(target_ticks) {
            Ok(_) => MotionState::Busy,
            Err(e) => {
                error!("Unable to move focuser: {}", e);
                MotionState::Alert
            }
        };
        self.state().absolute_state = indicator;
        indicator
    }

    fn move_relative(&self, direction: FocusDirection, ticks: u32) -> MotionState {
        let indicator = match self.send_move_relative(direction, ticks) {
            Ok(()) => MotionState::Busy,
            Err(e) => {
                error!("Unable to move focuser: {}", e);
                MotionState::Alert
            }
        };
        self.state().relative_state = indicator;
        indicator
    }

    fn sync(&self, ticks: u32) -> StarpointResult<()> {
        self.state().absolute_state = MotionState::Busy;
        self.send_sync(ticks).inspect_err(|e| {
            error!("Unable to sync focuser position: {}", e);
        })?;
        self.state().position = ticks;
        Ok(())
    }

    fn abort(&self) -> StarpointResult<()> {
        self.send_halt().inspect_err(|e| {
            error!("Unable to halt focuser movement: {}", e);
        })
    }

    fn set_max_position(&self, ticks: u32) -> StarpointResult<()> {
        self.state().absolute_state = MotionState::Busy;
        let result = self.send_max_position(ticks);
        if let Err(e) = &result {
            error!("Unable to set max position: {}", e);
        }

        // Mirrored locally whether or not the device took it
        let mut state = self.state();
        state.max_position = ticks;
        state.absolute_state = MotionState::Ok;
        result
    }
}
