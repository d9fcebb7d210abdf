//! CLI tool for Starpoint focuser control.
//!
//! Subcommands:
//! - `info`: Handshake and print the focuser state
//! - `move`: Move to an absolute position (clamped to the travel limits)
//! - `step`: Move inward or outward by a number of ticks
//! - `sync`: Declare the current position
//! - `halt`: Stop any motion
//! - `set-max`: Change the maximum travel
//! - `watch`: Poll position, motion and temperature

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use focuser::focuser_interface::{FocusDirection, FocuserInterface, MotionState};
use focuser::starpoint::{
    FocuserStatus, StarpointFocuser, TransportConfig, DEFAULT_BAUD_RATE, DEFAULT_POLL_PERIOD,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default serial device
const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Starpoint Focuser Control Tool
#[derive(Parser, Debug)]
#[command(name = "focuser_tool")]
#[command(about = "Control tool for the Starpoint serial focuser")]
#[command(version)]
struct Args {
    /// Serial port the focuser is attached to
    #[arg(long, global = true, default_value = DEFAULT_PORT)]
    port: String,

    /// Serial baud rate
    #[arg(long, global = true, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Reply timeout in milliseconds
    #[arg(long, global = true, default_value = "2000")]
    timeout_ms: u64,

    /// Delay between a query and reading its reply, in milliseconds
    #[arg(long, global = true, default_value = "200")]
    settle_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handshake and print the focuser state
    Info {
        /// Print the state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move to an absolute position
    Move {
        /// Target position in ticks
        position: u32,

        /// Wait for the move to finish
        #[arg(short, long)]
        wait: bool,

        /// Timeout in seconds when waiting
        #[arg(short, long, default_value = "60")]
        timeout: u64,
    },

    /// Move by a relative number of ticks
    Step {
        /// Number of ticks
        ticks: u32,

        /// Move inward instead of outward
        #[arg(short, long)]
        inward: bool,
    },

    /// Declare the current position
    Sync {
        /// Position in ticks
        position: u32,
    },

    /// Stop any motion in progress
    Halt,

    /// Change the maximum travel
    SetMax {
        /// Maximum position in ticks
        ticks: u32,
    },

    /// Poll and print the focuser state
    Watch {
        /// Polling period in milliseconds
        #[arg(short, long, default_value_t = DEFAULT_POLL_PERIOD.as_millis() as u64)]
        period_ms: u64,

        /// Number of polls (0 = until interrupted)
        #[arg(short, long, default_value = "0")]
        count: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = TransportConfig {
        timeout: Duration::from_millis(args.timeout_ms),
        settle_delay: Duration::from_millis(args.settle_ms),
        ..TransportConfig::default()
    };
    let focuser = StarpointFocuser::new(config);

    info!("Connecting to Starpoint focuser on {}...", args.port);
    focuser.transport().open(&args.port, args.baud)?;
    focuser.handshake()?;

    match args.command {
        Command::Info { json } => {
            let status = focuser.poll();
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
        Command::Move {
            position,
            wait,
            timeout,
        } => {
            if focuser.move_absolute(position) == MotionState::Alert {
                bail!("Move to {position} was rejected");
            }
            if wait {
                wait_until_stopped(&focuser, Duration::from_secs(timeout))?;
            }
        }
        Command::Step { ticks, inward } => {
            let direction = if inward {
                FocusDirection::Inward
            } else {
                FocusDirection::Outward
            };
            if focuser.move_relative(direction, ticks) == MotionState::Alert {
                bail!("Relative move {direction} by {ticks} was rejected");
            }
        }
        Command::Sync { position } => {
            focuser.sync(position)?;
            info!("Position synced to {}", position);
        }
        Command::Halt => {
            focuser.abort()?;
            info!("Focuser halted");
        }
        Command::SetMax { ticks } => {
            focuser.set_max_position(ticks)?;
            info!("Maximum position set to {}", ticks);
        }
        Command::Watch { period_ms, count } => {
            let period = Duration::from_millis(period_ms);
            let mut polls = 0;
            while count == 0 || polls < count {
                print_status(&focuser.poll());
                polls += 1;
                thread::sleep(period);
            }
        }
    }

    Ok(())
}

fn print_status(status: &FocuserStatus) {
    info!(
        "pos={} range=[{}, {}] moving={} abs={} rel={} temp={:.2}°C fw={} sn={}",
        status.position,
        status.min_position,
        status.max_position,
        status.moving,
        status.absolute_state,
        status.relative_state,
        status.temperature,
        status.firmware_version,
        status.serial_number,
    );
}

fn wait_until_stopped(focuser: &StarpointFocuser, timeout: Duration) -> Result<()> {
    let start = Instant::now();
    loop {
        let status = focuser.poll();
        if !status.moving {
            info!("Move complete at {}", status.position);
            return Ok(());
        }
        if start.elapsed() > timeout {
            bail!("Focuser still moving after {:?}", timeout);
        }
        thread::sleep(DEFAULT_POLL_PERIOD);
    }
}
