//! Mutex-guarded serial transport for the Starpoint protocol.
//!
//! A [`Transport`] owns at most one attached serial link behind a single
//! [`Mutex`]. Every write and every read takes that lock, and a query holds it
//! from the write through the settling delay to the end of the reply, so two
//! callers (a status poll and a user-issued move, say) can never interleave
//! their bytes on the wire.
//!
//! Replies are read one byte at a time until the terminator, a length bound,
//! or a timeout. Bytes are decoded as Latin-1, so a reply always converts to a
//! `String` even when the firmware emits stray high bytes.
//!
//! # Example
//!
//! ```no_run
//! use focuser::starpoint::{Command, Transport, TransportConfig, DEFAULT_BAUD_RATE};
//!
//! let transport = Transport::new(TransportConfig::default());
//! transport.open("/dev/ttyUSB0", DEFAULT_BAUD_RATE)?;
//!
//! let reply = transport.query(&Command::Ping)?;
//! println!("Probe reply: {}", reply.trim());
//!
//! // Motion commands are not answered
//! transport.send_command(&Command::Halt)?;
//! # Ok::<(), focuser::starpoint::StarpointError>(())
//! ```

use std::io::{ErrorKind, Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, trace};

use super::command::{Command, TERMINATOR};

/// Baud rate the Starpoint firmware ships with.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default time to wait for a complete reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default bound on the length of a single reply.
pub const DEFAULT_MAX_LEN: usize = 512;

/// Pause between writing a query and reading its reply.
///
/// The firmware needs time to start answering; reading immediately tends to
/// time out on the first byte.
pub const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Errors that can occur while talking to a Starpoint focuser.
#[derive(Error, Debug)]
pub enum StarpointError {
    /// No serial link is attached.
    #[error("Focuser is not connected")]
    NotConnected,

    /// Low-level I/O error (write or read failure on the link).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to open the serial port.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// No complete reply received within the timeout period.
    #[error("Timeout waiting for response")]
    Timeout,

    /// The probe reply did not identify a Starpoint focuser.
    #[error("Device is not a Starpoint focuser (probe reply {reply:?})")]
    NotStarpoint {
        /// Trimmed probe reply
        reply: String,
    },

    /// Reply does not have the expected shape.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// A reply field is not a valid number.
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for Starpoint operations.
pub type StarpointResult<T> = Result<T, StarpointError>;

/// A byte stream a [`Transport`] can drive.
///
/// Implemented for every `Read + Write + Send` type, including the boxed
/// ports returned by [`serialport`].
pub trait SerialLink: Read + Write + Send {}

impl<T: Read + Write + Send> SerialLink for T {}

/// Bounds for reading one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Byte that ends a reply
    pub terminator: u8,
    /// Overall time allowed for the reply
    pub timeout: Duration,
    /// Maximum number of bytes kept; longer replies are cut silently
    pub max_len: usize,
}

/// Transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub terminator: u8,
    pub timeout: Duration,
    pub max_len: usize,
    pub settle_delay: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            terminator: TERMINATOR as u8,
            timeout: DEFAULT_TIMEOUT,
            max_len: DEFAULT_MAX_LEN,
            settle_delay: SETTLE_DELAY,
        }
    }
}

impl TransportConfig {
    /// Read bounds used by [`Transport::query`].
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            terminator: self.terminator,
            timeout: self.timeout,
            max_len: self.max_len,
        }
    }
}

type BoxedLink = Box<dyn SerialLink>;

/// Serial transport shared by every command issued to one focuser.
pub struct Transport {
    link: Mutex<Option<BoxedLink>>,
    config: TransportConfig,
}

impl Transport {
    /// Create a transport with no link attached.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            link: Mutex::new(None),
            config,
        }
    }

    /// Open a serial port and attach it, replacing any previous link.
    ///
    /// The port read timeout is set to the configured reply timeout, which
    /// bounds how far a single blocked read can run past a reply deadline.
    pub fn open(&self, path: &str, baud_rate: u32) -> StarpointResult<()> {
        let port = serialport::new(path, baud_rate)
            .timeout(self.config.timeout)
            .open()?;
        info!("Opened {} at {} baud", path, baud_rate);
        self.attach(port);
        Ok(())
    }

    /// Attach an already-open link, replacing any previous one.
    pub fn attach<L: SerialLink + 'static>(&self, link: L) {
        *self.lock().link = Some(Box::new(link));
    }

    /// Detach the link, returning it if one was attached.
    pub fn detach(&self) -> Option<Box<dyn SerialLink>> {
        self.lock().link.take()
    }

    /// Whether a link is attached.
    pub fn is_connected(&self) -> bool {
        self.lock().link.is_some()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Take exclusive access to the link until the guard is dropped.
    ///
    /// A panic while the lock was held leaves the link usable, so poisoning
    /// is ignored.
    pub fn lock(&self) -> LinkGuard<'_> {
        LinkGuard {
            link: self.link.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Write a raw string under the lock.
    pub fn write_raw(&self, buf: &str) -> StarpointResult<()> {
        self.lock().write_raw(buf)
    }

    /// Read one reply under the lock.
    pub fn read_until(&self, options: ReadOptions) -> StarpointResult<String> {
        self.lock().read_until(options)
    }

    /// Send a command that has no reply.
    ///
    /// Success means the frame was written, not that the focuser acted on it.
    pub fn send_command(&self, command: &Command) -> StarpointResult<()> {
        self.write_raw(&command.frame())
    }

    /// Send a command and return its raw, untrimmed reply.
    pub fn query(&self, command: &Command) -> StarpointResult<String> {
        self.query_with(command, self.config.read_options())
    }

    /// Like [`query`](Self::query) with explicit read bounds.
    pub fn query_with(&self, command: &Command, options: ReadOptions) -> StarpointResult<String> {
        let mut link = self.lock();
        link.write_raw(&command.frame())?;
        if !self.config.settle_delay.is_zero() {
            thread::sleep(self.config.settle_delay);
        }
        link.read_until(options)
    }
}

/// Exclusive access to the link of a [`Transport`].
///
/// Holding a guard across a write and the matching read makes the round trip
/// atomic with respect to every other caller.
pub struct LinkGuard<'a> {
    link: MutexGuard<'a, Option<BoxedLink>>,
}

impl LinkGuard<'_> {
    fn link(&mut self) -> StarpointResult<&mut BoxedLink> {
        self.link.as_mut().ok_or(StarpointError::NotConnected)
    }

    /// Write the whole buffer and flush.
    pub fn write_raw(&mut self, buf: &str) -> StarpointResult<()> {
        let link = self.link()?;
        trace!("Starpoint send: {:?}", buf);
        link.write_all(buf.as_bytes()).and_then(|()| link.flush()).map_err(|e| {
            debug!("Failed to send {:?}: {}", buf, e);
            StarpointError::Io(e)
        })
    }

    /// Read until the terminator, `max_len` bytes, or the timeout.
    ///
    /// The terminator is included in the returned text. When `max_len` bytes
    /// arrive without a terminator the reply is returned as-is.
    ///
    /// The deadline is checked between single-byte reads, so a link that
    /// blocks inside `read` can overrun `options.timeout` by up to its own
    /// read timeout (for ports from [`Transport::open`], the configured reply
    /// timeout).
    ///
    /// Input is not flushed before reading. Bytes of a reply that arrived
    /// after an earlier timeout are returned as the start of the next reply.
    pub fn read_until(&mut self, options: ReadOptions) -> StarpointResult<String> {
        let link = self.link()?;
        let deadline = Instant::now() + options.timeout;
        let mut bytes = Vec::with_capacity(options.max_len);
        let mut byte = [0u8; 1];

        while bytes.len() < options.max_len {
            if Instant::now() >= deadline {
                return Err(StarpointError::Timeout);
            }

            match link.read(&mut byte) {
                Ok(0) => return Err(StarpointError::Timeout),
                Ok(_) => {
                    bytes.push(byte[0]);
                    if byte[0] == options.terminator {
                        break;
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Err(StarpointError::Timeout);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Failed to read reply: {}", e);
                    return Err(e.into());
                }
            }
        }

        // Latin-1: each byte maps directly to the Unicode code point of the same value
        let response: String = bytes.iter().map(|&b| b as char).collect();
        trace!("Starpoint recv: {:?}", response);
        Ok(response)
    }
}
