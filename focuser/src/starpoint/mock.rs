//! Scripted serial link for tests.
//!
//! Answers each complete `#`-terminated frame from a reply table and records
//! everything crossing the wire in order.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use super::command::TERMINATOR;

/// One observation on the mock wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// A complete frame written by the host
    Sent(String),
    /// A single byte read by the host
    Received(u8),
}

#[derive(Default)]
struct MockState {
    replies: HashMap<String, Vec<u8>>,
    pending: VecDeque<u8>,
    partial: String,
    transcript: Vec<WireEvent>,
    fail_writes: bool,
}

/// Cloneable handle; clones share the same wire.
#[derive(Clone, Default)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `frame` with `reply` every time it is written.
    pub fn reply(self, frame: &str, reply: &str) -> Self {
        self.set_reply(frame, reply);
        self
    }

    /// Make every write fail as if the port had been unplugged.
    pub fn failing_writes(self) -> Self {
        self.state.lock().unwrap().fail_writes = true;
        self
    }

    pub fn set_reply(&self, frame: &str, reply: &str) {
        self.state
            .lock()
            .unwrap()
            .replies
            .insert(frame.to_string(), reply.as_bytes().to_vec());
    }

    pub fn clear_reply(&self, frame: &str) {
        self.state.lock().unwrap().replies.remove(frame);
    }

    /// Queue bytes for reading without a triggering frame.
    pub fn push_pending(&self, text: &str) {
        self.push_pending_bytes(text.as_bytes());
    }

    pub fn push_pending_bytes(&self, bytes: &[u8]) {
        self.state.lock().unwrap().pending.extend(bytes);
    }

    /// Frames written so far.
    pub fn sent(&self) -> Vec<String> {
        self.transcript()
            .into_iter()
            .filter_map(|event| match event {
                WireEvent::Sent(frame) => Some(frame),
                WireEvent::Received(_) => None,
            })
            .collect()
    }

    pub fn transcript(&self) -> Vec<WireEvent> {
        self.state.lock().unwrap().transcript.clone()
    }
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock link closed"));
        }

        for &byte in buf {
            state.partial.push(byte as char);
            if byte == TERMINATOR as u8 {
                let frame = std::mem::take(&mut state.partial);
                if let Some(reply) = state.replies.get(&frame).cloned() {
                    state.pending.extend(reply);
                }
                state.transcript.push(WireEvent::Sent(frame));
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut state = self.state.lock().unwrap();
        match state.pending.pop_front() {
            Some(byte) => {
                buf[0] = byte;
                state.transcript.push(WireEvent::Received(byte));
                Ok(1)
            }
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "no data")),
        }
    }
}
