//! Mock keypad link for testing and development.
//!
//! [`MockLink`] stands in for the serial port: keypresses are injected
//! through a [`MockLinkHandle`], every host frame is recorded, and
//! acknowledgments are generated automatically (or withheld, to exercise
//! timeout paths).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use latchkey_core::constants::{DOOR_ACK_LENGTH, LED_ACK_LENGTH};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{HardwareError, Result};
use crate::link::Link;
use crate::types::{HostCommand, LedChannel};

const ACK_BYTE: u8 = b'k';

#[derive(Debug)]
struct MockState {
    frames: Vec<Vec<u8>>,
    pending_ack: VecDeque<u8>,
    acks_enabled: bool,
    ack_len_override: Option<usize>,
    flushes: usize,
    input_closed: bool,
    disconnected: bool,
}

/// Mock keypad link.
///
/// # Examples
///
/// ```
/// use latchkey_hardware::Link;
/// use latchkey_hardware::mock::MockLink;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> latchkey_hardware::Result<()> {
///     let (mut link, handle) = MockLink::new();
///
///     handle.press(b"12")?;
///
///     assert_eq!(link.read_byte(Duration::from_millis(10)).await?, Some(b'1'));
///     assert_eq!(link.read_byte(Duration::from_millis(10)).await?, Some(b'2'));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockLink {
    input_rx: mpsc::UnboundedReceiver<u8>,
    state: Arc<Mutex<MockState>>,
}

impl MockLink {
    /// Create a mock link and the handle that drives it.
    pub fn new() -> (Self, MockLinkHandle) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(MockState {
            frames: Vec::new(),
            pending_ack: VecDeque::new(),
            acks_enabled: true,
            ack_len_override: None,
            flushes: 0,
            input_closed: false,
            disconnected: false,
        }));

        let link = Self {
            input_rx,
            state: Arc::clone(&state),
        };
        let handle = MockLinkHandle { input_tx, state };

        (link, handle)
    }
}

impl Link for MockLink {
    async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(HardwareError::disconnected("mock link"));
        }
        state.frames.push(frame.to_vec());

        if state.acks_enabled {
            let expected = match HostCommand::decode(frame) {
                Some(HostCommand::Door) => DOOR_ACK_LENGTH,
                _ => LED_ACK_LENGTH,
            };
            let len = state.ack_len_override.unwrap_or(expected);
            state.pending_ack.extend(std::iter::repeat_n(ACK_BYTE, len));
        }
        Ok(())
    }

    async fn read_ack(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>> {
        let taken: Vec<u8> = {
            let mut state = self.state.lock();
            let n = len.min(state.pending_ack.len());
            state.pending_ack.drain(..n).collect()
        };

        if taken.len() == len {
            return Ok(taken);
        }

        // A real device would keep us waiting for the full window.
        tokio::time::sleep(timeout).await;
        if taken.is_empty() {
            Err(HardwareError::timeout(timeout.as_millis() as u64))
        } else {
            Err(HardwareError::short_read(len, taken.len()))
        }
    }

    async fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        if let Ok(byte) = self.input_rx.try_recv() {
            return Ok(Some(byte));
        }
        {
            let state = self.state.lock();
            if state.disconnected || state.input_closed {
                return Err(HardwareError::disconnected("mock link"));
            }
        }

        match tokio::time::timeout(timeout, self.input_rx.recv()).await {
            Ok(Some(byte)) => Ok(Some(byte)),
            Ok(None) => Err(HardwareError::disconnected("mock link")),
            Err(_) => Ok(None),
        }
    }

    async fn discard_input(&mut self) -> Result<()> {
        while self.input_rx.try_recv().is_ok() {}
        self.state.lock().flushes += 1;
        Ok(())
    }
}

/// Handle for driving a [`MockLink`] and inspecting what the host sent.
#[derive(Debug, Clone)]
pub struct MockLinkHandle {
    input_tx: mpsc::UnboundedSender<u8>,
    state: Arc<Mutex<MockState>>,
}

impl MockLinkHandle {
    /// Queue keypresses, one byte each.
    ///
    /// # Errors
    ///
    /// Returns an error if the link has been dropped.
    pub fn press(&self, keys: &[u8]) -> Result<()> {
        for &key in keys {
            self.input_tx
                .send(key)
                .map_err(|_| HardwareError::disconnected("mock link dropped"))?;
        }
        Ok(())
    }

    /// Make reads fail once the queued input is drained, and fail every
    /// write from now on.
    pub fn disconnect(&self) {
        self.state.lock().disconnected = true;
    }

    /// Make reads fail once the queued input is drained. Writes keep
    /// working, so a run loop can finish processing what was queued.
    pub fn close_input(&self) {
        self.state.lock().input_closed = true;
    }

    /// Enable or disable automatic acknowledgments.
    pub fn set_acks(&self, enabled: bool) {
        self.state.lock().acks_enabled = enabled;
    }

    /// Force every acknowledgment to a fixed length.
    pub fn set_ack_len_override(&self, len: Option<usize>) {
        self.state.lock().ack_len_override = len;
    }

    /// Raw frames written by the host, in order.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().frames.clone()
    }

    /// Decoded host commands, in order. Undecodable frames are skipped.
    pub fn commands(&self) -> Vec<HostCommand> {
        self.state
            .lock()
            .frames
            .iter()
            .filter_map(|f| HostCommand::decode(f))
            .collect()
    }

    /// LED transitions for one channel, in order.
    pub fn led_history(&self, channel: LedChannel) -> Vec<bool> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                HostCommand::Led { channel: ch, on } if ch == channel => Some(on),
                _ => None,
            })
            .collect()
    }

    /// Number of door-open commands sent.
    pub fn door_pulses(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, HostCommand::Door))
            .count()
    }

    /// Number of input flushes requested.
    pub fn flushes(&self) -> usize {
        self.state.lock().flushes
    }

    /// Acknowledgment bytes generated but not yet read by the host.
    pub fn pending_ack_bytes(&self) -> usize {
        self.state.lock().pending_ack.len()
    }
}
