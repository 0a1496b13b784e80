//! Byte-level transport to the keypad peripheral.
//!
//! [`Link`] is the seam between [`HardwareChannel`](crate::HardwareChannel)
//! and the physical connection. [`SerialLink`] drives a real serial port;
//! [`MockLink`](crate::mock::MockLink) replaces it in tests.
//!
//! Methods return `impl Future + Send` (Edition 2024 RPITIT) so generic
//! callers can still be spawned on the multi-threaded runtime.

use std::future::Future;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use latchkey_core::constants::{DEFAULT_ACK_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info, trace};

use crate::error::{HardwareError, Result};

/// Raw transport operations used by the hardware channel.
///
/// Implementations are not required to be internally synchronized; the
/// channel serializes every call behind its own lock.
pub trait Link: Send {
    /// Write one complete command frame.
    fn write_frame(&mut self, frame: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Read exactly `len` acknowledgment bytes.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if nothing arrived and `ShortRead` if fewer than
    /// `len` bytes arrived within `timeout`.
    fn read_ack(
        &mut self,
        len: usize,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Read one input byte, or `None` if nothing arrived within `timeout`.
    fn read_byte(&mut self, timeout: Duration) -> impl Future<Output = Result<Option<u8>>> + Send;

    /// Drop any input bytes that were received but not yet read.
    fn discard_input(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Serial link settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub port: String,

    /// Line speed in baud.
    pub baud_rate: u32,

    /// How long one command read waits for a keypress.
    pub read_timeout_ms: u64,

    /// How long a write waits for its acknowledgment.
    pub ack_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
        }
    }
}

impl SerialConfig {
    /// Command read timeout as a `Duration`.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Acknowledgment timeout as a `Duration`.
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

/// [`Link`] over a real serial port.
///
/// The `serialport` API is blocking, so every operation runs on Tokio's
/// blocking pool with the port moved in and handed back afterwards.
pub struct SerialLink {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SerialLink {
    /// Open the configured serial port.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the port cannot be opened.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| {
                HardwareError::initialization_failed(format!("{}: {}", config.port, e))
            })?;

        info!(port = %config.port, baud = config.baud_rate, "Serial link opened");

        Ok(Self {
            port: Some(port),
            name: config.port.clone(),
        })
    }

    /// Run a blocking port operation off the async executor.
    async fn with_port<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut dyn SerialPort) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut port = self
            .port
            .take()
            .ok_or_else(|| HardwareError::disconnected(self.name.clone()))?;

        let (port, result) = tokio::task::spawn_blocking(move || {
            let result = op(port.as_mut());
            (port, result)
        })
        .await
        .map_err(|e| HardwareError::communication(format!("serial worker failed: {e}")))?;

        self.port = Some(port);
        result
    }
}

impl Link for SerialLink {
    async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        trace!(frame = ?frame, "Writing frame");
        let frame = frame.to_vec();
        self.with_port(move |port| {
            port.write_all(&frame)?;
            port.flush()?;
            Ok(())
        })
        .await
    }

    async fn read_ack(&mut self, len: usize, timeout: Duration) -> Result<Vec<u8>> {
        self.with_port(move |port| {
            port.set_timeout(timeout)?;
            let mut buf = vec![0u8; len];
            let mut received = 0;
            while received < len {
                match port.read(&mut buf[received..]) {
                    Ok(0) => break,
                    Ok(n) => received += n,
                    Err(e) if e.kind() == ErrorKind::TimedOut => break,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            match received {
                n if n == len => Ok(buf),
                0 => Err(HardwareError::timeout(timeout.as_millis() as u64)),
                n => Err(HardwareError::short_read(len, n)),
            }
        })
        .await
    }

    async fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        self.with_port(move |port| {
            port.set_timeout(timeout)?;
            let mut buf = [0u8; 1];
            loop {
                match port.read(&mut buf) {
                    Ok(0) => return Ok(None),
                    Ok(_) => return Ok(Some(buf[0])),
                    Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
        })
        .await
    }

    async fn discard_input(&mut self) -> Result<()> {
        self.with_port(|port| {
            port.clear(ClearBuffer::Input)?;
            Ok(())
        })
        .await?;
        debug!(port = %self.name, "Discarded pending input");
        Ok(())
    }
}
