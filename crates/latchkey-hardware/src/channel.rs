//! Exclusive-access wrapper around the keypad link.
//!
//! The peripheral multiplexes keypresses, LED control and the door strike
//! over one link. [`HardwareChannel`] owns that link behind a single async
//! mutex, so a command read and an LED write can never interleave on the
//! wire. The raw link is never handed out.
//!
//! ```text
//! AccessEngine ─┐
//!               ├─► HardwareChannel ──(Mutex<L: Link>)──► keypad peripheral
//! watchdog ─────┘        set_led / pulse_door / read_command / flush_input
//! ```

use std::time::Duration;

use latchkey_core::constants::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS, DOOR_ACK_LENGTH, LED_ACK_LENGTH,
};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::Result;
use crate::link::{Link, SerialConfig};
use crate::types::{DOOR_FRAME, DoorPulse, KeypadInput, LedChannel, led_frame};

/// Timing for channel transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// How long `read_command` waits before reporting no input.
    pub read_timeout: Duration,

    /// How long a write waits for its acknowledgment.
    pub ack_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            ack_timeout: Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS),
        }
    }
}

impl From<&SerialConfig> for ChannelConfig {
    fn from(config: &SerialConfig) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            ack_timeout: config.ack_timeout(),
        }
    }
}

/// Serialized access to the keypad peripheral.
///
/// Every operation holds the channel lock for its full round trip
/// (write + acknowledgment, or one bounded read).
///
/// # Examples
///
/// ```
/// use latchkey_hardware::{ChannelConfig, HardwareChannel, LedChannel};
/// use latchkey_hardware::mock::MockLink;
///
/// #[tokio::main]
/// async fn main() -> latchkey_hardware::Result<()> {
///     let (link, handle) = MockLink::new();
///     let channel = HardwareChannel::new(link, ChannelConfig::default());
///
///     channel.set_led(LedChannel::Granted, true).await?;
///     channel.pulse_door().await?;
///
///     assert_eq!(handle.door_pulses(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct HardwareChannel<L> {
    link: Mutex<L>,
    config: ChannelConfig,
}

impl<L: Link> HardwareChannel<L> {
    /// Take ownership of a link.
    pub fn new(link: L, config: ChannelConfig) -> Self {
        Self {
            link: Mutex::new(link),
            config,
        }
    }

    /// Channel timing in effect.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Switch one LED on or off and wait for the acknowledgment.
    ///
    /// # Errors
    ///
    /// Returns a hardware error on write failure, ack timeout or short ack.
    pub async fn set_led(&self, channel: LedChannel, on: bool) -> Result<()> {
        let mut link = self.link.lock().await;
        link.write_frame(&led_frame(channel, on)).await?;
        link.read_ack(LED_ACK_LENGTH, self.config.ack_timeout).await?;
        trace!(%channel, on, "LED set");
        Ok(())
    }

    /// Send the door-open command and wait for the acknowledgment.
    ///
    /// The relay closes on its own; this only guarantees the open command
    /// was acknowledged.
    ///
    /// # Errors
    ///
    /// Returns a hardware error on write failure, ack timeout or short ack.
    pub async fn pulse_door(&self) -> Result<()> {
        let mut link = self.link.lock().await;
        Self::door_transaction(&mut *link, self.config.ack_timeout).await
    }

    /// Like [`pulse_door`](Self::pulse_door) but never waits for the lock.
    ///
    /// Returns [`DoorPulse::Busy`] without touching the link if another
    /// transaction is in flight.
    ///
    /// # Errors
    ///
    /// Returns a hardware error if the lock was free but the transaction
    /// failed.
    pub async fn try_pulse_door(&self) -> Result<DoorPulse> {
        let Ok(mut link) = self.link.try_lock() else {
            debug!("Door pulse skipped, channel busy");
            return Ok(DoorPulse::Busy);
        };
        Self::door_transaction(&mut *link, self.config.ack_timeout).await?;
        Ok(DoorPulse::Acknowledged)
    }

    /// Wait up to the read timeout for one keypress.
    ///
    /// Returns `Ok(None)` when nothing arrived, so the caller's loop can
    /// still do periodic housekeeping.
    ///
    /// # Errors
    ///
    /// Returns a hardware error if the link failed or disconnected.
    pub async fn read_command(&self) -> Result<Option<KeypadInput>> {
        let mut link = self.link.lock().await;
        let byte = link.read_byte(self.config.read_timeout).await?;
        Ok(byte.map(KeypadInput::from_byte))
    }

    /// Discard keypresses received but not yet read.
    ///
    /// # Errors
    ///
    /// Returns a hardware error if the link failed.
    pub async fn flush_input(&self) -> Result<()> {
        let mut link = self.link.lock().await;
        link.discard_input().await
    }

    async fn door_transaction(link: &mut L, ack_timeout: Duration) -> Result<()> {
        link.write_frame(&DOOR_FRAME).await?;
        link.read_ack(DOOR_ACK_LENGTH, ack_timeout).await?;
        debug!("Door pulse acknowledged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HardwareError;
    use crate::mock::MockLink;
    use crate::types::HostCommand;
    use std::sync::Arc;

    fn channel() -> (HardwareChannel<MockLink>, crate::mock::MockLinkHandle) {
        let (link, handle) = MockLink::new();
        (HardwareChannel::new(link, ChannelConfig::default()), handle)
    }

    #[tokio::test]
    async fn test_set_led_writes_frame() {
        let (channel, handle) = channel();

        channel.set_led(LedChannel::Denied, true).await.unwrap();

        assert_eq!(
            handle.commands(),
            vec![HostCommand::Led {
                channel: LedChannel::Denied,
                on: true
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_led_without_ack_times_out() {
        let (channel, handle) = channel();
        handle.set_acks(false);

        let err = channel.set_led(LedChannel::Ready, true).await.unwrap_err();
        assert!(matches!(err, HardwareError::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_door_with_short_ack_fails() {
        let (channel, handle) = channel();
        handle.set_ack_len_override(Some(2));

        let err = channel.pulse_door().await.unwrap_err();
        assert!(matches!(
            err,
            HardwareError::ShortRead {
                expected: 4,
                received: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_pulse_door() {
        let (channel, handle) = channel();

        channel.pulse_door().await.unwrap();
        assert_eq!(handle.door_pulses(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_command_maps_bytes() {
        let (channel, handle) = channel();
        handle.press(b"5A").unwrap();

        assert_eq!(
            channel.read_command().await.unwrap(),
            Some(KeypadInput::Digit(5))
        );
        assert_eq!(
            channel.read_command().await.unwrap(),
            Some(KeypadInput::Accept)
        );
        assert_eq!(channel.read_command().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_command_after_disconnect_fails() {
        let (channel, handle) = channel();
        handle.press(b"1").unwrap();
        handle.disconnect();

        assert_eq!(
            channel.read_command().await.unwrap(),
            Some(KeypadInput::Digit(1))
        );
        assert!(matches!(
            channel.read_command().await,
            Err(HardwareError::Disconnected { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_input_discards_pending() {
        let (channel, handle) = channel();
        handle.press(b"999").unwrap();

        channel.flush_input().await.unwrap();

        assert_eq!(channel.read_command().await.unwrap(), None);
        assert_eq!(handle.flushes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_pulse_door_reports_busy_while_reading() {
        let (channel, handle) = channel();
        let channel = Arc::new(channel);

        let reader = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move { channel.read_command().await })
        };
        // Let the reader take the lock and park on the read timeout.
        tokio::task::yield_now().await;

        assert_eq!(channel.try_pulse_door().await.unwrap(), DoorPulse::Busy);
        assert_eq!(handle.door_pulses(), 0);

        assert_eq!(reader.await.unwrap().unwrap(), None);
        assert_eq!(
            channel.try_pulse_door().await.unwrap(),
            DoorPulse::Acknowledged
        );
        assert_eq!(handle.door_pulses(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_never_interleave() {
        let (channel, handle) = channel();
        let channel = Arc::new(channel);

        let mut tasks = Vec::new();
        for i in 0..20 {
            let channel = Arc::clone(&channel);
            tasks.push(tokio::spawn(async move {
                if i % 5 == 0 {
                    channel.pulse_door().await
                } else {
                    channel.set_led(LedChannel::Ready, i % 2 == 0).await
                }
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // Every frame decodes cleanly and every ack was consumed in order.
        let frames = handle.frames();
        assert_eq!(frames.len(), 20);
        assert!(frames.iter().all(|f| HostCommand::decode(f).is_some()));
        assert_eq!(handle.door_pulses(), 4);
        assert_eq!(handle.pending_ack_bytes(), 0);
    }
}
