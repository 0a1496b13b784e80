//! LED feedback patterns.
//!
//! Every pattern runs to completion before the engine reads the next key.
//! Keys pressed meanwhile stay queued on the link.

use std::time::Duration;

use latchkey_core::constants::{
    DEFAULT_ABORT_BLINK_MS, DEFAULT_DENY_BLINK_MS, DEFAULT_DENY_BLINKS, DEFAULT_IDLE_BLINK_MS,
    DEFAULT_READY_PULSE_MS,
};
use latchkey_hardware::{HardwareChannel, LedChannel, Link, Result};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

/// LED timings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Ready LED off-time of the per-cycle liveness pulse.
    pub ready_pulse_ms: u64,

    /// Number of denied-LED blinks after a rejected credential.
    pub deny_blinks: u32,

    /// On and off time of each deny blink.
    pub deny_blink_ms: u64,

    /// Denied LED on-time after cancelling buffered digits.
    pub abort_blink_ms: u64,

    /// Denied LED on-time after cancelling with nothing buffered.
    pub idle_blink_ms: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            ready_pulse_ms: DEFAULT_READY_PULSE_MS,
            deny_blinks: DEFAULT_DENY_BLINKS,
            deny_blink_ms: DEFAULT_DENY_BLINK_MS,
            abort_blink_ms: DEFAULT_ABORT_BLINK_MS,
            idle_blink_ms: DEFAULT_IDLE_BLINK_MS,
        }
    }
}

impl FeedbackConfig {
    /// Wall time of the full deny sequence.
    pub fn deny_duration(&self) -> Duration {
        Duration::from_millis(self.deny_blink_ms * 2 * u64::from(self.deny_blinks))
    }

    /// Put every LED in its resting state: ready on, the others off.
    pub async fn reset<L: Link>(&self, channel: &HardwareChannel<L>) -> Result<()> {
        channel.set_led(LedChannel::Granted, false).await?;
        channel.set_led(LedChannel::Denied, false).await?;
        channel.set_led(LedChannel::Ready, true).await
    }

    /// Briefly switch the ready LED off and back on.
    pub async fn ready_pulse<L: Link>(&self, channel: &HardwareChannel<L>) -> Result<()> {
        channel.set_led(LedChannel::Ready, false).await?;
        pause(self.ready_pulse_ms).await;
        channel.set_led(LedChannel::Ready, true).await
    }

    /// Blink the denied LED `deny_blinks` times.
    pub async fn deny<L: Link>(&self, channel: &HardwareChannel<L>) -> Result<()> {
        for _ in 0..self.deny_blinks {
            flash(channel, LedChannel::Denied, self.deny_blink_ms).await?;
            pause(self.deny_blink_ms).await;
        }
        Ok(())
    }

    /// One long denied-LED flash for an abandoned entry.
    pub async fn abort<L: Link>(&self, channel: &HardwareChannel<L>) -> Result<()> {
        flash(channel, LedChannel::Denied, self.abort_blink_ms).await
    }

    /// One short denied-LED flash acknowledging cancel on an empty buffer.
    pub async fn idle_cancel<L: Link>(&self, channel: &HardwareChannel<L>) -> Result<()> {
        flash(channel, LedChannel::Denied, self.idle_blink_ms).await
    }
}

async fn flash<L: Link>(channel: &HardwareChannel<L>, led: LedChannel, on_ms: u64) -> Result<()> {
    channel.set_led(led, true).await?;
    pause(on_ms).await;
    channel.set_led(led, false).await
}

async fn pause(ms: u64) {
    if ms > 0 {
        sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_hardware::ChannelConfig;
    use latchkey_hardware::mock::MockLink;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_deny_blinks_configured_times() {
        let (link, handle) = MockLink::new();
        let channel = HardwareChannel::new(link, ChannelConfig::default());
        let feedback = FeedbackConfig::default();

        let start = Instant::now();
        feedback.deny(&channel).await.unwrap();

        assert_eq!(
            handle.led_history(LedChannel::Denied),
            vec![true, false, true, false, true, false]
        );
        assert_eq!(start.elapsed(), feedback.deny_duration());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_is_longer_than_idle_cancel() {
        let (link, _handle) = MockLink::new();
        let channel = HardwareChannel::new(link, ChannelConfig::default());
        let feedback = FeedbackConfig::default();

        let start = Instant::now();
        feedback.abort(&channel).await.unwrap();
        let abort = start.elapsed();

        let start = Instant::now();
        feedback.idle_cancel(&channel).await.unwrap();
        let idle = start.elapsed();

        assert!(abort > idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_pulse_off_then_on() {
        let (link, handle) = MockLink::new();
        let channel = HardwareChannel::new(link, ChannelConfig::default());

        FeedbackConfig::default().ready_pulse(&channel).await.unwrap();

        assert_eq!(handle.led_history(LedChannel::Ready), vec![false, true]);
    }

    #[tokio::test]
    async fn test_reset_leaves_only_ready_lit() {
        let (link, handle) = MockLink::new();
        let channel = HardwareChannel::new(link, ChannelConfig::default());

        FeedbackConfig::default().reset(&channel).await.unwrap();

        assert_eq!(handle.led_history(LedChannel::Granted), vec![false]);
        assert_eq!(handle.led_history(LedChannel::Denied), vec![false]);
        assert_eq!(handle.led_history(LedChannel::Ready), vec![true]);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: FeedbackConfig = toml::from_str("deny_blinks = 5").unwrap();
        assert_eq!(config.deny_blinks, 5);
        assert_eq!(config.deny_blink_ms, DEFAULT_DENY_BLINK_MS);
    }
}
