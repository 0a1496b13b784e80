//! Access control loop.
//!
//! One read cycle ([`AccessEngine::step`]):
//!
//! 1. wait up to the read timeout for one key
//! 2. pulse the ready LED (also when nothing arrived)
//! 3. apply the key to the [`InputBuffer`]
//! 4. on accept, verify and either open the door or run the deny blink
//!
//! Verification and LED patterns run inline, so the loop never reads a new
//! key while feedback is still showing.

use std::fmt;
use std::sync::Arc;

use latchkey_core::AccessAttempt;
use latchkey_credentials::Verifier;
use latchkey_directory::Directory;
use latchkey_hardware::{HardwareChannel, HardwareError, LedChannel, Link, Result};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::config::AccessConfig;
use crate::feedback::FeedbackConfig;
use crate::input::{InputAction, InputBuffer};

/// What one read cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Read timed out with no key.
    NoInput,
    /// Digit buffered.
    Buffered,
    /// Key ignored (noise, or a digit past the buffer cap).
    Ignored,
    /// Credential accepted and the door pulsed.
    Granted,
    /// Credential rejected.
    Denied,
    /// Cancel discarded buffered digits.
    Aborted,
    /// Cancel with nothing buffered.
    Acknowledged,
    /// Accept with too few digits.
    Rejected,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepOutcome::NoInput => "no_input",
            StepOutcome::Buffered => "buffered",
            StepOutcome::Ignored => "ignored",
            StepOutcome::Granted => "granted",
            StepOutcome::Denied => "denied",
            StepOutcome::Aborted => "aborted",
            StepOutcome::Acknowledged => "acknowledged",
            StepOutcome::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// The door controller's main loop.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use latchkey_core::{CredentialRecord, UserId};
/// use latchkey_credentials::{CredentialCache, Verifier};
/// use latchkey_directory::MockDirectory;
/// use latchkey_engine::{AccessEngine, FeedbackConfig, StepOutcome};
/// use latchkey_hardware::{ChannelConfig, HardwareChannel};
/// use latchkey_hardware::mock::MockLink;
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() -> latchkey_hardware::Result<()> {
///     let (link, keypad) = MockLink::new();
///     let channel = Arc::new(HardwareChannel::new(link, ChannelConfig::default()));
///
///     let directory = MockDirectory::new();
///     directory.insert(UserId::new("1234").unwrap(), CredentialRecord::new("0000"));
///     let verifier = Verifier::new(Arc::new(directory), Arc::new(CredentialCache::new()));
///
///     let mut engine = AccessEngine::new(channel, verifier, Default::default(), FeedbackConfig::default());
///
///     keypad.press(b"12340000A")?;
///     for _ in 0..8 {
///         engine.step().await?;
///     }
///     assert_eq!(engine.step().await?, StepOutcome::Granted);
///     assert_eq!(keypad.door_pulses(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct AccessEngine<L, D> {
    channel: Arc<HardwareChannel<L>>,
    verifier: Verifier<D>,
    buffer: InputBuffer,
    feedback: FeedbackConfig,
}

impl<L: Link, D: Directory> AccessEngine<L, D> {
    /// Assemble an engine. Only `input_timeout_ms` is read from `access`;
    /// the verifier carries the rest.
    pub fn new(
        channel: Arc<HardwareChannel<L>>,
        verifier: Verifier<D>,
        access: AccessConfig,
        feedback: FeedbackConfig,
    ) -> Self {
        Self {
            channel,
            verifier,
            buffer: InputBuffer::new(access.input_timeout()),
            feedback,
        }
    }

    /// The digit buffer.
    pub fn buffer(&self) -> &InputBuffer {
        &self.buffer
    }

    /// Reset the LEDs and process keys until the hardware fails.
    ///
    /// Only returns with the error that stopped the loop.
    pub async fn run(&mut self) -> HardwareError {
        if let Err(e) = self.feedback.reset(&self.channel).await {
            error!(error = %e, "LED reset failed");
            return e;
        }
        info!("Access engine ready");

        loop {
            if let Err(e) = self.step().await {
                error!(error = %e, "Hardware failure, stopping access engine");
                return e;
            }
        }
    }

    /// Run exactly one read cycle.
    ///
    /// # Errors
    ///
    /// Returns the first hardware error; the caller should treat it as
    /// fatal.
    pub async fn step(&mut self) -> Result<StepOutcome> {
        let input = self.channel.read_command().await?;
        self.feedback.ready_pulse(&self.channel).await?;

        let Some(input) = input else {
            return Ok(StepOutcome::NoInput);
        };
        trace!(digit = input.is_digit(), "Key received");

        let outcome = match self.buffer.apply(input, Instant::now()) {
            InputAction::Buffered => StepOutcome::Buffered,
            InputAction::Overflow | InputAction::Ignored => StepOutcome::Ignored,
            InputAction::Rejected => StepOutcome::Rejected,
            InputAction::Verify(attempt) => self.attempt(attempt).await?,
            InputAction::Aborted => {
                debug!("Entry aborted");
                self.feedback.abort(&self.channel).await?;
                StepOutcome::Aborted
            }
            InputAction::IdleCancel => {
                self.feedback.idle_cancel(&self.channel).await?;
                StepOutcome::Acknowledged
            }
        };
        Ok(outcome)
    }

    async fn attempt(&mut self, attempt: AccessAttempt) -> Result<StepOutcome> {
        let user_id = attempt.user_id();
        let verdict = self.verifier.check(&attempt).await;

        if verdict.granted {
            info!(%user_id, source = %verdict.source, "Access granted");
            self.grant().await?;
            Ok(StepOutcome::Granted)
        } else {
            warn!(%user_id, source = %verdict.source, "Access denied");
            self.feedback.deny(&self.channel).await?;
            Ok(StepOutcome::Denied)
        }
    }

    async fn grant(&self) -> Result<()> {
        self.channel.set_led(LedChannel::Granted, true).await?;
        self.channel.pulse_door().await?;
        self.channel.set_led(LedChannel::Granted, false).await?;
        self.channel.flush_input().await
    }
}
