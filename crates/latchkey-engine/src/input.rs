//! Keypad input state machine.
//!
//! # States
//!
//! - `Idle`: buffer empty
//! - `Accumulating`: at least one digit buffered
//!
//! # Transitions (per received key)
//!
//! | Key     | Idle                  | Accumulating                          |
//! |---------|-----------------------|---------------------------------------|
//! | digit   | append → Accumulating | append (dropped past the cap)         |
//! | accept  | `Rejected`            | > 4 digits: `Verify`, clear → Idle    |
//! |         |                       | ≤ 4 digits: `Rejected`, keep buffer   |
//! | cancel  | `IdleCancel`          | `Aborted`, clear → Idle               |
//! | other   | `Ignored`             | `Ignored`                             |
//!
//! Before any key is applied, a gap longer than the input timeout since the
//! previous key discards the buffer, so digits from an abandoned attempt are
//! never joined to a fresh one.

use std::fmt;
use std::time::Duration;

use latchkey_core::AccessAttempt;
use latchkey_core::constants::{DEFAULT_INPUT_TIMEOUT_MS, MAX_BUFFER_LENGTH, USER_ID_LENGTH};
use latchkey_hardware::KeypadInput;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Buffer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputState {
    /// Nothing buffered.
    Idle,

    /// Digits buffered, waiting for accept or cancel.
    Accumulating,
}

impl fmt::Display for InputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputState::Idle => f.write_str("Idle"),
            InputState::Accumulating => f.write_str("Accumulating"),
        }
    }
}

/// What the engine must do after a key was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Digit appended.
    Buffered,

    /// Digit dropped because the buffer is full.
    Overflow,

    /// Non-command byte, nothing changed.
    Ignored,

    /// Accept with enough digits: check this attempt.
    Verify(AccessAttempt),

    /// Accept with too few digits; buffer kept.
    Rejected,

    /// Cancel with digits buffered; buffer cleared.
    Aborted,

    /// Cancel with an empty buffer.
    IdleCancel,
}

/// Digit buffer owned by the access engine.
pub struct InputBuffer {
    digits: String,
    last_input: Option<Instant>,
    input_timeout: Duration,
}

impl fmt::Debug for InputBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputBuffer")
            .field("digits", &format_args!("<{} digits>", self.digits.len()))
            .field("last_input", &self.last_input)
            .field("input_timeout", &self.input_timeout)
            .finish()
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_INPUT_TIMEOUT_MS))
    }
}

impl InputBuffer {
    /// Create an empty buffer with the given inter-key timeout.
    pub fn new(input_timeout: Duration) -> Self {
        Self {
            digits: String::with_capacity(MAX_BUFFER_LENGTH),
            last_input: None,
            input_timeout,
        }
    }

    /// Current state.
    pub fn state(&self) -> InputState {
        if self.digits.is_empty() {
            InputState::Idle
        } else {
            InputState::Accumulating
        }
    }

    /// Buffered digits.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Number of buffered digits.
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Inter-key timeout in effect.
    pub fn input_timeout(&self) -> Duration {
        self.input_timeout
    }

    /// Discard buffered digits.
    pub fn clear(&mut self) {
        self.digits.clear();
    }

    /// Apply one key received at `now`.
    ///
    /// # Examples
    ///
    /// ```
    /// use latchkey_engine::{InputAction, InputBuffer};
    /// use latchkey_hardware::KeypadInput;
    /// use tokio::time::Instant;
    ///
    /// let mut buffer = InputBuffer::default();
    /// let now = Instant::now();
    /// for key in b"12340000" {
    ///     buffer.apply(KeypadInput::from_byte(*key), now);
    /// }
    ///
    /// match buffer.apply(KeypadInput::Accept, now) {
    ///     InputAction::Verify(attempt) => assert_eq!(attempt.user_id().as_str(), "1234"),
    ///     other => panic!("unexpected {other:?}"),
    /// }
    /// assert!(buffer.is_empty());
    /// ```
    pub fn apply(&mut self, input: KeypadInput, now: Instant) -> InputAction {
        self.expire(now);
        self.last_input = Some(now);

        match input {
            KeypadInput::Digit(_) => self.push_digit(input),
            KeypadInput::Accept => self.accept(),
            KeypadInput::Cancel if self.digits.is_empty() => InputAction::IdleCancel,
            KeypadInput::Cancel => {
                self.digits.clear();
                InputAction::Aborted
            }
            KeypadInput::Other(_) => InputAction::Ignored,
        }
    }

    fn expire(&mut self, now: Instant) {
        let Some(last) = self.last_input else {
            return;
        };
        if !self.digits.is_empty() && now.saturating_duration_since(last) > self.input_timeout {
            debug!(discarded = self.digits.len(), "Input timeout, buffer cleared");
            self.digits.clear();
        }
    }

    fn push_digit(&mut self, input: KeypadInput) -> InputAction {
        let Some(c) = input.as_char() else {
            return InputAction::Ignored;
        };
        if self.digits.len() >= MAX_BUFFER_LENGTH {
            warn!(max = MAX_BUFFER_LENGTH, "Input buffer full, digit dropped");
            return InputAction::Overflow;
        }
        self.digits.push(c);
        InputAction::Buffered
    }

    fn accept(&mut self) -> InputAction {
        if self.digits.len() <= USER_ID_LENGTH {
            debug!(buffered = self.digits.len(), "Accept ignored, no PIN entered");
            return InputAction::Rejected;
        }

        let digits = std::mem::take(&mut self.digits);
        match AccessAttempt::from_digits(&digits) {
            Ok(attempt) => InputAction::Verify(attempt),
            Err(e) => {
                warn!(error = %e, "Discarding unusable input");
                InputAction::Rejected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn feed(buffer: &mut InputBuffer, keys: &[u8], now: Instant) -> Vec<InputAction> {
        keys.iter()
            .map(|k| buffer.apply(KeypadInput::from_byte(*k), now))
            .collect()
    }

    #[test]
    fn test_debug_hides_buffered_digits() {
        let mut buffer = InputBuffer::default();
        feed(&mut buffer, b"12345678", Instant::now());

        let debug = format!("{buffer:?}");
        assert!(!debug.contains("12345678"));
        assert!(debug.contains("<8 digits>"));
    }

    #[test]
    fn test_digits_accumulate() {
        let mut buffer = InputBuffer::default();
        assert_eq!(buffer.state(), InputState::Idle);

        let actions = feed(&mut buffer, b"123", Instant::now());

        assert!(actions.iter().all(|a| *a == InputAction::Buffered));
        assert_eq!(buffer.digits(), "123");
        assert_eq!(buffer.state(), InputState::Accumulating);
    }

    #[rstest]
    #[case(b"")]
    #[case(b"1")]
    #[case(b"1234")]
    fn test_accept_needs_pin_digit(#[case] keys: &[u8]) {
        let mut buffer = InputBuffer::default();
        let now = Instant::now();
        feed(&mut buffer, keys, now);

        assert_eq!(buffer.apply(KeypadInput::Accept, now), InputAction::Rejected);
        assert_eq!(buffer.len(), keys.len());
    }

    #[rstest]
    #[case(b"12345", "1234", "5")]
    #[case(b"12340000", "1234", "0000")]
    #[case(b"99998888777766665555444433332222", "9999", "8888777766665555444433332222")]
    fn test_accept_splits_user_and_pin(
        #[case] keys: &[u8],
        #[case] user: &str,
        #[case] pin: &str,
    ) {
        let mut buffer = InputBuffer::default();
        let now = Instant::now();
        feed(&mut buffer, keys, now);

        let InputAction::Verify(attempt) = buffer.apply(KeypadInput::Accept, now) else {
            panic!("expected Verify");
        };
        assert_eq!(attempt.user_id().as_str(), user);
        assert_eq!(attempt.pin().as_str(), pin);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_cancel_paths() {
        let mut buffer = InputBuffer::default();
        let now = Instant::now();

        assert_eq!(buffer.apply(KeypadInput::Cancel, now), InputAction::IdleCancel);

        feed(&mut buffer, b"12", now);
        assert_eq!(buffer.apply(KeypadInput::Cancel, now), InputAction::Aborted);
        assert!(buffer.is_empty());

        assert_eq!(buffer.apply(KeypadInput::Cancel, now), InputAction::IdleCancel);
    }

    #[test]
    fn test_noise_is_ignored() {
        let mut buffer = InputBuffer::default();
        let now = Instant::now();
        feed(&mut buffer, b"12", now);

        assert_eq!(
            buffer.apply(KeypadInput::Other(b'#'), now),
            InputAction::Ignored
        );
        assert_eq!(buffer.digits(), "12");
    }

    #[test]
    fn test_overflow_drops_digits() {
        let mut buffer = InputBuffer::default();
        let now = Instant::now();
        feed(&mut buffer, &[b'1'; MAX_BUFFER_LENGTH], now);

        assert_eq!(
            buffer.apply(KeypadInput::Digit(2), now),
            InputAction::Overflow
        );
        assert_eq!(buffer.len(), MAX_BUFFER_LENGTH);
        assert!(!buffer.digits().contains('2'));
    }

    #[test]
    fn test_timeout_discards_old_digits() {
        let mut buffer = InputBuffer::new(Duration::from_secs(10));
        let start = Instant::now();
        feed(&mut buffer, b"1234", start);

        let later = start + Duration::from_secs(11);
        buffer.apply(KeypadInput::Digit(9), later);

        assert_eq!(buffer.digits(), "9");
    }

    #[test]
    fn test_gap_within_timeout_keeps_digits() {
        let mut buffer = InputBuffer::new(Duration::from_secs(10));
        let start = Instant::now();
        feed(&mut buffer, b"1234", start);

        buffer.apply(KeypadInput::Digit(9), start + Duration::from_secs(10));

        assert_eq!(buffer.digits(), "12349");
    }

    #[test]
    fn test_timeout_applies_before_accept() {
        let mut buffer = InputBuffer::new(Duration::from_secs(10));
        let start = Instant::now();
        feed(&mut buffer, b"12340000", start);

        let action = buffer.apply(KeypadInput::Accept, start + Duration::from_secs(30));

        assert_eq!(action, InputAction::Rejected);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_timeout_measured_from_last_key_of_any_kind() {
        let mut buffer = InputBuffer::new(Duration::from_secs(10));
        let start = Instant::now();
        feed(&mut buffer, b"12", start);
        buffer.apply(KeypadInput::Other(b'x'), start + Duration::from_secs(8));

        buffer.apply(KeypadInput::Digit(3), start + Duration::from_secs(16));

        assert_eq!(buffer.digits(), "123");
    }

    fn key() -> impl Strategy<Value = u8> {
        prop_oneof![
            (b'0'..=b'9'),
            any::<u8>().prop_filter("noise only", |b| {
                matches!(KeypadInput::from_byte(*b), KeypadInput::Other(_))
            }),
        ]
    }

    proptest! {
        #[test]
        fn prop_buffer_holds_only_digits_in_order(keys in prop::collection::vec(key(), 0..64)) {
            let mut buffer = InputBuffer::default();
            let now = Instant::now();
            for k in &keys {
                buffer.apply(KeypadInput::from_byte(*k), now);
            }

            let expected: String = keys
                .iter()
                .filter(|k| k.is_ascii_digit())
                .map(|k| char::from(*k))
                .take(MAX_BUFFER_LENGTH)
                .collect();
            prop_assert_eq!(buffer.digits(), expected.as_str());
        }

        #[test]
        fn prop_short_accept_never_verifies(digits in "[0-9]{0,4}") {
            let mut buffer = InputBuffer::default();
            let now = Instant::now();
            for k in digits.bytes() {
                buffer.apply(KeypadInput::from_byte(k), now);
            }

            prop_assert_eq!(buffer.apply(KeypadInput::Accept, now), InputAction::Rejected);
            prop_assert_eq!(buffer.digits(), digits.as_str());
        }

        #[test]
        fn prop_buffer_empty_after_accept_or_abort(digits in "[0-9]{5,32}", cancel in any::<bool>()) {
            let mut buffer = InputBuffer::default();
            let now = Instant::now();
            for k in digits.bytes() {
                buffer.apply(KeypadInput::from_byte(k), now);
            }

            let key = if cancel { KeypadInput::Cancel } else { KeypadInput::Accept };
            buffer.apply(key, now);
            prop_assert!(buffer.is_empty());
        }
    }
}
