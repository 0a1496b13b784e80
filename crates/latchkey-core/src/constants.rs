//! Wire, keypad and timing constants for the Latchkey controller.
//!
//! The keypad peripheral speaks a tiny newline-delimited ASCII protocol:
//!
//! ```text
//! host -> device   \n l <channel> <value> \n     (LED set, 1 byte ack)
//! host -> device   \n o \n                       (door open, 4 byte ack)
//! device -> host   one ASCII byte per keypress
//! ```
//!
//! Keypresses are digits (`'0'..='9'`), one of two accept aliases, one of two
//! cancel aliases, or noise that is consumed and ignored.
//!
//! # Usage
//!
//! ```
//! use latchkey_core::constants::*;
//!
//! assert!(ACCEPT_KEYS.contains(&b'A'));
//! assert!(CANCEL_KEYS.contains(&b'h'));
//! assert_eq!(USER_ID_LENGTH, 4);
//! ```

// ============================================================================
// Keypad
// ============================================================================

/// Keys that submit the buffered digits (primary and alternate trigger).
pub const ACCEPT_KEYS: [u8; 2] = [b'A', b'H'];

/// Keys that abandon the buffered digits (primary and alternate trigger).
pub const CANCEL_KEYS: [u8; 2] = [b'C', b'h'];

/// Number of leading digits that form the user id.
///
/// Everything after the user id is the PIN, so an accept is only honored
/// once the buffer is strictly longer than this.
pub const USER_ID_LENGTH: usize = 4;

/// Upper bound on buffered digits.
///
/// Digits beyond this are dropped until the buffer is cleared by accept,
/// cancel or the input timeout.
pub const MAX_BUFFER_LENGTH: usize = 32;

// ============================================================================
// Wire protocol
// ============================================================================

/// Frame delimiter for host commands.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Command byte for LED frames.
pub const LED_COMMAND: u8 = b'l';

/// Command byte for the door-open frame.
pub const DOOR_COMMAND: u8 = b'o';

/// Acknowledgment length for an LED frame.
pub const LED_ACK_LENGTH: usize = 1;

/// Acknowledgment length for the door-open frame.
pub const DOOR_ACK_LENGTH: usize = 4;

/// Channel digit of the ready/idle LED.
pub const LED_CHANNEL_READY: u8 = b'0';

/// Channel digit of the access-granted LED.
pub const LED_CHANNEL_GRANTED: u8 = b'1';

/// Channel digit of the access-denied LED.
pub const LED_CHANNEL_DENIED: u8 = b'2';

// ============================================================================
// Timing defaults (milliseconds unless noted)
// ============================================================================

/// How long `read_command` waits for a keypress before reporting no input.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// How long the host waits for a command acknowledgment.
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 500;

/// Gap between keypresses after which the buffered digits are discarded.
pub const DEFAULT_INPUT_TIMEOUT_MS: u64 = 10_000;

/// Upper bound on one directory lookup during verification.
pub const DEFAULT_VERIFY_TIMEOUT_MS: u64 = 3000;

/// Period of the background cache refresh, in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// Off time of the ready LED liveness pulse.
pub const DEFAULT_READY_PULSE_MS: u64 = 50;

/// Number of denied-LED blinks after a rejected credential.
pub const DEFAULT_DENY_BLINKS: u32 = 3;

/// On/off half-period of a deny blink.
pub const DEFAULT_DENY_BLINK_MS: u64 = 250;

/// Denied LED on-time after cancelling a non-empty buffer.
pub const DEFAULT_ABORT_BLINK_MS: u64 = 1000;

/// Denied LED on-time after cancelling an empty buffer.
pub const DEFAULT_IDLE_BLINK_MS: u64 = 100;
