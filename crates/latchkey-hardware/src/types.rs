//! Keypad inputs, LED channels and wire frames.

use latchkey_core::constants::{
    ACCEPT_KEYS, CANCEL_KEYS, DOOR_COMMAND, FRAME_DELIMITER, LED_CHANNEL_DENIED,
    LED_CHANNEL_GRANTED, LED_CHANNEL_READY, LED_COMMAND,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Input received from the keypad peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypadInput {
    /// Numeric digit (0-9).
    Digit(u8),

    /// Submit the buffered digits.
    Accept,

    /// Abandon the buffered digits.
    Cancel,

    /// Any other byte; consumed and ignored.
    Other(u8),
}

impl KeypadInput {
    /// Classify one raw byte from the link.
    ///
    /// # Examples
    ///
    /// ```
    /// use latchkey_hardware::KeypadInput;
    ///
    /// assert_eq!(KeypadInput::from_byte(b'7'), KeypadInput::Digit(7));
    /// assert_eq!(KeypadInput::from_byte(b'A'), KeypadInput::Accept);
    /// assert_eq!(KeypadInput::from_byte(b'h'), KeypadInput::Cancel);
    /// assert_eq!(KeypadInput::from_byte(b'#'), KeypadInput::Other(b'#'));
    /// ```
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'0'..=b'9' => Self::Digit(byte - b'0'),
            b if ACCEPT_KEYS.contains(&b) => Self::Accept,
            b if CANCEL_KEYS.contains(&b) => Self::Cancel,
            b => Self::Other(b),
        }
    }

    /// Check if this input is a digit.
    pub fn is_digit(&self) -> bool {
        matches!(self, Self::Digit(_))
    }

    /// Get the digit as its ASCII character if this is a digit input.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Digit(d) => Some(char::from(b'0' + d)),
            _ => None,
        }
    }
}

/// Named status LEDs on the keypad peripheral.
///
/// Channels are addressed by name so call sites never juggle wire indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedChannel {
    /// Ready/idle indicator, normally lit.
    Ready,

    /// Access granted indicator.
    Granted,

    /// Access denied indicator.
    Denied,
}

impl LedChannel {
    /// ASCII digit used for this channel on the wire.
    pub fn wire_digit(self) -> u8 {
        match self {
            Self::Ready => LED_CHANNEL_READY,
            Self::Granted => LED_CHANNEL_GRANTED,
            Self::Denied => LED_CHANNEL_DENIED,
        }
    }

    /// Reverse lookup from a wire digit.
    pub fn from_wire_digit(digit: u8) -> Option<Self> {
        match digit {
            LED_CHANNEL_READY => Some(Self::Ready),
            LED_CHANNEL_GRANTED => Some(Self::Granted),
            LED_CHANNEL_DENIED => Some(Self::Denied),
            _ => None,
        }
    }
}

impl fmt::Display for LedChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// Outcome of a non-blocking door pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorPulse {
    /// The door-open command was written and acknowledged.
    Acknowledged,

    /// Another transaction held the link; nothing was sent.
    Busy,
}

/// Encode an LED frame: `\n l <channel> <value> \n`.
pub fn led_frame(channel: LedChannel, on: bool) -> [u8; 5] {
    [
        FRAME_DELIMITER,
        LED_COMMAND,
        channel.wire_digit(),
        if on { b'1' } else { b'0' },
        FRAME_DELIMITER,
    ]
}

/// The door-open frame: `\n o \n`.
pub const DOOR_FRAME: [u8; 3] = [FRAME_DELIMITER, DOOR_COMMAND, FRAME_DELIMITER];

/// Decoded host command, used by mocks and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// LED set.
    Led { channel: LedChannel, on: bool },

    /// Door open.
    Door,
}

impl HostCommand {
    /// Decode a frame produced by [`led_frame`] or [`DOOR_FRAME`].
    pub fn decode(frame: &[u8]) -> Option<Self> {
        match frame {
            [FRAME_DELIMITER, DOOR_COMMAND, FRAME_DELIMITER] => Some(Self::Door),
            [FRAME_DELIMITER, LED_COMMAND, channel, value, FRAME_DELIMITER] => {
                let channel = LedChannel::from_wire_digit(*channel)?;
                let on = match value {
                    b'1' => true,
                    b'0' => false,
                    _ => return None,
                };
                Some(Self::Led { channel, on })
            }
            _ => None,
        }
    }
}
