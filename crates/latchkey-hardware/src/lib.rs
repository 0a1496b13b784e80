//! Hardware access for the Latchkey door controller.
//!
//! The keypad peripheral is one device on one serial link carrying three
//! kinds of traffic: keypresses (device to host), LED commands and the
//! door-open command (host to device, each acknowledged by the device).
//!
//! # Layers
//!
//! - [`Link`]: byte-level transport. [`SerialLink`] talks to a real port,
//!   [`mock::MockLink`] is driven from tests.
//! - [`HardwareChannel`]: the only type the rest of the system touches. It
//!   owns the link behind one lock and exposes `set_led`, `pulse_door`,
//!   `try_pulse_door`, `read_command` and `flush_input`.
//!
//! ```no_run
//! use latchkey_hardware::{ChannelConfig, HardwareChannel, LedChannel, SerialConfig, SerialLink};
//!
//! # async fn example() -> latchkey_hardware::Result<()> {
//! let config = SerialConfig::default();
//! let link = SerialLink::open(&config)?;
//! let channel = HardwareChannel::new(link, ChannelConfig::from(&config));
//!
//! channel.set_led(LedChannel::Ready, true).await?;
//! if let Some(input) = channel.read_command().await? {
//!     println!("Key: {input:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] with a
//! [`HardwareError`]. The access engine treats every hardware error as
//! fatal.

pub mod channel;
pub mod error;
pub mod link;
pub mod mock;
pub mod types;

pub use channel::{ChannelConfig, HardwareChannel};
pub use error::{HardwareError, Result};
pub use link::{Link, SerialConfig, SerialLink};
pub use types::{DOOR_FRAME, DoorPulse, HostCommand, KeypadInput, LedChannel, led_frame};
