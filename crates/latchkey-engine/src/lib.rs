//! Access control engine for the Latchkey door controller.
//!
//! [`AccessEngine`] ties the keypad channel, the [`InputBuffer`] state
//! machine and the credential [`Verifier`](latchkey_credentials::Verifier)
//! together. It owns the input buffer outright; the hardware channel and
//! credential cache are shared through `Arc`.

pub mod config;
pub mod engine;
pub mod feedback;
pub mod input;

pub use config::AccessConfig;
pub use engine::{AccessEngine, StepOutcome};
pub use feedback::FeedbackConfig;
pub use input::{InputAction, InputBuffer, InputState};
