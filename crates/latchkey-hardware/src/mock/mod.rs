//! Mock device implementations for testing and development.
//!
//! This module provides a simulated keypad link that can be controlled
//! programmatically without requiring physical hardware.

pub mod link;

pub use link::{MockLink, MockLinkHandle};
