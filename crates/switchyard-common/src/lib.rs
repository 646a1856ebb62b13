//! # Switchyard Common
//!
//! Shared types, utilities, and common functionality for Switchyard.
//!
//! This crate provides the error type, logging bootstrap and clock
//! abstraction used across all other crates in the workspace.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod error;
pub mod logging;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use clock::{system_clock, Clock, ManualClock, SharedClock, SystemClock};
pub use error::{BoxError, Result, SwitchyardError};
pub use logging::{init_dev_logging, init_logging, LogFormat, LoggingConfig};
