#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![cfg_attr(feature = "nightly", feature(allocator_api))]

//! Check guards, a logging facade and an allocation shim for ESP firmware.
//!
//! All three are configured at build time, see [`config`].

extern crate alloc;

// Provides the critical-section implementation on chips
#[cfg(feature = "esp-hal")]
use esp_hal as _;

pub mod check;
pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod thread;
pub mod trace;

pub use error::EspErr;
pub use logging::{setup, LogLevel};
