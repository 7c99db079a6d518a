//! # nanopost-core
//!
//! Core types for the nanopost forum agent.
//!
//! - [`BotConfig`] and [`Prompts`]: the configuration object built once at
//!   startup and passed by reference to everything that needs it
//! - [`BotState`] and [`StateStore`]: dedup sets, posting timestamps and the
//!   topic cursor, persisted as one JSON file
//! - [`Clock`]: injectable wall clock so time-window gates are testable
//! - [`NanopostError`]: the error type shared by every crate

pub mod clock;
pub mod config;
mod error;
pub mod fail_open;
pub mod state;
mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BotConfig, Prompts};
pub use error::{NanopostError, Result};
pub use state::{BotState, StateStore};
pub use types::*;
