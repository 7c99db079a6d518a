//! # nanopost-client
//!
//! Remote collaborators of the nanopost agent:
//! - [`ForumClient`]: bearer-authenticated forum REST API (reads and writes)
//! - [`GenerationClient`]: single-shot chat completion
//!
//! Both sit behind traits ([`ForumApi`], [`TextGenerator`]) so the heartbeat
//! can be driven by [`MockForum`] and [`MockGenerator`] in tests.
//!
//! Neither client retries. A failed call is returned to the caller, which
//! skips that piece of work until the next heartbeat.

mod auth;
mod forum;
mod generation;
mod mock;
mod types;

pub use auth::{load_env_file, Credentials};
pub use forum::{ForumApi, ForumClient};
pub use generation::{GenerationClient, TextGenerator};
pub use mock::{ForumCall, MockForum, MockGenerator};
pub use types::*;
