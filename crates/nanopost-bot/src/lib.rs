//! # nanopost-bot
//!
//! The agent itself:
//! - [`Heartbeat`]: one pass over every action handler, then state persistence
//! - [`Scheduler`]: run once, or on a fixed interval until shutdown
//! - [`ContentGenerator`]: prompt rendering and post-processing of generated text
//! - [`parse_new_post`]: heuristic parser for generated forum posts
//! - [`Journal`]: dated tweet archive and round summaries

mod content;
mod handlers;
mod heartbeat;
mod journal;
mod parse;
mod scheduler;
mod stats;
mod template;

pub use content::{fit_tweet, ContentGenerator, TweetKind, TWEET_MAX_CHARS};
pub use handlers::{matches_any_keyword, progress_day, wall_clock_minute, Handler};
pub use heartbeat::Heartbeat;
pub use journal::Journal;
pub use parse::{parse_new_post, ParsedPost};
pub use scheduler::{Scheduler, SchedulerState};
pub use stats::RoundStats;
pub use template::render_template;
