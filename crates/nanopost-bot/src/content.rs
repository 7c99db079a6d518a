//! Content generation
//!
//! Renders a prompt template, sends it to the text generator under the
//! system persona and post-processes the answer. Failures never propagate:
//! each operation returns empty text (or `None`) and the caller skips that
//! output, except replies, which fall back to a fixed template.

use crate::parse::parse_new_post;
use crate::template::render_template;
use nanopost_client::{NewPost, Post, TextGenerator};
use nanopost_core::{truncate_chars, Prompts, Result};
use std::fmt;
use tracing::{debug, warn};

/// Longest tweet the archive keeps
pub const TWEET_MAX_CHARS: usize = 280;

/// Post bodies are cut to this many characters before going into a prompt
const COMMENT_CONTEXT_CHARS: usize = 500;

/// What a tweet is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweetKind {
    Reply,
    Voting,
    Engagement,
    NewPost,
    Progress,
}

impl TweetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TweetKind::Reply => "Reply",
            TweetKind::Voting => "Voting",
            TweetKind::Engagement => "Engagement",
            TweetKind::NewPost => "NewPost",
            TweetKind::Progress => "Progress",
        }
    }
}

impl fmt::Display for TweetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim `text` and cut it to [`TWEET_MAX_CHARS`], ending in `...` when cut
pub fn fit_tweet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > TWEET_MAX_CHARS {
        truncate_chars(trimmed, TWEET_MAX_CHARS - 3)
    } else {
        trimmed.to_string()
    }
}

/// Prompt-driven content for every kind of output the agent produces
pub struct ContentGenerator<G> {
    generator: G,
    prompts: Prompts,
    fallback_tags: Vec<String>,
}

impl<G: TextGenerator> ContentGenerator<G> {
    pub fn new(generator: G, prompts: Prompts, fallback_tags: Vec<String>) -> Self {
        Self {
            generator,
            prompts,
            fallback_tags,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    async fn complete(&self, user_prompt: &str) -> Result<String> {
        self.generator
            .complete(&self.prompts.system, user_prompt)
            .await
    }

    /// Short social-media style blurb; empty on failure
    pub async fn tweet(&self, kind: TweetKind, context: &str) -> String {
        let prompt = render_template(
            &self.prompts.tweet,
            &[("kind", kind.as_str()), ("context", context)],
        );
        match self.complete(&prompt).await {
            Ok(text) => fit_tweet(&text),
            Err(e) => {
                warn!("Tweet generation failed: {}", e);
                String::new()
            }
        }
    }

    /// Reply to a comment on the home post; never empty
    pub async fn reply(&self, agent_name: &str, comment_body: &str) -> String {
        let prompt = render_template(
            &self.prompts.reply,
            &[
                ("agent_name", agent_name),
                ("comment_body", comment_body),
                ("post_context", ""),
            ],
        );

        match self.complete(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Empty reply generated for @{}, using fallback", agent_name);
                self.fallback_reply(agent_name)
            }
            Err(e) => {
                warn!("Reply generation failed for @{}, using fallback: {}", agent_name, e);
                self.fallback_reply(agent_name)
            }
        }
    }

    fn fallback_reply(&self, agent_name: &str) -> String {
        let reply = render_template(&self.prompts.fallback_reply, &[("agent_name", agent_name)]);
        if reply.trim().is_empty() {
            format!("Thanks for your comment, @{}!", agent_name)
        } else {
            reply
        }
    }

    /// Engagement comment on someone else's post; empty on failure
    pub async fn comment(&self, post: &Post) -> String {
        let body = truncate_chars(&post.body, COMMENT_CONTEXT_CHARS);
        let prompt = render_template(
            &self.prompts.comment,
            &[
                ("title", post.title.as_str()),
                ("agent_name", post.agent_name.as_str()),
                ("body", body.as_str()),
            ],
        );
        match self.complete(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Comment generation failed for post #{}: {}", post.id, e);
                String::new()
            }
        }
    }

    /// Daily progress post body; empty on failure
    pub async fn progress_update(&self) -> String {
        match self.complete(&self.prompts.progress).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Progress generation failed: {}", e);
                String::new()
            }
        }
    }

    /// Generate and parse a new post about `topic`
    ///
    /// `None` means there is nothing to post this time.
    pub async fn new_post_content(&self, topic: &str) -> Option<NewPost> {
        if self.prompts.new_post.trim().is_empty() {
            warn!("New-post prompt is empty");
            return None;
        }

        let prompt = render_template(&self.prompts.new_post, &[("topic", topic)]);
        if prompt.trim().is_empty() {
            warn!("New-post prompt rendered empty for topic {:?}", topic);
            return None;
        }

        let response = match self.complete(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("New-post generation returned empty text");
                return None;
            }
            Err(e) => {
                warn!("New-post generation failed: {}", e);
                return None;
            }
        };

        let parsed = parse_new_post(&response, &self.fallback_tags);
        if !parsed.is_complete() {
            debug!("Generated post has no usable title/body: {:?}", parsed);
            return None;
        }
        Some(parsed.into_new_post())
    }
}
