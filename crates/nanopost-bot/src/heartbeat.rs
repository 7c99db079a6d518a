//! One heartbeat: every handler, in order, then persistence
//!
//! The heartbeat owns the agent's in-memory state for the lifetime of the
//! process. Each [`Heartbeat::run`] resets the round counters, logs the
//! status preamble, runs the enabled handlers strictly one after another,
//! appends the round summary and writes the state file back.

use crate::content::{ContentGenerator, TweetKind};
use crate::handlers::Handler;
use crate::journal::Journal;
use crate::stats::RoundStats;
use nanopost_client::{ForumApi, TextGenerator};
use nanopost_core::fail_open::fail_open;
use nanopost_core::{BotConfig, BotState, Clock, Prompts, Result, StateStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Heartbeat orchestrator
pub struct Heartbeat<F, G, C> {
    pub(crate) config: Arc<BotConfig>,
    pub(crate) forum: F,
    pub(crate) content: ContentGenerator<G>,
    pub(crate) clock: C,
    pub(crate) state: BotState,
    pub(crate) stats: RoundStats,
    pub(crate) journal: Journal,
    store: StateStore,
    cycles: u64,
}

impl<F, G, C> Heartbeat<F, G, C>
where
    F: ForumApi,
    G: TextGenerator,
    C: Clock,
{
    /// Build a heartbeat around already-loaded state
    pub fn new(
        config: Arc<BotConfig>,
        prompts: Prompts,
        forum: F,
        generator: G,
        clock: C,
        store: StateStore,
        state: BotState,
    ) -> Self {
        let content =
            ContentGenerator::new(generator, prompts, config.posting.fallback_tags.clone());
        let journal = Journal::new(config.output.clone());
        Self {
            config,
            forum,
            content,
            clock,
            state,
            stats: RoundStats::default(),
            journal,
            store,
            cycles: 0,
        }
    }

    /// Build a heartbeat, loading state from the configured state file
    pub async fn load(
        config: Arc<BotConfig>,
        prompts: Prompts,
        forum: F,
        generator: G,
        clock: C,
    ) -> Self {
        let store = StateStore::new(config.output.state_path());
        let state = store.load().await;
        Self::new(config, prompts, forum, generator, clock, store, state)
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn forum(&self) -> &F {
        &self.forum
    }

    pub fn content(&self) -> &ContentGenerator<G> {
        &self.content
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BotState {
        &mut self.state
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Heartbeats completed since construction
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Tweets archived since construction
    pub fn tweet_count(&self) -> usize {
        self.journal.tweet_count()
    }

    /// Run one full heartbeat and return its counters
    ///
    /// Never fails: handler errors are logged and the next handler runs.
    pub async fn run(&mut self) -> RoundStats {
        self.cycles += 1;
        self.stats = RoundStats::default();
        info!("=== Heartbeat #{} ===", self.cycles);

        self.report_status().await;

        for handler in Handler::ORDER {
            if !handler.is_enabled(&self.config) {
                debug!("{} disabled, skipping", handler);
                continue;
            }
            if let Err(e) = self.dispatch(handler).await {
                warn!(handler = handler.name(), "Handler aborted for this heartbeat: {}", e);
            }
        }

        let now = self.clock.now();
        self.journal.record_summary(&self.stats, now).await;
        self.persist().await;

        info!(
            replies = self.stats.replies,
            post_votes = self.stats.post_votes,
            project_votes = self.stats.project_votes,
            engagements = self.stats.engagements,
            "Heartbeat #{} complete",
            self.cycles
        );
        self.stats.clone()
    }

    async fn dispatch(&mut self, handler: Handler) -> Result<()> {
        match handler {
            Handler::CheckComments => self.check_comments().await,
            Handler::DiscoverAndVote => self.discover_and_vote().await,
            Handler::VoteProjects => self.vote_projects().await,
            Handler::EngageWithPosts => self.engage_with_posts().await,
            Handler::CheckMentions => self.check_mentions().await,
            Handler::CheckLeaderboard => self.check_leaderboard().await,
            Handler::PostNew => self.post_new().await,
            Handler::PostProgress => self.post_progress().await,
        }
    }

    async fn report_status(&self) {
        match self.forum.status().await {
            Ok(status) => {
                info!(
                    "Status: {} | Hackathon active: {}",
                    status.status, status.hackathon.is_active
                );
                info!(
                    "Posts: {} | Replies on our posts: {} | Project: {}",
                    status.engagement.forum_post_count,
                    status.engagement.replies_on_your_posts,
                    status.engagement.project_status
                );
                for step in &status.next_steps {
                    debug!("Next step: {}", step);
                }
            }
            Err(e) => warn!("Failed to fetch agent status: {}", e),
        }

        match self.forum.my_project().await {
            Ok(project) => info!(
                "Project: {} | Votes: {} agent / {} human",
                project.name, project.agent_upvotes, project.human_upvotes
            ),
            Err(e) => warn!("Failed to fetch own project: {}", e),
        }
    }

    /// Generate a tweet and archive it; empty tweets are skipped
    pub(crate) async fn emit_tweet(&mut self, kind: TweetKind, context: &str) {
        let tweet = self.content.tweet(kind, context).await;
        if tweet.is_empty() {
            debug!("No {} tweet generated", kind);
            return;
        }
        let now = self.clock.now();
        self.journal.record_tweet(kind, &tweet, now).await;
    }

    async fn persist(&self) {
        if fail_open("heartbeat::save_state", || self.store.save(&self.state))
            .await
            .is_some()
        {
            debug!("State saved to {}", self.store.path().display());
        }
    }
}
