//! Action handlers
//!
//! Each handler runs once per heartbeat. A failed read returns `Err` and
//! ends that handler's work for the heartbeat; failed writes are logged per
//! item and the handler moves on.
//!
//! Order matters: replies run before project voting so that agents we just
//! talked to are already in `interacted_agents` when voting prioritizes.

use crate::content::TweetKind;
use crate::heartbeat::Heartbeat;
use crate::template::render_template;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Timelike, Utc};
use nanopost_client::{ForumApi, NewPost, PostSort, TextGenerator};
use nanopost_core::{truncate_chars, BotConfig, BotState, Clock, Result};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

const DISCOVER_LIMIT: usize = 20;
const HOT_LIMIT: usize = 10;
const MENTION_LIMIT: usize = 20;
const LEADERBOARD_LIMIT: usize = 10;

/// Engagement only matches against the first few keywords
const ENGAGE_KEYWORDS: usize = 4;

/// One named behavior of the heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    CheckComments,
    DiscoverAndVote,
    VoteProjects,
    EngageWithPosts,
    CheckMentions,
    CheckLeaderboard,
    PostNew,
    PostProgress,
}

impl Handler {
    /// Execution order within a heartbeat
    pub const ORDER: [Handler; 8] = [
        Handler::CheckComments,
        Handler::DiscoverAndVote,
        Handler::VoteProjects,
        Handler::EngageWithPosts,
        Handler::CheckMentions,
        Handler::CheckLeaderboard,
        Handler::PostNew,
        Handler::PostProgress,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Handler::CheckComments => "check_comments",
            Handler::DiscoverAndVote => "discover_and_vote",
            Handler::VoteProjects => "vote_projects",
            Handler::EngageWithPosts => "engage_with_posts",
            Handler::CheckMentions => "check_mentions",
            Handler::CheckLeaderboard => "check_leaderboard",
            Handler::PostNew => "post_new",
            Handler::PostProgress => "post_progress",
        }
    }

    /// Whether configuration lets this handler run at all
    ///
    /// `PostNew` stays enabled and gates itself so that its skip is logged.
    pub fn is_enabled(&self, config: &BotConfig) -> bool {
        match self {
            Handler::VoteProjects => config.bot.vote_projects,
            _ => true,
        }
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Case-insensitive substring match against any non-empty keyword
pub fn matches_any_keyword<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    let haystack = text.to_lowercase();
    keywords.iter().any(|kw| {
        let kw = kw.as_ref().trim();
        !kw.is_empty() && haystack.contains(&kw.to_lowercase())
    })
}

/// Minute of the hour on the wall clock of `tz`
pub fn wall_clock_minute<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> u32 {
    now.with_timezone(tz).minute()
}

/// Days since the hackathon started, counting the first day as 1
pub fn progress_day(start: Option<NaiveDate>, now: DateTime<Utc>) -> i64 {
    let start = start
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight));

    match start {
        Some(start) => (now.signed_duration_since(start).num_days() + 1).max(1),
        None => {
            warn!("Hackathon start date missing or invalid, reporting day 1");
            1
        }
    }
}

async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

impl<F, G, C> Heartbeat<F, G, C>
where
    F: ForumApi,
    G: TextGenerator,
    C: Clock,
{
    /// Reply to new comments on the home post
    pub(crate) async fn check_comments(&mut self) -> Result<()> {
        info!("Checking for new comments");
        let post_id = self.config.agent.post_id;
        let comments = self.forum.comments(post_id).await?;

        for comment in comments {
            if comment.agent_name == self.config.agent.name
                || self.state.processed_comments.contains(&comment.id)
            {
                continue;
            }

            info!(
                "New comment from @{}: {}",
                comment.agent_name,
                truncate_chars(&comment.body, 80)
            );
            let reply = self.content.reply(&comment.agent_name, &comment.body).await;

            match self.forum.comment(post_id, &reply).await {
                Ok(()) => {
                    info!("Replied to @{}", comment.agent_name);
                    self.stats.record_reply(&comment.agent_name);
                    self.state
                        .interacted_agents
                        .insert(comment.agent_name.clone());
                    self.emit_tweet(
                        TweetKind::Reply,
                        &format!("Replied to @{} on our post", comment.agent_name),
                    )
                    .await;
                }
                Err(e) => warn!("Failed to reply to comment #{}: {}", comment.id, e),
            }

            self.state.processed_comments.insert(comment.id);
            pace(self.config.rate_limit()).await;
        }
        Ok(())
    }

    /// Upvote new posts that match a keyword
    pub(crate) async fn discover_and_vote(&mut self) -> Result<()> {
        info!("Discovering posts to vote on");
        let posts = self.forum.posts(PostSort::New, DISCOVER_LIMIT).await?;
        let mut voted = 0;

        for post in posts {
            if post.agent_name == self.config.agent.name
                || self.state.processed_posts.contains(&post.id)
            {
                continue;
            }
            let text = format!("{} {}", post.title, post.body);
            if !matches_any_keyword(&text, &self.config.bot.keywords) {
                continue;
            }

            info!(
                "Relevant post #{}: {} by @{}",
                post.id,
                truncate_chars(&post.title, 50),
                post.agent_name
            );
            match self.forum.vote_post(post.id).await {
                Ok(()) => voted += 1,
                Err(e) => warn!("Failed to vote on post #{}: {}", post.id, e),
            }
            self.state.processed_posts.insert(post.id);
        }

        self.stats.post_votes = voted;
        if voted > 0 {
            info!("Voted on {} posts", voted);
            self.emit_tweet(
                TweetKind::Voting,
                &format!("Supported {} posts from fellow builders", voted),
            )
            .await;
        }
        Ok(())
    }

    /// Upvote projects, owners we have talked to first
    pub(crate) async fn vote_projects(&mut self) -> Result<()> {
        info!("Voting on projects");
        let projects = self.forum.projects(true).await?;
        let own = self.config.agent.project_id;

        let (priority, others): (Vec<_>, Vec<_>) = projects
            .into_iter()
            .filter(|p| Some(p.id) != own && !self.state.voted_projects.contains(&p.id))
            .partition(|p| self.state.interacted_agents.contains(&p.owner_agent_name));

        let priority_count = priority.len();
        let queue = priority
            .into_iter()
            .map(|p| (p, true))
            .chain(others.into_iter().map(|p| (p, false)));

        let mut voted = 0;
        for (project, is_priority) in queue {
            // listings can repeat a project
            if self.state.voted_projects.contains(&project.id) {
                continue;
            }
            match self.forum.vote_project(project.id).await {
                Ok(()) => {
                    if is_priority {
                        info!(
                            "Voted for {} (priority, @{})",
                            project.name, project.owner_agent_name
                        );
                    } else {
                        info!("Voted for {}", project.name);
                    }
                    voted += 1;
                    self.state.voted_projects.insert(project.id);
                    pace(self.config.rate_limit()).await;
                }
                Err(e) => warn!("Failed to vote for project #{}: {}", project.id, e),
            }
        }

        info!(
            "Voted for {} projects ({} priority candidates)",
            voted, priority_count
        );
        self.stats.project_votes = voted;
        Ok(())
    }

    /// Comment on hot posts during the engagement window
    pub(crate) async fn engage_with_posts(&mut self) -> Result<()> {
        let minute = wall_clock_minute(self.clock.now(), &Local);
        if minute >= self.config.bot.engage_window_minutes {
            debug!("Minute {} is outside the engagement window", minute);
            return Ok(());
        }

        info!("Engaging with hot posts");
        let posts = self.forum.posts(PostSort::Hot, HOT_LIMIT).await?;
        let keywords: Vec<String> = self
            .config
            .bot
            .keywords
            .iter()
            .take(ENGAGE_KEYWORDS)
            .cloned()
            .collect();
        let max = self.config.bot.max_engagements_per_cycle;
        let mut engaged = 0;

        for post in posts {
            if engaged >= max {
                break;
            }
            if post.agent_name == self.config.agent.name
                || self.state.processed_posts.contains(&post.id)
                || !matches_any_keyword(&post.body, &keywords)
            {
                continue;
            }

            info!(
                "Engaging with #{}: {}",
                post.id,
                truncate_chars(&post.title, 50)
            );
            let comment = self.content.comment(&post).await;
            if comment.is_empty() {
                warn!("No comment generated for post #{}", post.id);
            } else {
                match self.forum.comment(post.id, &comment).await {
                    Ok(()) => {
                        engaged += 1;
                        self.stats.record_engagement(&post.agent_name);
                        self.state
                            .interacted_agents
                            .insert(post.agent_name.clone());
                        self.emit_tweet(
                            TweetKind::Engagement,
                            &format!("Joined a conversation with @{}", post.agent_name),
                        )
                        .await;
                    }
                    Err(e) => warn!("Failed to comment on post #{}: {}", post.id, e),
                }
            }

            self.state.processed_posts.insert(post.id);
            pace(self.config.engage_rate_limit()).await;
        }
        Ok(())
    }

    /// Count forum mentions of the agent
    pub(crate) async fn check_mentions(&mut self) -> Result<()> {
        let keyword = &self.config.agent.mention_keyword;
        let results = self.forum.search(keyword, MENTION_LIMIT).await?;
        if results.is_empty() {
            info!("No mentions of {:?}", keyword);
        } else {
            info!("Found {} mentions of {:?}", results.len(), keyword);
        }
        Ok(())
    }

    /// Record the home project's leaderboard rank, if listed
    ///
    /// When several entries match the marker, the lowest-ranked one counts.
    pub(crate) async fn check_leaderboard(&mut self) -> Result<()> {
        let marker = self.config.agent.project_marker.trim().to_lowercase();
        if marker.is_empty() {
            debug!("No project marker configured");
            return Ok(());
        }

        let entries = self.forum.leaderboard(LEADERBOARD_LIMIT).await?;
        match entries
            .iter()
            .rposition(|entry| entry.name.to_lowercase().contains(&marker))
        {
            Some(index) => {
                let entry = &entries[index];
                info!(
                    "Leaderboard rank #{}: {} ({} agent / {} human votes)",
                    index + 1,
                    entry.name,
                    entry.agent_upvotes,
                    entry.human_upvotes
                );
                self.stats.leaderboard_rank = Some(index + 1);
            }
            None => info!("Not in the top {} yet", LEADERBOARD_LIMIT),
        }
        Ok(())
    }

    /// Publish a generated post on the next topic
    pub(crate) async fn post_new(&mut self) -> Result<()> {
        if !self.config.posting.enabled {
            debug!("New-content posting disabled");
            return Ok(());
        }

        let now = self.clock.now();
        let interval = self.config.post_interval();
        if !BotState::elapsed_since(self.state.last_new_post, now, interval) {
            if let Some(last) = self.state.last_new_post {
                let remaining = interval - now.signed_duration_since(last);
                info!(
                    "Next new post in {} minutes",
                    remaining.num_minutes().max(1)
                );
            }
            return Ok(());
        }

        let Some(topic) = self.state.next_topic(&self.config.posting.topics) else {
            warn!("Posting enabled but no topics configured");
            return Ok(());
        };
        info!("Writing a new post on {:?}", topic);

        let Some(post) = self.content.new_post_content(&topic).await else {
            warn!("Nothing to post on {:?}", topic);
            return Ok(());
        };

        match self.forum.create_post(&post).await {
            Ok(()) => {
                info!("Published: {}", post.title);
                self.state.last_new_post = Some(now);
                self.stats.new_post_posted = true;
                self.emit_tweet(TweetKind::NewPost, &format!("New post: {}", post.title))
                    .await;
            }
            Err(e) => warn!("Failed to publish new post: {}", e),
        }
        Ok(())
    }

    /// Publish the daily progress update
    pub(crate) async fn post_progress(&mut self) -> Result<()> {
        let now = self.clock.now();
        if !BotState::elapsed_since(self.state.last_progress_post, now, chrono::Duration::hours(24))
        {
            debug!("Progress update already posted within 24h");
            return Ok(());
        }

        info!("Posting progress update");
        let body = self.content.progress_update().await;
        if body.is_empty() {
            warn!("No progress update generated");
            return Ok(());
        }

        let day = progress_day(self.config.hackathon_start(), now);
        let day_label = day.to_string();
        let title = render_template(
            &self.config.progress.title_template,
            &[("day", day_label.as_str())],
        );
        let post = NewPost {
            title,
            body,
            tags: self.config.progress.post_tags.clone(),
        };

        match self.forum.create_post(&post).await {
            Ok(()) => {
                info!("Progress update published: {}", post.title);
                self.state.last_progress_post = Some(now);
                self.stats.progress_posted = true;
                self.emit_tweet(TweetKind::Progress, &format!("Day {} progress update", day))
                    .await;
            }
            Err(e) => warn!("Failed to publish progress update: {}", e),
        }
        Ok(())
    }
}
