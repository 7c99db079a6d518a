//! Integration tests for full heartbeats.
//!
//! Each test drives real handlers against the in-memory forum and generator
//! with a fixed clock and a state file in a temp directory.

use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone, Utc};
use nanopost_bot::{Handler, Heartbeat, RoundStats};
use nanopost_client::{
    Comment, ForumCall, LeaderboardEntry, MockForum, MockGenerator, Post, PostSort, ProjectInfo,
    SearchResult,
};
use nanopost_core::{BotConfig, BotState, FixedClock, Prompts, StateStore};
use std::sync::Arc;
use tempfile::TempDir;

type TestHeartbeat = Heartbeat<Arc<MockForum>, MockGenerator, Arc<FixedClock>>;

const SELF_NAME: &str = "moltpost-agent";

fn noon_plus(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 10, 12, minute, 0).unwrap()
}

/// Noon plus `minute` on the local wall clock
fn local_noon_plus(minute: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(2026, 2, 10, 12, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

struct Harness {
    dir: TempDir,
    config: Arc<BotConfig>,
    forum: Arc<MockForum>,
    clock: Arc<FixedClock>,
}

impl Harness {
    fn new(forum: MockForum) -> Self {
        Self::with_config(forum, |_| {})
    }

    fn with_config(forum: MockForum, tweak: impl FnOnce(&mut BotConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = BotConfig::default();
        config.output.dir = dir.path().to_path_buf();
        config.bot.rate_limit_seconds = 0;
        config.bot.engage_rate_limit_seconds = 0;
        tweak(&mut config);

        Self {
            dir,
            config: Arc::new(config),
            forum: Arc::new(forum),
            clock: Arc::new(FixedClock::new(noon_plus(10))),
        }
    }

    async fn heartbeat(&self, generator: MockGenerator) -> TestHeartbeat {
        Heartbeat::load(
            self.config.clone(),
            Prompts::default(),
            self.forum.clone(),
            generator,
            self.clock.clone(),
        )
        .await
    }

    /// Heartbeat whose last progress post is "now", so progress stays quiet
    async fn quiet_heartbeat(&self, generator: MockGenerator) -> TestHeartbeat {
        let mut heartbeat = self.heartbeat(generator).await;
        heartbeat.state_mut().last_progress_post = Some(self.clock_now());
        heartbeat
    }

    fn clock_now(&self) -> DateTime<Utc> {
        use nanopost_core::Clock;
        self.clock.now()
    }

    async fn saved_state(&self) -> BotState {
        StateStore::new(self.config.output.state_path()).load().await
    }
}

fn comment(id: i64, agent: &str, body: &str) -> Comment {
    Comment {
        id,
        agent_name: agent.to_string(),
        body: body.to_string(),
    }
}

fn post(id: i64, agent: &str, title: &str, body: &str) -> Post {
    Post {
        id,
        agent_name: agent.to_string(),
        title: title.to_string(),
        body: body.to_string(),
    }
}

fn project(id: i64, owner: &str) -> ProjectInfo {
    ProjectInfo {
        id,
        slug: format!("project-{}", id),
        name: format!("Project {}", id),
        status: "submitted".to_string(),
        owner_agent_name: owner.to_string(),
    }
}

#[tokio::test]
async fn test_comment_replied_once_across_heartbeats() {
    let harness = Harness::new(MockForum::new().with_comments(vec![
        comment(1, "alice", "Love the idea"),
        comment(2, SELF_NAME, "our own note"),
    ]));
    let mut heartbeat = harness
        .quiet_heartbeat(MockGenerator::always("Thanks, alice!"))
        .await;

    let stats = heartbeat.run().await;
    assert_eq!(stats.replies, 1);
    assert_eq!(stats.replied_to, vec!["alice"]);

    heartbeat.run().await;
    assert_eq!(
        harness.forum.posted_comments(),
        vec![(186, "Thanks, alice!".to_string())]
    );
    assert!(heartbeat.state().interacted_agents.contains("alice"));
    assert!(!heartbeat.state().processed_comments.contains(&2));

    harness.forum.set_comments(vec![
        comment(1, "alice", "Love the idea"),
        comment(4, "bob", "Late to the party"),
    ]);
    let stats = heartbeat.run().await;
    assert_eq!(stats.replied_to, vec!["bob"]);
    assert_eq!(harness.forum.posted_comments().len(), 2);
}

#[tokio::test]
async fn test_failed_reply_still_marks_comment_processed() {
    let harness = Harness::new(
        MockForum::new()
            .with_comments(vec![comment(7, "bob", "hello?")])
            .failing_writes(),
    );
    let mut heartbeat = harness.quiet_heartbeat(MockGenerator::failing()).await;

    let stats = heartbeat.run().await;
    assert_eq!(stats.replies, 0);
    assert!(heartbeat.state().processed_comments.contains(&7));
    assert!(!heartbeat.state().interacted_agents.contains("bob"));

    // the fallback reply was attempted
    let attempts = harness.forum.posted_comments();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].1.contains("bob"));

    heartbeat.run().await;
    assert_eq!(harness.forum.posted_comments().len(), 1);
}

#[tokio::test]
async fn test_post_voted_at_most_once_across_restarts() {
    let harness = Harness::new(MockForum::new().with_new_posts(vec![
        post(10, "bob", "Human and AI", "a dialogue about trust"),
        post(11, "carol", "Gas fees", "nothing to see"),
        post(12, SELF_NAME, "Agent identity", "our own post"),
    ]));

    let mut first = harness.quiet_heartbeat(MockGenerator::failing()).await;
    let stats = first.run().await;
    assert_eq!(stats.post_votes, 1);
    first.run().await;
    drop(first);

    let mut restarted = harness.heartbeat(MockGenerator::failing()).await;
    assert!(restarted.state().processed_posts.contains(&10));
    restarted.run().await;

    assert_eq!(harness.forum.post_votes(), vec![10]);
}

#[tokio::test]
async fn test_progress_not_repeated_within_a_day() {
    let harness = Harness::new(MockForum::new());
    let mut heartbeat = harness
        .quiet_heartbeat(MockGenerator::always("Shipped the parser today."))
        .await;

    heartbeat.run().await;
    assert!(harness.forum.created_posts().is_empty());
}

#[tokio::test]
async fn test_progress_posted_after_a_day() {
    let harness = Harness::with_config(MockForum::new(), |config| {
        config.progress.hackathon_start_date = "2026-02-02".to_string();
    });
    let mut heartbeat = harness
        .heartbeat(MockGenerator::always("Shipped the parser today."))
        .await;
    let now = harness.clock_now();
    heartbeat.state_mut().last_progress_post = Some(now - ChronoDuration::hours(25));

    let stats = heartbeat.run().await;
    assert!(stats.progress_posted);

    let created = harness.forum.created_posts();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].title, "Moltpost Progress Update - Day 9");
    assert_eq!(created[0].body, "Shipped the parser today.");
    assert_eq!(
        created[0].tags,
        vec!["progress-update", "ai", "consumer"]
    );
    assert_eq!(heartbeat.state().last_progress_post, Some(now));
    assert_eq!(harness.saved_state().await.last_progress_post, Some(now));

    heartbeat.run().await;
    assert_eq!(harness.forum.created_posts().len(), 1);
}

#[tokio::test]
async fn test_priority_projects_voted_first() {
    let harness = Harness::with_config(
        MockForum::new()
            .with_comments(vec![comment(1, "xavier", "nice")])
            .with_projects(vec![
                project(1, "carol"),
                project(2, "xavier"),
                project(3, SELF_NAME),
                project(4, "dave"),
            ]),
        |config| config.agent.project_id = Some(3),
    );
    let mut heartbeat = harness.quiet_heartbeat(MockGenerator::always("ok")).await;

    let stats = heartbeat.run().await;
    assert_eq!(stats.project_votes, 3);
    assert_eq!(harness.forum.project_votes(), vec![2, 1, 4]);

    heartbeat.run().await;
    assert_eq!(harness.forum.project_votes().len(), 3);
}

#[tokio::test]
async fn test_failed_project_vote_retried_next_heartbeat() {
    let harness = Harness::new(
        MockForum::new()
            .with_projects(vec![project(5, "erin")])
            .with_failing_project_vote(5),
    );
    let mut heartbeat = harness.quiet_heartbeat(MockGenerator::failing()).await;

    heartbeat.run().await;
    assert!(!heartbeat.state().voted_projects.contains(&5));
    heartbeat.run().await;
    assert_eq!(harness.forum.project_votes(), vec![5, 5]);
}

#[tokio::test]
async fn test_project_voting_can_be_disabled() {
    let harness = Harness::with_config(
        MockForum::new().with_projects(vec![project(5, "erin")]),
        |config| config.bot.vote_projects = false,
    );
    let mut heartbeat = harness.quiet_heartbeat(MockGenerator::failing()).await;

    heartbeat.run().await;
    assert!(!Handler::VoteProjects.is_enabled(heartbeat.config()));
    assert!(harness
        .forum
        .calls()
        .iter()
        .all(|c| !matches!(c, ForumCall::Projects { .. })));
}

#[tokio::test]
async fn test_engagement_capped_and_windowed() {
    let hot = vec![
        post(23, "ivy", "Four", "social graphs"),
        post(20, "fay", "One", "what makes an agent an agent"),
        post(21, "gus", "Two", "human in the loop"),
        post(22, "hal", "Three", "identity on chain"),
    ];
    let harness = Harness::new(MockForum::new().with_hot_posts(hot));
    let mut heartbeat = harness
        .quiet_heartbeat(MockGenerator::always("Great point about this."))
        .await;

    harness.clock.set(local_noon_plus(45));
    heartbeat.run().await;
    assert!(!harness
        .forum
        .calls()
        .contains(&ForumCall::Posts {
            sort: PostSort::Hot,
            limit: 10
        }));

    harness.clock.set(local_noon_plus(5));
    let stats = heartbeat.run().await;
    assert_eq!(stats.engagements, 2);
    assert_eq!(stats.engaged_with, vec!["fay", "gus"]);

    let engaged: Vec<i64> = harness
        .forum
        .posted_comments()
        .into_iter()
        .map(|(post_id, _)| post_id)
        .collect();
    assert_eq!(engaged, vec![20, 21]);
    assert!(heartbeat.state().interacted_agents.contains("gus"));
    // "social" is not among the first four keywords
    assert!(!heartbeat.state().processed_posts.contains(&23));
    // cap reached before the last match
    assert!(!heartbeat.state().processed_posts.contains(&22));
}

#[tokio::test]
async fn test_topic_rotation_and_post_interval() {
    let harness = Harness::with_config(MockForum::new(), |config| {
        config.posting.enabled = true;
        config.posting.topics = vec![
            "alpha".to_string(),
            "beta".to_string(),
            "gamma".to_string(),
        ];
    });
    let mut heartbeat = harness
        .quiet_heartbeat(MockGenerator::always(
            "TITLE: Fresh thoughts\nBODY: Something new.\nTAGS: ai",
        ))
        .await;
    heartbeat.state_mut().topic_index = 2;

    let stats = heartbeat.run().await;
    assert!(stats.new_post_posted);
    assert_eq!(heartbeat.state().topic_index, 3);
    let prompts = heartbeat.content().generator().prompts();
    assert!(prompts.iter().any(|p| p.contains("gamma")));

    // inside the posting interval
    heartbeat.run().await;
    assert_eq!(harness.forum.created_posts().len(), 1);
    assert_eq!(heartbeat.state().topic_index, 3);

    harness.clock.advance(ChronoDuration::minutes(31));
    heartbeat.run().await;
    assert_eq!(heartbeat.state().topic_index, 4);
    let prompts = heartbeat.content().generator().prompts();
    assert!(prompts.iter().any(|p| p.contains("alpha")));

    let created = harness.forum.created_posts();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].title, "Fresh thoughts");
    assert_eq!(created[0].tags, vec!["ai"]);
}

#[tokio::test]
async fn test_posting_disabled_is_noop() {
    let harness = Harness::with_config(MockForum::new(), |config| {
        config.posting.topics = vec!["alpha".to_string()];
    });
    let mut heartbeat = harness
        .quiet_heartbeat(MockGenerator::always("TITLE: t\nBODY: b"))
        .await;

    heartbeat.run().await;
    assert!(harness.forum.created_posts().is_empty());
    assert_eq!(heartbeat.state().topic_index, 0);
}

#[tokio::test]
async fn test_leaderboard_rank_recorded() {
    let entries = vec![
        LeaderboardEntry {
            id: 1,
            name: "Other".to_string(),
            ..Default::default()
        },
        LeaderboardEntry {
            id: 2,
            name: "MoltPost Social".to_string(),
            ..Default::default()
        },
    ];
    let harness = Harness::new(MockForum::new().with_leaderboard(entries));
    let mut heartbeat = harness.quiet_heartbeat(MockGenerator::failing()).await;

    let stats = heartbeat.run().await;
    assert_eq!(stats.leaderboard_rank, Some(2));
}

#[tokio::test]
async fn test_leaderboard_rank_takes_last_match() {
    let entries = ["MoltPost Classic", "Other", "MoltPost Social"]
        .iter()
        .enumerate()
        .map(|(i, name)| LeaderboardEntry {
            id: i as i64 + 1,
            name: name.to_string(),
            ..Default::default()
        })
        .collect();
    let harness = Harness::new(MockForum::new().with_leaderboard(entries));
    let mut heartbeat = harness.quiet_heartbeat(MockGenerator::failing()).await;

    let stats = heartbeat.run().await;
    assert_eq!(stats.leaderboard_rank, Some(3));
}

#[tokio::test]
async fn test_mentions_searched_without_touching_state() {
    let hits = vec![
        SearchResult {
            id: Some(40),
            agent_name: "kim".to_string(),
            title: "Has anyone tried moltpost?".to_string(),
        },
        SearchResult {
            id: None,
            agent_name: "lee".to_string(),
            title: "moltpost weekly".to_string(),
        },
    ];
    let harness = Harness::new(MockForum::new().with_search_results(hits));
    let mut heartbeat = harness.quiet_heartbeat(MockGenerator::failing()).await;
    let before = heartbeat.state().clone();

    let stats = heartbeat.run().await;
    assert_eq!(stats, RoundStats::default());
    assert!(heartbeat
        .forum()
        .calls()
        .contains(&ForumCall::Search("moltpost".to_string())));
    assert!(heartbeat.forum().writes().is_empty());
    assert_eq!(heartbeat.state(), &before);
}

#[tokio::test]
async fn test_failing_reads_never_abort_heartbeat() {
    let harness = Harness::new(MockForum::new().failing_reads());
    let mut heartbeat = harness.quiet_heartbeat(MockGenerator::failing()).await;

    let stats = heartbeat.run().await;
    assert_eq!(stats, RoundStats::default());
    assert!(harness.config.output.state_path().exists());
    assert!(harness.saved_state().await.processed_posts.is_empty());
}

#[tokio::test]
async fn test_unwritable_state_file_still_completes_heartbeat() {
    let blocker = TempDir::new().unwrap();
    let regular_file = blocker.path().join("not-a-dir");
    std::fs::write(&regular_file, "plain file").unwrap();

    let harness = Harness::with_config(
        MockForum::new().with_comments(vec![comment(5, "mia", "following along")]),
        |config| {
            config.output.state_file = regular_file
                .join("nanopost_state.json")
                .to_string_lossy()
                .into_owned();
        },
    );
    let mut heartbeat = harness
        .quiet_heartbeat(MockGenerator::always("Thanks, mia!"))
        .await;

    let stats = heartbeat.run().await;
    assert_eq!(stats.replies, 1);
    assert!(heartbeat.state().processed_comments.contains(&5));
    assert!(!harness.config.output.state_path().exists());

    let today = harness.clock_now().with_timezone(&Local).date_naive();
    let summary = std::fs::read_to_string(harness.config.output.summary_path(today)).unwrap();
    assert!(summary.contains("@mia"));
}

#[tokio::test]
async fn test_tweets_and_summary_written() {
    let harness = Harness::new(
        MockForum::new().with_comments(vec![comment(3, "judy", "cool project")]),
    );
    let mut heartbeat = harness
        .quiet_heartbeat(MockGenerator::always("A short tweet."))
        .await;

    heartbeat.run().await;
    assert_eq!(heartbeat.tweet_count(), 1);

    let today = harness.clock_now().with_timezone(&Local).date_naive();
    let tweets = std::fs::read_to_string(harness.config.output.tweet_path(today)).unwrap();
    assert!(tweets.contains("A short tweet."));
    let summary = std::fs::read_to_string(harness.config.output.summary_path(today)).unwrap();
    assert!(summary.contains("| Replies | 1 | @judy |"));
    assert!(harness.dir.path().join("nanopost_state.json").exists());
}
