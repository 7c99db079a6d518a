//! Persisted agent state
//!
//! Dedup sets, posting timestamps and the topic cursor. Loaded once at
//! startup, mutated in memory by the handlers during a heartbeat and written
//! back in full at the end of every heartbeat.
//!
//! An id that enters a dedup set is never acted on again by the matching
//! handler, for as long as this file survives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{CommentId, NanopostError, PostId, ProjectId, Result};

/// Everything the agent remembers between heartbeats
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotState {
    /// Comments already replied to (or permanently skipped)
    pub processed_comments: BTreeSet<CommentId>,

    /// Posts already voted on or engaged with
    pub processed_posts: BTreeSet<PostId>,

    /// Projects already upvoted
    pub voted_projects: BTreeSet<ProjectId>,

    /// Agents we replied to or commented on; their projects get voted first
    pub interacted_agents: BTreeSet<String>,

    /// Last successful progress post
    pub last_progress_post: Option<DateTime<Utc>>,

    /// Last successful new-content post
    pub last_new_post: Option<DateTime<Utc>>,

    /// Cursor into the configured topic list
    pub topic_index: usize,
}

impl BotState {
    /// Pick the topic under the cursor and advance it
    ///
    /// Returns `None` when no topics are configured; the cursor is left alone
    /// in that case.
    pub fn next_topic(&mut self, topics: &[String]) -> Option<String> {
        if topics.is_empty() {
            return None;
        }
        let topic = topics[self.topic_index % topics.len()].clone();
        self.topic_index += 1;
        Some(topic)
    }

    /// Whether at least `gap` has passed since `last` (never counts as elapsed)
    pub fn elapsed_since(
        last: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        gap: chrono::Duration,
    ) -> bool {
        match last {
            Some(at) => now.signed_duration_since(at) >= gap,
            None => true,
        }
    }
}

/// JSON file holding a [`BotState`]
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state, never failing
    ///
    /// A missing file yields an empty state; an unreadable or malformed one
    /// yields an empty state and a warning.
    pub async fn load(&self) -> BotState {
        match self.try_load().await {
            Ok(Some(state)) => {
                debug!(
                    "Loaded state from {} ({} comments, {} posts, {} projects)",
                    self.path.display(),
                    state.processed_comments.len(),
                    state.processed_posts.len(),
                    state.voted_projects.len()
                );
                state
            }
            Ok(None) => {
                debug!("No state file at {}, starting fresh", self.path.display());
                BotState::default()
            }
            Err(e) => {
                warn!("Ignoring state file {}: {}", self.path.display(), e);
                BotState::default()
            }
        }
    }

    async fn try_load(&self) -> Result<Option<BotState>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Overwrite the state file with `state`
    pub async fn save(&self, state: &BotState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(&self.path, json).await.map_err(|e| {
            NanopostError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write {}: {}", self.path.display(), e),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn topics(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_next_topic_rotates_and_wraps() {
        let list = topics(&["a", "b", "c"]);
        let mut state = BotState {
            topic_index: 2,
            ..Default::default()
        };

        assert_eq!(state.next_topic(&list).as_deref(), Some("c"));
        assert_eq!(state.topic_index, 3);
        assert_eq!(state.next_topic(&list).as_deref(), Some("a"));
        assert_eq!(state.topic_index, 4);
    }

    #[test]
    fn test_next_topic_without_topics() {
        let mut state = BotState::default();
        assert_eq!(state.next_topic(&[]), None);
        assert_eq!(state.topic_index, 0);
    }

    #[test]
    fn test_elapsed_since() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let day = chrono::Duration::hours(24);

        assert!(BotState::elapsed_since(None, now, day));
        assert!(!BotState::elapsed_since(Some(now), now, day));
        assert!(!BotState::elapsed_since(
            Some(now - chrono::Duration::hours(23)),
            now,
            day
        ));
        assert!(BotState::elapsed_since(
            Some(now - chrono::Duration::hours(25)),
            now,
            day
        ));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().await, BotState::default());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = StateStore::new(&path);
        assert_eq!(store.load().await, BotState::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("nested/state.json"));

        let mut state = BotState::default();
        state.processed_comments.extend([3, 1, 2]);
        state.processed_posts.insert(10);
        state.voted_projects.insert(7);
        state.interacted_agents.insert("alice".to_string());
        state.last_progress_post = Some(Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap());
        state.topic_index = 5;

        store.save(&state).await.unwrap();
        assert_eq!(store.load().await, state);
    }

    #[tokio::test]
    async fn test_sets_serialize_as_sequences() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut state = BotState::default();
        state.processed_comments.extend([5, 4]);
        store.save(&state).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["processed_comments"], serde_json::json!([4, 5]));
        assert_eq!(raw["topic_index"], serde_json::json!(0));
    }

    #[tokio::test]
    async fn test_partial_file_loads_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"processed_posts": [9, 9, 8]}"#).unwrap();

        let state = StateStore::new(&path).load().await;
        assert_eq!(state.processed_posts.len(), 2);
        assert!(state.processed_comments.is_empty());
        assert_eq!(state.last_new_post, None);
    }
}
