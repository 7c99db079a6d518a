//! Dated markdown side channels: the tweet archive and the round summary
//!
//! Both files are append-only and never read back. Every write is
//! fail-open: a full disk or a missing directory costs a log line, never a
//! heartbeat.

use crate::content::TweetKind;
use crate::stats::RoundStats;
use chrono::{DateTime, Local, Utc};
use nanopost_core::config::OutputConfig;
use nanopost_core::fail_open::fail_open;
use nanopost_core::Result;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Appends tweets and round summaries to per-day files
#[derive(Debug)]
pub struct Journal {
    output: OutputConfig,
    tweet_count: usize,
}

impl Journal {
    pub fn new(output: OutputConfig) -> Self {
        Self {
            output,
            tweet_count: 0,
        }
    }

    /// Tweets archived since startup
    pub fn tweet_count(&self) -> usize {
        self.tweet_count
    }

    /// Archive one generated tweet
    ///
    /// The sequence number advances only when the write succeeds.
    pub async fn record_tweet(&mut self, kind: TweetKind, tweet: &str, now: DateTime<Utc>) {
        let local = now.with_timezone(&Local);
        let path = self.output.tweet_path(local.date_naive());
        let entry = format!(
            "\n---\n\n### Tweet #{} ({}) - {}\n\n{}\n",
            self.tweet_count + 1,
            local.format("%H:%M"),
            kind,
            tweet
        );

        if fail_open("journal::record_tweet", || append(&path, &entry))
            .await
            .is_some()
        {
            self.tweet_count += 1;
            debug!("Archived tweet #{} to {}", self.tweet_count, path.display());
        }
    }

    /// Append the heartbeat's summary table
    pub async fn record_summary(&self, stats: &RoundStats, now: DateTime<Utc>) {
        let local = now.with_timezone(&Local);
        let path = self.output.summary_path(local.date_naive());
        let entry = stats.to_markdown(local.time());

        fail_open("journal::record_summary", || append(&path, &entry)).await;
    }
}

async fn append(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn journal_in(dir: &Path) -> Journal {
        Journal::new(OutputConfig {
            dir: dir.to_path_buf(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_tweets_numbered_and_appended() {
        let temp = TempDir::new().unwrap();
        let mut journal = journal_in(temp.path());
        let now = Utc::now();

        journal.record_tweet(TweetKind::Reply, "first", now).await;
        journal.record_tweet(TweetKind::Voting, "second", now).await;
        assert_eq!(journal.tweet_count(), 2);

        let path = journal
            .output
            .tweet_path(now.with_timezone(&Local).date_naive());
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("### Tweet #1"));
        assert!(content.contains("- Reply\n\nfirst"));
        assert!(content.contains("### Tweet #2"));
        assert!(content.contains("- Voting\n\nsecond"));
    }

    #[tokio::test]
    async fn test_summary_appended() {
        let temp = TempDir::new().unwrap();
        let journal = journal_in(&temp.path().join("nested"));
        let now = Utc::now();
        let stats = RoundStats {
            post_votes: 3,
            ..Default::default()
        };

        journal.record_summary(&stats, now).await;
        journal.record_summary(&RoundStats::default(), now).await;

        let path = journal
            .output
            .summary_path(now.with_timezone(&Local).date_naive());
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.matches("## Round at").count(), 2);
        assert!(content.contains("| Post votes | 3 | - |"));
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_fail_open() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "not a dir").unwrap();

        let mut journal = journal_in(&blocker);
        journal
            .record_tweet(TweetKind::Progress, "lost", Utc::now())
            .await;
        assert_eq!(journal.tweet_count(), 0);
    }
}
