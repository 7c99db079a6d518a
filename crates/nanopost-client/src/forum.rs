//! Forum REST API client
//!
//! Thin typed wrapper: one method per endpoint, bearer auth, JSON in and out.
//! No retries. Transport failures, non-2xx statuses and undecodable bodies
//! all come back as errors and the caller skips that step for the heartbeat.

use crate::types::{
    ActiveHackathon, AgentStatus, Comment, CommentsEnvelope, LeaderboardEntry,
    LeaderboardEnvelope, MyProject, NewPost, Post, PostSort, PostsEnvelope, ProjectInfo,
    ProjectsEnvelope, SearchEnvelope, SearchResult,
};
use async_trait::async_trait;
use nanopost_core::{NanopostError, PostId, ProjectId, Result};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Forum operations the heartbeat relies on (allows mocking in tests)
#[async_trait]
pub trait ForumApi: Send + Sync {
    /// Agent status and engagement counters
    async fn status(&self) -> Result<AgentStatus>;

    /// The agent's own project
    async fn my_project(&self) -> Result<MyProject>;

    /// Posts listing
    async fn posts(&self, sort: PostSort, limit: usize) -> Result<Vec<Post>>;

    /// Newest comments (up to 50) on a post
    async fn comments(&self, post_id: PostId) -> Result<Vec<Comment>>;

    /// Top of the active hackathon's leaderboard
    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>>;

    /// Project listing; `include_drafts` switches to the full list
    async fn projects(&self, include_drafts: bool) -> Result<Vec<ProjectInfo>>;

    /// Forum search
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;

    /// Upvote a post
    async fn vote_post(&self, post_id: PostId) -> Result<()>;

    /// Comment on a post
    async fn comment(&self, post_id: PostId, body: &str) -> Result<()>;

    /// Create a post
    async fn create_post(&self, post: &NewPost) -> Result<()>;

    /// Upvote a project
    async fn vote_project(&self, project_id: ProjectId) -> Result<()>;
}

/// Real forum client
#[derive(Debug, Clone)]
pub struct ForumClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ForumClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NanopostError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| NanopostError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(NanopostError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        response
            .json()
            .await
            .map_err(|e| NanopostError::Decode(e.to_string()))
    }

    async fn post_json(&self, path: &str, body: Option<serde_json::Value>) -> Result<()> {
        let mut builder = self.request(Method::POST, path);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        self.send(builder).await?;
        Ok(())
    }
}

#[async_trait]
impl ForumApi for ForumClient {
    #[instrument(skip(self))]
    async fn status(&self) -> Result<AgentStatus> {
        self.get_json(self.request(Method::GET, "/agents/status"))
            .await
    }

    #[instrument(skip(self))]
    async fn my_project(&self) -> Result<MyProject> {
        self.get_json(self.request(Method::GET, "/my-project")).await
    }

    #[instrument(skip(self))]
    async fn posts(&self, sort: PostSort, limit: usize) -> Result<Vec<Post>> {
        let builder = self
            .request(Method::GET, "/forum/posts")
            .query(&[("sort", sort.as_str().to_string()), ("limit", limit.to_string())]);
        let envelope: PostsEnvelope = self.get_json(builder).await?;
        debug!("Fetched {} {} posts", envelope.posts.len(), sort);
        Ok(envelope.posts)
    }

    #[instrument(skip(self))]
    async fn comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        let builder = self
            .request(Method::GET, &format!("/forum/posts/{}/comments", post_id))
            .query(&[("sort", "new"), ("limit", "50")]);
        let envelope: CommentsEnvelope = self.get_json(builder).await?;
        Ok(envelope.comments)
    }

    #[instrument(skip(self))]
    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let hackathon: ActiveHackathon = self
            .get_json(self.request(Method::GET, "/hackathons/active"))
            .await?;
        let builder = self
            .request(
                Method::GET,
                &format!("/hackathons/{}/leaderboard", hackathon.id),
            )
            .query(&[("limit", limit.to_string())]);
        let envelope: LeaderboardEnvelope = self.get_json(builder).await?;
        Ok(envelope.projects)
    }

    #[instrument(skip(self))]
    async fn projects(&self, include_drafts: bool) -> Result<Vec<ProjectInfo>> {
        let builder = if include_drafts {
            self.request(Method::GET, "/projects")
                .query(&[("includeDrafts", "true")])
        } else {
            self.request(Method::GET, "/projects/current")
        };
        let envelope: ProjectsEnvelope = self.get_json(builder).await?;
        Ok(envelope.projects)
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let builder = self
            .request(Method::GET, "/forum/search")
            .query(&[("q", query.to_string()), ("limit", limit.to_string())]);
        let envelope: SearchEnvelope = self.get_json(builder).await?;
        Ok(envelope.results)
    }

    #[instrument(skip(self))]
    async fn vote_post(&self, post_id: PostId) -> Result<()> {
        self.post_json(
            &format!("/forum/posts/{}/vote", post_id),
            Some(serde_json::json!({ "value": 1 })),
        )
        .await
    }

    #[instrument(skip(self, body), fields(len = body.len()))]
    async fn comment(&self, post_id: PostId, body: &str) -> Result<()> {
        self.post_json(
            &format!("/forum/posts/{}/comments", post_id),
            Some(serde_json::json!({ "body": body })),
        )
        .await
    }

    #[instrument(skip(self, post), fields(title = %post.title))]
    async fn create_post(&self, post: &NewPost) -> Result<()> {
        self.post_json("/forum/posts", Some(serde_json::to_value(post)?))
            .await
    }

    #[instrument(skip(self))]
    async fn vote_project(&self, project_id: ProjectId) -> Result<()> {
        self.post_json(&format!("/projects/{}/vote", project_id), None)
            .await
    }
}

#[async_trait]
impl<T: ForumApi + ?Sized> ForumApi for Arc<T> {
    async fn status(&self) -> Result<AgentStatus> {
        (**self).status().await
    }

    async fn my_project(&self) -> Result<MyProject> {
        (**self).my_project().await
    }

    async fn posts(&self, sort: PostSort, limit: usize) -> Result<Vec<Post>> {
        (**self).posts(sort, limit).await
    }

    async fn comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        (**self).comments(post_id).await
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        (**self).leaderboard(limit).await
    }

    async fn projects(&self, include_drafts: bool) -> Result<Vec<ProjectInfo>> {
        (**self).projects(include_drafts).await
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        (**self).search(query, limit).await
    }

    async fn vote_post(&self, post_id: PostId) -> Result<()> {
        (**self).vote_post(post_id).await
    }

    async fn comment(&self, post_id: PostId, body: &str) -> Result<()> {
        (**self).comment(post_id, body).await
    }

    async fn create_post(&self, post: &NewPost) -> Result<()> {
        (**self).create_post(post).await
    }

    async fn vote_project(&self, project_id: ProjectId) -> Result<()> {
        (**self).vote_project(project_id).await
    }
}
