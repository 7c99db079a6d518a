//! In-memory collaborators for tests
//!
//! [`MockForum`] serves canned listings and records every call;
//! [`MockGenerator`] replays queued completions and records every prompt.

use crate::forum::ForumApi;
use crate::generation::TextGenerator;
use crate::types::{
    AgentStatus, Comment, LeaderboardEntry, MyProject, NewPost, Post, PostSort, ProjectInfo,
    SearchResult,
};
use async_trait::async_trait;
use nanopost_core::{NanopostError, PostId, ProjectId, Result};
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// One recorded forum call
#[derive(Debug, Clone, PartialEq)]
pub enum ForumCall {
    Status,
    MyProject,
    Posts { sort: PostSort, limit: usize },
    Comments(PostId),
    Leaderboard,
    Projects { include_drafts: bool },
    Search(String),
    VotePost(PostId),
    Comment { post_id: PostId, body: String },
    CreatePost(NewPost),
    VoteProject(ProjectId),
}

impl ForumCall {
    /// Whether this call mutates forum state
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            ForumCall::VotePost(_)
                | ForumCall::Comment { .. }
                | ForumCall::CreatePost(_)
                | ForumCall::VoteProject(_)
        )
    }
}

#[derive(Debug, Default)]
struct ForumData {
    new_posts: Vec<Post>,
    hot_posts: Vec<Post>,
    comments: Vec<Comment>,
    projects: Vec<ProjectInfo>,
    leaderboard: Vec<LeaderboardEntry>,
    search_results: Vec<SearchResult>,
    fail_reads: bool,
    fail_writes: bool,
    failing_projects: BTreeSet<ProjectId>,
}

/// Mock forum for testing
#[derive(Debug, Default)]
pub struct MockForum {
    data: Mutex<ForumData>,
    calls: Mutex<Vec<ForumCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockForum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_new_posts(self, posts: Vec<Post>) -> Self {
        lock(&self.data).new_posts = posts;
        self
    }

    pub fn with_hot_posts(self, posts: Vec<Post>) -> Self {
        lock(&self.data).hot_posts = posts;
        self
    }

    pub fn with_comments(self, comments: Vec<Comment>) -> Self {
        self.set_comments(comments);
        self
    }

    pub fn with_projects(self, projects: Vec<ProjectInfo>) -> Self {
        lock(&self.data).projects = projects;
        self
    }

    pub fn with_leaderboard(self, entries: Vec<LeaderboardEntry>) -> Self {
        lock(&self.data).leaderboard = entries;
        self
    }

    pub fn with_search_results(self, results: Vec<SearchResult>) -> Self {
        lock(&self.data).search_results = results;
        self
    }

    /// Every read fails with a transport error
    pub fn failing_reads(self) -> Self {
        lock(&self.data).fail_reads = true;
        self
    }

    /// Every write fails with a 500
    pub fn failing_writes(self) -> Self {
        lock(&self.data).fail_writes = true;
        self
    }

    /// Votes for this project fail with a 500
    pub fn with_failing_project_vote(self, project_id: ProjectId) -> Self {
        lock(&self.data).failing_projects.insert(project_id);
        self
    }

    /// Replace the comments on the home post (between heartbeats)
    pub fn set_comments(&self, comments: Vec<Comment>) {
        lock(&self.data).comments = comments;
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<ForumCall> {
        lock(&self.calls).clone()
    }

    /// Recorded write calls, in order
    pub fn writes(&self) -> Vec<ForumCall> {
        self.calls().into_iter().filter(ForumCall::is_write).collect()
    }

    pub fn post_votes(&self) -> Vec<PostId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ForumCall::VotePost(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn posted_comments(&self) -> Vec<(PostId, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ForumCall::Comment { post_id, body } => Some((post_id, body)),
                _ => None,
            })
            .collect()
    }

    pub fn created_posts(&self) -> Vec<NewPost> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ForumCall::CreatePost(post) => Some(post),
                _ => None,
            })
            .collect()
    }

    pub fn project_votes(&self) -> Vec<ProjectId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ForumCall::VoteProject(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ForumCall) {
        lock(&self.calls).push(call);
    }

    fn read<T>(&self, call: ForumCall, pick: impl FnOnce(&ForumData) -> T) -> Result<T> {
        self.record(call);
        let data = lock(&self.data);
        if data.fail_reads {
            return Err(NanopostError::Transport("mock read failure".to_string()));
        }
        Ok(pick(&data))
    }

    fn write(&self, call: ForumCall) -> Result<()> {
        let fails = {
            let data = lock(&self.data);
            data.fail_writes
                || matches!(call, ForumCall::VoteProject(id) if data.failing_projects.contains(&id))
        };
        self.record(call);
        if fails {
            return Err(NanopostError::Api {
                status: 500,
                body: "mock write failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ForumApi for MockForum {
    async fn status(&self) -> Result<AgentStatus> {
        self.read(ForumCall::Status, |_| AgentStatus::default())
    }

    async fn my_project(&self) -> Result<MyProject> {
        self.read(ForumCall::MyProject, |_| MyProject::default())
    }

    async fn posts(&self, sort: PostSort, limit: usize) -> Result<Vec<Post>> {
        self.read(ForumCall::Posts { sort, limit }, |data| {
            let posts = match sort {
                PostSort::New => &data.new_posts,
                PostSort::Hot => &data.hot_posts,
            };
            posts.iter().take(limit).cloned().collect()
        })
    }

    async fn comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        self.read(ForumCall::Comments(post_id), |data| data.comments.clone())
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        self.read(ForumCall::Leaderboard, |data| {
            data.leaderboard.iter().take(limit).cloned().collect()
        })
    }

    async fn projects(&self, include_drafts: bool) -> Result<Vec<ProjectInfo>> {
        self.read(ForumCall::Projects { include_drafts }, |data| {
            data.projects.clone()
        })
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        self.read(ForumCall::Search(query.to_string()), |data| {
            data.search_results.iter().take(limit).cloned().collect()
        })
    }

    async fn vote_post(&self, post_id: PostId) -> Result<()> {
        self.write(ForumCall::VotePost(post_id))
    }

    async fn comment(&self, post_id: PostId, body: &str) -> Result<()> {
        self.write(ForumCall::Comment {
            post_id,
            body: body.to_string(),
        })
    }

    async fn create_post(&self, post: &NewPost) -> Result<()> {
        self.write(ForumCall::CreatePost(post.clone()))
    }

    async fn vote_project(&self, project_id: ProjectId) -> Result<()> {
        self.write(ForumCall::VoteProject(project_id))
    }
}

/// Mock generation backend for testing
///
/// Queued responses are consumed first; once the queue is empty every call
/// gets the default response. `None` means the call fails with
/// [`NanopostError::EmptyResponse`].
#[derive(Debug, Default)]
pub struct MockGenerator {
    queued: Mutex<VecDeque<Option<String>>>,
    default: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Every call fails
    pub fn failing() -> Self {
        Self::default()
    }

    /// Every call returns `text`
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            default: Some(text.into()),
            ..Self::default()
        }
    }

    /// Queue one successful response
    pub fn then(self, text: impl Into<String>) -> Self {
        lock(&self.queued).push_back(Some(text.into()));
        self
    }

    /// Queue one failure
    pub fn then_fail(self) -> Self {
        lock(&self.queued).push_back(None);
        self
    }

    /// User prompts received so far, in order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        lock(&self.prompts).push(user_prompt.to_string());
        let next = lock(&self.queued)
            .pop_front()
            .unwrap_or_else(|| self.default.clone());
        next.ok_or(NanopostError::EmptyResponse)
    }
}
