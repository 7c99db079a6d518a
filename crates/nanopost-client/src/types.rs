//! Wire types for the forum and generation APIs
//!
//! Decoding is lenient: absent fields take their default value, matching how
//! the forum omits empty counters and strings.

use nanopost_core::{CommentId, PostId, ProjectId};
use serde::{Deserialize, Serialize};

/// Sort order for the post listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSort {
    New,
    Hot,
}

impl PostSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostSort::New => "new",
            PostSort::Hot => "hot",
        }
    }
}

impl std::fmt::Display for PostSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `GET agents/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentStatus {
    pub status: String,
    pub hackathon: HackathonFlag,
    pub engagement: Engagement,
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HackathonFlag {
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Engagement {
    pub forum_post_count: u64,
    pub replies_on_your_posts: u64,
    pub project_status: String,
}

/// `GET my-project`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MyProject {
    pub name: String,
    pub agent_upvotes: i64,
    pub human_upvotes: i64,
}

/// Forum post as listed by `GET forum/posts`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub agent_name: String,
    pub title: String,
    pub body: String,
}

/// Comment as listed by `GET forum/posts/{id}/comments`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub agent_name: String,
    pub body: String,
}

/// Leaderboard row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: ProjectId,
    pub name: String,
    pub agent_upvotes: i64,
    pub human_upvotes: i64,
}

/// Project as listed by `GET projects`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectInfo {
    pub id: ProjectId,
    pub slug: String,
    pub name: String,
    pub status: String,
    pub owner_agent_name: String,
}

/// Hit from `GET forum/search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchResult {
    pub id: Option<PostId>,
    pub agent_name: String,
    pub title: String,
}

/// Body of `POST forum/posts`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

// Response envelopes

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PostsEnvelope {
    pub posts: Vec<Post>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CommentsEnvelope {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LeaderboardEnvelope {
    pub projects: Vec<LeaderboardEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ProjectsEnvelope {
    pub projects: Vec<ProjectInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SearchEnvelope {
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActiveHackathon {
    pub id: i64,
}

/// Chat-completions message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat-completions request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Chat-completions response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatChoiceMessage {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_decodes_camel_case() {
        let json = r#"{"posts":[{"id":7,"agentName":"alice","title":"Hi","body":"There","score":3}]}"#;
        let envelope: PostsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(
            envelope.posts,
            vec![Post {
                id: 7,
                agent_name: "alice".to_string(),
                title: "Hi".to_string(),
                body: "There".to_string(),
            }]
        );
    }

    #[test]
    fn test_missing_envelope_field_is_empty() {
        let envelope: CommentsEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.comments.is_empty());
    }

    #[test]
    fn test_status_decodes_nested() {
        let json = r#"{
            "status": "active",
            "hackathon": {"isActive": true},
            "engagement": {"forumPostCount": 4, "repliesOnYourPosts": 9, "projectStatus": "draft"}
        }"#;
        let status: AgentStatus = serde_json::from_str(json).unwrap();
        assert!(status.hackathon.is_active);
        assert_eq!(status.engagement.replies_on_your_posts, 9);
        assert!(status.next_steps.is_empty());
    }

    #[test]
    fn test_chat_response_without_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(response.choices.is_empty());
    }

    #[test]
    fn test_post_sort_display() {
        assert_eq!(PostSort::New.to_string(), "new");
        assert_eq!(PostSort::Hot.as_str(), "hot");
    }
}
