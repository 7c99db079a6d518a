//! Configuration management for nanopost
//!
//! Two files live in the config directory:
//! - `config.toml`: endpoints, identity, cadence, keywords, posting and output
//! - `prompts.toml`: the system persona and every prompt template
//!
//! Both are optional. A missing or unparsable file falls back to the built-in
//! defaults with a warning, and every field has its own default so partial
//! files work.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::{NanopostError, PostId, ProjectId, Result};

pub const CONFIG_FILE: &str = "config.toml";
pub const PROMPTS_FILE: &str = "prompts.toml";

/// Longest heartbeat or posting interval honored, one week
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Top-level agent configuration, loaded from `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Remote endpoints and credential variable names
    pub api: ApiConfig,

    /// Who the agent is on the forum
    pub agent: AgentConfig,

    /// Cadence, limits and keyword matching
    pub bot: BehaviorConfig,

    /// Periodic new-content posts
    pub posting: PostingConfig,

    /// Daily progress posts
    pub progress: ProgressConfig,

    /// Local files written by the agent
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Forum API base URL (no trailing slash)
    pub base_url: String,

    /// Chat-completions endpoint of the generation backend
    pub generation_url: String,

    /// Model identifier sent with each completion request
    pub generation_model: String,

    /// Environment variable holding the forum bearer token
    pub forum_key_env: String,

    /// Environment variable holding the generation bearer token
    pub generation_key_env: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Forum name of this agent; its own posts and comments are skipped
    pub name: String,

    /// Home post whose comments get replies
    pub post_id: PostId,

    /// Own project, never voted for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,

    /// Search keyword used to count mentions
    pub mention_keyword: String,

    /// Substring identifying the home project on the leaderboard
    pub project_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Heartbeat interval when none is given on the command line
    pub default_interval_minutes: u64,

    /// Upper bound on engagement comments per heartbeat
    pub max_engagements_per_cycle: usize,

    /// Delay between comment replies and project votes
    pub rate_limit_seconds: u64,

    /// Delay between engagement comments
    pub engage_rate_limit_seconds: u64,

    /// Engagement only runs while the clock minute is below this value
    pub engage_window_minutes: u32,

    /// Whether the project-voting handler runs
    pub vote_projects: bool,

    /// Case-insensitive topic keywords for voting and engagement
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
    /// Whether the new-content handler runs
    pub enabled: bool,

    /// Minimum minutes between new posts (0 means the default of 30)
    pub interval_minutes: u64,

    /// Ordered topic rotation
    pub topics: Vec<String>,

    /// Tags used when the generated post carries none
    pub fallback_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// First day of the hackathon, `YYYY-MM-DD`
    pub hackathon_start_date: String,

    /// Tags attached to every progress post
    pub post_tags: Vec<String>,

    /// Title template; receives `day`
    pub title_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory all output files are relative to
    pub dir: PathBuf,

    /// Append-only run log
    pub log_file: String,

    /// Per-day tweet archive; `{date}` is replaced with `YYYY-MM-DD`
    pub tweet_file_pattern: String,

    /// Per-day round summary; `{date}` is replaced with `YYYY-MM-DD`
    pub summary_file_pattern: String,

    /// Persisted dedup state
    pub state_file: String,
}

/// Prompt templates, loaded from `prompts.toml`
///
/// Templates use minijinja syntax, e.g. `{{ agent_name }}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// System persona sent as the first message of every completion
    pub system: String,

    /// Fields: `kind`, `context`
    pub tweet: String,

    /// Fields: `agent_name`, `comment_body`, `post_context`
    pub reply: String,

    /// Fields: `title`, `agent_name`, `body`
    pub comment: String,

    /// Fields: `topic`
    pub new_post: String,

    /// Sent verbatim
    pub progress: String,

    /// Fields: `agent_name`; used when reply generation fails
    pub fallback_reply: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://agents.colosseum.com/api".to_string(),
            generation_url: "https://open.bigmodel.cn/api/paas/v4/chat/completions".to_string(),
            generation_model: "glm-4-flash".to_string(),
            forum_key_env: "COLOSSEUM_API_KEY".to_string(),
            generation_key_env: "ZHIPU_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "moltpost-agent".to_string(),
            post_id: 186,
            project_id: None,
            mention_keyword: "moltpost".to_string(),
            project_marker: "moltpost".to_string(),
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            default_interval_minutes: 30,
            max_engagements_per_cycle: 2,
            rate_limit_seconds: 3,
            engage_rate_limit_seconds: 5,
            engage_window_minutes: 30,
            vote_projects: true,
            keywords: ["human", "agent", "identity", "dialogue", "social", "encounter"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: 30,
            topics: Vec::new(),
            fallback_tags: vec!["ai".to_string(), "consumer".to_string()],
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            hackathon_start_date: String::new(),
            post_tags: vec![
                "progress-update".to_string(),
                "ai".to_string(),
                "consumer".to_string(),
            ],
            title_template: "Moltpost Progress Update - Day {{ day }}".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            log_file: "nanopost_log.txt".to_string(),
            tweet_file_pattern: "tweets_{date}.md".to_string(),
            summary_file_pattern: "summary_{date}.md".to_string(),
            state_file: "nanopost_state.json".to_string(),
        }
    }
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: "You are moltpost-agent, a philosophical AI assistant.".to_string(),
            tweet: "Write a short tweet (under 280 characters) about this {{ kind }} event: \
                    {{ context }}. No hashtags spam, at most two."
                .to_string(),
            reply: "@{{ agent_name }} commented on our post:\n\n{{ comment_body }}\n\n\
                    Write a thoughtful, friendly reply in under 120 words."
                .to_string(),
            comment: "Post \"{{ title }}\" by @{{ agent_name }}:\n\n{{ body }}\n\n\
                      Write a genuine comment in under 100 words that adds a new angle."
                .to_string(),
            new_post: "Write a forum post about: {{ topic }}\n\n\
                       Answer in exactly this format:\n\
                       TITLE: <title>\nBODY: <body>\nTAGS: <tag1>, <tag2>"
                .to_string(),
            progress: "Write a short progress update for our hackathon project: what we \
                       shipped, what we learned, what comes next."
                .to_string(),
            fallback_reply: "Thanks for your comment, @{{ agent_name }}! -- moltpost-agent"
                .to_string(),
        }
    }
}

impl BotConfig {
    /// Load `config.toml` from the given path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| NanopostError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load `config.toml` from `config_dir`, falling back to defaults
    pub fn load_or_default(config_dir: &Path) -> Self {
        load_or_warn(&config_dir.join(CONFIG_FILE), Self::load)
    }

    /// Minimum spacing between new-content posts
    pub fn post_interval(&self) -> chrono::Duration {
        let minutes = if self.posting.interval_minutes == 0 {
            30
        } else {
            self.posting.interval_minutes.min(MAX_INTERVAL_MINUTES)
        };
        chrono::Duration::minutes(minutes as i64)
    }

    /// Delay between replies and project votes
    pub fn rate_limit(&self) -> Duration {
        Duration::from_secs(self.bot.rate_limit_seconds)
    }

    /// Delay between engagement comments
    pub fn engage_rate_limit(&self) -> Duration {
        Duration::from_secs(self.bot.engage_rate_limit_seconds)
    }

    /// Per-request timeout for both remote clients
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Parsed hackathon start date, if configured and valid
    pub fn hackathon_start(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.progress.hackathon_start_date.trim(), "%Y-%m-%d").ok()
    }

    /// Write default `config.toml` and `prompts.toml` into `config_dir`
    ///
    /// Existing files are left untouched. Returns the paths that were written.
    pub fn write_default(config_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(config_dir)?;
        let mut written = Vec::new();

        let config_path = config_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            let content = toml::to_string_pretty(&Self::default())
                .map_err(|e| NanopostError::Config(format!("Failed to serialize config: {}", e)))?;
            std::fs::write(&config_path, content)?;
            written.push(config_path);
        }

        let prompts_path = config_dir.join(PROMPTS_FILE);
        if !prompts_path.exists() {
            let content = toml::to_string_pretty(&Prompts::default())
                .map_err(|e| NanopostError::Config(format!("Failed to serialize prompts: {}", e)))?;
            std::fs::write(&prompts_path, content)?;
            written.push(prompts_path);
        }

        Ok(written)
    }
}

impl OutputConfig {
    pub fn log_path(&self) -> PathBuf {
        self.dir.join(&self.log_file)
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(&self.state_file)
    }

    /// Tweet archive for the given day
    pub fn tweet_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(expand_date(&self.tweet_file_pattern, date))
    }

    /// Round summary for the given day
    pub fn summary_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(expand_date(&self.summary_file_pattern, date))
    }
}

impl Prompts {
    /// Load `prompts.toml` from the given path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| NanopostError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load `prompts.toml` from `config_dir`, falling back to defaults
    pub fn load_or_default(config_dir: &Path) -> Self {
        load_or_warn(&config_dir.join(PROMPTS_FILE), Self::load)
    }
}

/// Locate the config directory
///
/// Tries `config`, `../config`, `../../config` and `config` next to the
/// executable; the first one holding a `config.toml` wins. Falls back to
/// `config`.
pub fn find_config_dir() -> PathBuf {
    let mut candidates: Vec<PathBuf> = ["config", "../config", "../../config"]
        .iter()
        .map(PathBuf::from)
        .collect();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join("config"));
    }

    candidates
        .into_iter()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .unwrap_or_else(|| PathBuf::from("config"))
}

fn load_or_warn<T: Default>(path: &Path, load: impl FnOnce(&Path) -> Result<T>) -> T {
    match load(path) {
        Ok(value) => value,
        Err(NanopostError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} not found, using defaults", path.display());
            T::default()
        }
        Err(e) => {
            warn!("{}, using defaults", e);
            T::default()
        }
    }
}

fn expand_date(pattern: &str, date: NaiveDate) -> String {
    pattern.replace("{date}", &date.format("%Y-%m-%d").to_string())
}
