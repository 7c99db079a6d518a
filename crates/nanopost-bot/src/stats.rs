//! Per-heartbeat counters and their markdown summary

use chrono::NaiveTime;

/// What one heartbeat accomplished
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundStats {
    pub replies: usize,
    pub replied_to: Vec<String>,
    pub post_votes: usize,
    pub project_votes: usize,
    pub engagements: usize,
    pub engaged_with: Vec<String>,
    pub new_post_posted: bool,
    pub progress_posted: bool,
    /// 1-based leaderboard position of the home project, if listed
    pub leaderboard_rank: Option<usize>,
}

impl RoundStats {
    pub fn record_reply(&mut self, agent_name: &str) {
        self.replies += 1;
        self.replied_to.push(agent_name.to_string());
    }

    pub fn record_engagement(&mut self, agent_name: &str) {
        self.engagements += 1;
        self.engaged_with.push(agent_name.to_string());
    }

    /// Whether anything was written to the forum
    pub fn is_quiet(&self) -> bool {
        self.replies == 0
            && self.post_votes == 0
            && self.project_votes == 0
            && self.engagements == 0
            && !self.new_post_posted
            && !self.progress_posted
    }

    /// Markdown section appended to the daily summary file
    pub fn to_markdown(&self, at: NaiveTime) -> String {
        let mut out = format!(
            "\n---\n\n## Round at {}\n\n| Metric | Count | Details |\n|--------|-------|---------|\n",
            at.format("%H:%M:%S")
        );

        out.push_str(&format!(
            "| Replies | {} | {} |\n",
            self.replies,
            mentions(&self.replied_to)
        ));
        out.push_str(&format!("| Post votes | {} | - |\n", self.post_votes));
        out.push_str(&format!("| Project votes | {} | - |\n", self.project_votes));
        out.push_str(&format!(
            "| Engagements | {} | {} |\n",
            self.engagements,
            mentions(&self.engaged_with)
        ));
        if self.new_post_posted {
            out.push_str("| New post | 1 | published |\n");
        }
        if self.progress_posted {
            out.push_str("| Progress update | 1 | published |\n");
        }
        if let Some(rank) = self.leaderboard_rank {
            out.push_str(&format!("| Leaderboard | #{} | - |\n", rank));
        }
        out
    }
}

fn mentions(names: &[String]) -> String {
    if names.is_empty() {
        return "-".to_string();
    }
    names
        .iter()
        .map(|n| format!("@{}", n))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_quiet() {
        let mut stats = RoundStats::default();
        assert!(stats.is_quiet());

        stats.record_reply("alice");
        stats.record_engagement("bob");
        assert!(!stats.is_quiet());
        assert_eq!(stats.replies, 1);
        assert_eq!(stats.engaged_with, vec!["bob"]);
    }

    #[test]
    fn test_markdown_table() {
        let mut stats = RoundStats {
            post_votes: 2,
            leaderboard_rank: Some(4),
            progress_posted: true,
            ..Default::default()
        };
        stats.record_reply("alice");
        stats.record_reply("carol");

        let md = stats.to_markdown(NaiveTime::from_hms_opt(9, 5, 0).unwrap());
        assert!(md.contains("## Round at 09:05:00"));
        assert!(md.contains("| Replies | 2 | @alice, @carol |"));
        assert!(md.contains("| Post votes | 2 | - |"));
        assert!(md.contains("| Engagements | 0 | - |"));
        assert!(md.contains("| Progress update | 1 | published |"));
        assert!(md.contains("| Leaderboard | #4 | - |"));
        assert!(!md.contains("New post"));
    }
}
