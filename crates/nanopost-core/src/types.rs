//! Identifier types shared across crates

/// Forum post identifier
pub type PostId = i64;

/// Forum comment identifier
pub type CommentId = i64;

/// Hackathon project identifier
pub type ProjectId = i64;

/// Truncate `s` to at most `max` characters, appending `...` when cut.
///
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max).collect();
    format!("{truncated}...")
}
