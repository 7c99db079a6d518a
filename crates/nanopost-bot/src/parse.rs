//! Heuristic parser for generated forum posts
//!
//! The generator is asked for `TITLE:`, `BODY:` and `TAGS:` sections but
//! answers in free text, often wrapped in markdown (`**TITLE:**`, `## Body:`).
//! This module is pure: no I/O, no logging.

use nanopost_client::NewPost;

/// Tags at or above this many characters are dropped
const MAX_TAG_CHARS: usize = 20;

/// Result of parsing a generated post
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPost {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

impl ParsedPost {
    /// Whether both title and body were recovered
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.body.is_empty()
    }

    pub fn into_new_post(self) -> NewPost {
        NewPost {
            title: self.title,
            body: self.body,
            tags: self.tags,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Title,
    Body,
    Tags,
}

const MARKERS: [(Marker, &str); 3] = [
    (Marker::Title, "TITLE"),
    (Marker::Body, "BODY"),
    (Marker::Tags, "TAGS"),
];

/// Parse `raw` into title, body and tags
///
/// Falls back to first-line-as-title when no markers are found, and to
/// `fallback_tags` when no tags are found.
pub fn parse_new_post(raw: &str, fallback_tags: &[String]) -> ParsedPost {
    let mut title = String::new();
    let mut body_lines: Vec<&str> = Vec::new();
    let mut tags = Vec::new();
    let mut in_body = false;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if in_body {
                body_lines.push("");
            }
            continue;
        }

        match match_marker(trimmed) {
            Some((Marker::Title, rest)) => {
                let cleaned = clean_title(rest);
                if !cleaned.is_empty() {
                    title = cleaned;
                }
                in_body = false;
            }
            Some((Marker::Body, rest)) => {
                let inline = strip_emphasis(rest);
                if !inline.is_empty() {
                    body_lines.push(inline);
                }
                in_body = true;
            }
            Some((Marker::Tags, rest)) => {
                tags.extend(parse_tags(rest));
                in_body = false;
            }
            None => {
                if in_body {
                    body_lines.push(trimmed);
                }
            }
        }
    }

    let mut body = body_lines.join("\n").trim().to_string();

    if title.is_empty() && body.is_empty() {
        let mut lines = raw.lines().map(str::trim).filter(|l| !l.is_empty());
        if let Some(first) = lines.next() {
            title = first
                .trim_matches(|c: char| matches!(c, '#' | '*' | '"') || c.is_whitespace())
                .to_string();
        }
        body = lines.collect::<Vec<_>>().join("\n");
    }

    if tags.is_empty() {
        tags = fallback_tags.to_vec();
    }

    ParsedPost { title, body, tags }
}

/// Recognize a marker at the start of `line`, returning the text after its colon
fn match_marker(line: &str) -> Option<(Marker, &str)> {
    let stripped = line.trim_start_matches(|c: char| c == '*' || c == '#' || c.is_whitespace());

    for (marker, word) in MARKERS {
        let Some(head) = stripped.get(..word.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(word) {
            continue;
        }
        let rest = stripped[word.len()..].trim_start_matches('*');
        if let Some(after) = rest.strip_prefix(':') {
            return Some((marker, after));
        }
    }
    None
}

fn strip_emphasis(text: &str) -> &str {
    text.trim().trim_start_matches('*').trim()
}

fn clean_title(text: &str) -> String {
    strip_emphasis(text)
        .trim_matches(|c: char| matches!(c, '[' | ']' | '"' | '*' | '#') || c.is_whitespace())
        .to_string()
}

fn parse_tags(text: &str) -> Vec<String> {
    strip_emphasis(text)
        .trim_matches(|c: char| c == '[' || c == ']')
        .split(',')
        .map(|tag| {
            tag.trim()
                .trim_matches(|c: char| matches!(c, '"' | '\'' | '*'))
                .trim()
        })
        .filter(|tag| !tag.is_empty() && tag.chars().count() < MAX_TAG_CHARS)
        .map(str::to_string)
        .collect()
}
