//! Source file parsing and text extraction.

use std::fs;
use std::path::Path;
use switchboard_core::{AppError, AppResult};

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") | Some("text") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Parse a source file and extract clean text.
///
/// Binary content (NUL bytes or invalid UTF-8) is rejected.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let content_type = ContentType::from_path(path);

    let bytes =
        fs::read(path).map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    if bytes.contains(&0) {
        return Err(AppError::Knowledge(format!(
            "Binary file not supported: {:?}",
            path
        )));
    }
    let raw = String::from_utf8(bytes).map_err(|_| {
        AppError::Knowledge(format!("Binary file not supported (not UTF-8): {:?}", path))
    })?;

    let cleaned = match content_type {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::Html => clean_html(&raw),
        ContentType::PlainText | ContentType::Unknown => raw,
    };

    Ok(cleaned)
}

/// Clean markdown by removing markup while keeping paragraph breaks.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut blank_pending = false;

    for line in text.lines() {
        let trimmed = line.trim();

        // Horizontal rules and code fences
        if trimmed.starts_with("---")
            || trimmed.starts_with("***")
            || trimmed.starts_with("```")
            || trimmed.starts_with("~~~")
        {
            continue;
        }

        let content = trimmed.trim_start_matches('#').trim_start_matches('>').trim();
        let content = content
            .strip_prefix("- ")
            .or_else(|| content.strip_prefix("* "))
            .or_else(|| content.strip_prefix("+ "))
            .unwrap_or(content);
        let content = strip_inline_markup(content);

        if content.is_empty() {
            blank_pending = !result.is_empty();
            continue;
        }

        if blank_pending {
            result.push('\n');
            blank_pending = false;
        }
        result.push_str(&content);
        result.push('\n');
    }

    result.trim().to_string()
}

/// Drop emphasis markers and turn `[text](url)` links into `text`.
fn strip_inline_markup(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '*' | '_' | '`' => {}
            ']' if chars.peek() == Some(&'(') => {
                // Skip the link target
                for next in chars.by_ref() {
                    if next == ')' {
                        break;
                    }
                }
            }
            '[' => {}
            _ => out.push(ch),
        }
    }

    out.trim().to_string()
}

/// Clean HTML by stripping tags, scripts and styles.
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    let lower = text.to_lowercase();

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;

            let rest = lower.get(i..).unwrap_or("");
            if rest.starts_with("<script") {
                in_script = true;
            } else if rest.starts_with("</script") {
                in_script = false;
            } else if rest.starts_with("<style") {
                in_style = true;
            } else if rest.starts_with("</style") {
                in_style = false;
            }
        } else if ch == '>' {
            in_tag = false;
            result.push(' ');
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    decode_entities(&result.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
