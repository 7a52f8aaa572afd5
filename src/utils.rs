//! Small string and filesystem helpers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` bytes (backed off to a char boundary) with
/// `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Trim and squeeze every whitespace run (newlines, tabs, nbsp) to one space.
///
/// Scraped labels often arrive as `"\n   Times Square\n  "`.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned()
}

/// Make sure the directory that will hold `path` exists.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_parent_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
            info!(dir = %parent.display(), "Output directory ready");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let result = truncate_for_log("São Paulo", 2);
        assert_eq!(result, "S…(+9 bytes)");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("\n   Times   Square\n  "), "Times Square");
        assert_eq!(collapse_whitespace("Key\tWest"), "Key West");
        assert_eq!(collapse_whitespace(""), "");
    }
}
