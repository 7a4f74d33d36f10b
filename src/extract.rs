//! Turns free-form user input into canonical video identifiers.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

/// Host fragments a line must contain to be picked up from an input file.
pub const HOST_FRAGMENTS: [&str; 2] = ["youtube.com", "youtu.be"];

// Every pattern captures exactly 11 id characters that are not followed by a
// twelfth one, so longer channel/playlist ids never match.
static ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[?&]v=([0-9A-Za-z_-]{11})(?:[^0-9A-Za-z_-]|$)",
        r"/([0-9A-Za-z_-]{11})(?:[^0-9A-Za-z_-]|$)",
        r"embed/([0-9A-Za-z_-]{11})(?:[^0-9A-Za-z_-]|$)",
        r"shorts/([0-9A-Za-z_-]{11})(?:[^0-9A-Za-z_-]|$)",
        r"youtu\.be/([0-9A-Za-z_-]{11})(?:[^0-9A-Za-z_-]|$)",
        r"^([0-9A-Za-z_-]{11})$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static identifier pattern"))
    .collect()
});

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("static hashtag pattern"));

/// Returns the canonical 11-character identifier, or `None` when the input
/// matches no known URL shape. Unrecognized input is routine, not an error.
pub fn extract_video_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    ID_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .map(|id| id.as_str().to_owned())
    })
}

/// Case-sensitive, deduplicated `#tag` tokens.
pub fn extract_hashtags(text: &str) -> BTreeSet<String> {
    HASHTAG
        .find_iter(text)
        .map(|tag| tag.as_str().to_owned())
        .collect()
}

pub fn has_known_host(line: &str) -> bool {
    HOST_FRAGMENTS.iter().any(|host| line.contains(host))
}

/// Reads one URL per line, keeping non-empty lines that mention a known host.
pub fn read_input_file(path: &Path) -> Result<Vec<String>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && has_known_host(line))
        .map(str::to_owned)
        .collect())
}

/// Direct URLs first, then the lines of the optional input file.
pub fn collect_inputs(urls: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut inputs: Vec<String> = urls
        .iter()
        .map(|url| url.trim().to_owned())
        .filter(|url| !url.is_empty())
        .collect();
    if let Some(path) = file {
        inputs.extend(read_input_file(path)?);
    }
    Ok(inputs)
}
