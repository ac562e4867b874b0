//! # Video Reference Resolution
//!
//! Extracts the 11-character YouTube video identifier from free-form input.
//!
//! Accepted shapes, each optionally prefixed by `http(s)://` and `www.`:
//!
//! ```text
//! dQw4w9WgXcQ                                  bare id
//! youtube.com/watch?v=dQw4w9WgXcQ              watch page
//! youtube.com/watch?feature=share&v=dQw4w9WgXcQ
//! youtube.com/embed/dQw4w9WgXcQ
//! youtube.com/v/dQw4w9WgXcQ
//! youtube.com/shorts/dQw4w9WgXcQ
//! youtu.be/dQw4w9WgXcQ                         short domain
//! ```
//!
//! Host and path matching is case-insensitive; the identifier itself is
//! returned exactly as typed.

use crate::error::{PipelineError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Length of a YouTube video identifier.
pub const VIDEO_ID_LEN: usize = 11;

/// Scheme, `www.` and the supported host/path prefixes.
macro_rules! url_prefix {
    () => {
        r#"^(?:https?://)?(?:www\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|v/|shorts/)|youtu\.be/)"#
    };
}
/// The identifier, which must not run on into another identifier character.
macro_rules! video_id {
    () => {
        r#"(?P<id>[A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)"#
    };
}

const URL_PATTERN: &str = concat!("(?i)", url_prefix!(), video_id!());
const BARE_ID_PATTERN: &str = r#"^[A-Za-z0-9_-]{11}$"#;

static URL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static BARE_ID_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn url_re() -> Option<&'static Regex> {
    URL_RE.get_or_init(|| Regex::new(URL_PATTERN).ok()).as_ref()
}

fn bare_id_re() -> Option<&'static Regex> {
    BARE_ID_RE.get_or_init(|| Regex::new(BARE_ID_PATTERN).ok()).as_ref()
}

/// A user-supplied reference together with its resolved video id.
///
/// Only [`resolve`] constructs values, so a `VideoReference` is always fully
/// resolved. Deserialization re-runs [`resolve`] on `raw`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StoredReference")]
pub struct VideoReference {
    raw: String,
    video_id: String,
}

#[derive(Deserialize)]
struct StoredReference {
    raw: String,
    #[serde(default)]
    video_id: Option<String>,
}

impl TryFrom<StoredReference> for VideoReference {
    type Error = PipelineError;

    fn try_from(stored: StoredReference) -> Result<Self> {
        let reference = resolve(&stored.raw)?;
        match stored.video_id {
            Some(id) if id != reference.video_id => {
                Err(invalid(&stored.raw, "video id does not match the input"))
            }
            _ => Ok(reference),
        }
    }
}

impl VideoReference {
    /// Input as the user typed it (trimmed).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn is_bare_id(&self) -> bool {
        self.raw == self.video_id
    }

    pub fn canonical_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }

    pub fn embed_url(&self) -> String {
        format!("https://www.youtube.com/embed/{}", self.video_id)
    }

    /// URL sent to the backend: the user's link, or the canonical watch URL
    /// when only an id was given.
    pub fn source_url(&self) -> String {
        if self.is_bare_id() {
            self.canonical_url()
        } else {
            self.raw.clone()
        }
    }
}

impl fmt::Display for VideoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.video_id)
    }
}

/// Resolve free-form input into a [`VideoReference`].
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] for empty input or input that
/// matches none of the accepted shapes.
pub fn resolve(input: &str) -> Result<VideoReference> {
    let raw = input.trim();

    if raw.is_empty() {
        return Err(invalid(raw, "input is empty"));
    }

    if bare_id_re().is_some_and(|re| re.is_match(raw)) {
        return Ok(VideoReference {
            raw: raw.to_string(),
            video_id: raw.to_string(),
        });
    }

    let video_id = url_re()
        .and_then(|re| re.captures(raw))
        .and_then(|caps| caps.name("id"))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| invalid(raw, "no YouTube video id found"))?;

    Ok(VideoReference {
        raw: raw.to_string(),
        video_id,
    })
}

fn invalid(raw: &str, reason: &str) -> PipelineError {
    PipelineError::Validation {
        input: raw.to_string(),
        reason: reason.to_string(),
    }
}
