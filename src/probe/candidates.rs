//! Candidate generation
//!
//! A probe run pulls candidate values from here: either a formatted
//! character-code range, or a bare repetition counter for blind token
//! requests.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Character set selection, mapped to a default code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    Ascii,
    Extended,
    Wide,
}

impl Charset {
    /// Default `[start, end)` code range for the set. Explicit bounds
    /// in the probe options always override these.
    pub fn default_range(&self) -> (u32, u32) {
        match self {
            Charset::Ascii => (0, 128),
            Charset::Extended => (0, 226),
            Charset::Wide => (0, 513),
        }
    }

    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" | "us-ascii" => Ok(Charset::Ascii),
            "extended" | "ebcdic" => Ok(Charset::Extended),
            "wide" | "utf-8" | "utf8" => Ok(Charset::Wide),
            other => Err(ConfigError::UnknownCharset(other.to_string())),
        }
    }
}

/// A formatted character-code range: for each code in `[start, end)`
/// emits `prefix + char(code) + postfix`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharRange {
    pub start: u32,
    pub end: u32,
    pub prefix: Option<String>,
    pub postfix: Option<String>,
}

impl CharRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start,
            end,
            prefix: None,
            postfix: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_postfix(mut self, postfix: impl Into<String>) -> Self {
        self.postfix = Some(postfix.into());
        self
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Lazy, restartable iteration: each call walks the full range
    /// again from the start.
    pub fn iter(&self) -> impl Iterator<Item = String> + Send + '_ {
        let prefix = self.prefix.as_deref().unwrap_or("");
        let postfix = self.postfix.as_deref().unwrap_or("");
        (self.start..self.end).map(move |code| {
            // Codes outside the valid scalar range (lone surrogates)
            // degrade to U+FFFD instead of aborting the run.
            let ch = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER);
            format!("{prefix}{ch}{postfix}")
        })
    }
}

/// The candidate stream for one run.
#[derive(Debug, Clone)]
pub enum Candidates {
    /// Formatted values from a character-code range.
    Range(CharRange),
    /// `count` identical blind requests; the candidate string is just
    /// the attempt label.
    Repeat { count: usize },
}

impl Candidates {
    pub fn len(&self) -> usize {
        match self {
            Candidates::Range(range) => range.len(),
            Candidates::Repeat { count } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = String> + Send + '_> {
        match self {
            Candidates::Range(range) => Box::new(range.iter()),
            Candidates::Repeat { count } => Box::new((0..*count).map(|i| format!("#{}", i + 1))),
        }
    }
}
