//! Response classification
//!
//! A signature is a rejection pattern: a match anywhere in the response
//! body means the target rejected the candidate, so the candidate is
//! classified `Failure` and blacklisted. No match means the value
//! passed through and is whitelisted. The polarity is inverted on
//! purpose; do not flip it.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Binary verdict for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Success,
    Failure,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Success => "success",
            Verdict::Failure => "failed",
        }
    }
}

type Predicate = dyn Fn(&str) -> Verdict + Send + Sync;

/// Classifies response bodies into the two result partitions.
pub enum Classifier {
    /// Rejection signature: a match classifies the candidate Failure.
    Signature(Regex),
    /// Externally supplied predicate.
    Custom(Box<Predicate>),
}

impl Classifier {
    /// Compile a signature pattern. Fails eagerly so a bad pattern
    /// aborts run initialization, never an individual dispatch.
    pub fn signature(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidSignature {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Classifier::Signature(regex))
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> Verdict + Send + Sync + 'static,
    {
        Classifier::Custom(Box::new(predicate))
    }

    /// Whitelists everything; used by token-harvest runs that carry no
    /// rejection signature.
    pub fn always_success() -> Self {
        Self::custom(|_| Verdict::Success)
    }

    pub fn classify(&self, body: &str) -> Verdict {
        match self {
            Classifier::Signature(regex) => {
                if regex.is_match(body) {
                    Verdict::Failure
                } else {
                    Verdict::Success
                }
            }
            Classifier::Custom(predicate) => predicate(body),
        }
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classifier::Signature(regex) => f.debug_tuple("Signature").field(&regex.as_str()).finish(),
            Classifier::Custom(_) => f.debug_tuple("Custom").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_signature_match_is_a_failure() {
        let classifier = Classifier::signature("error").unwrap();
        assert_eq!(classifier.classify("error: invalid"), Verdict::Failure);
        assert_eq!(classifier.classify("ok"), Verdict::Success);
    }

    #[test]
    fn signature_matches_anywhere_in_the_body() {
        let classifier = Classifier::signature("denied").unwrap();
        assert_eq!(
            classifier.classify("<html>access denied</html>"),
            Verdict::Failure
        );
    }

    #[test]
    fn invalid_patterns_fail_eagerly() {
        let err = Classifier::signature("[unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSignature { .. }));
    }

    #[test]
    fn custom_predicates_take_over_classification() {
        let classifier = Classifier::custom(|body| {
            if body.len() > 10 {
                Verdict::Failure
            } else {
                Verdict::Success
            }
        });
        assert_eq!(classifier.classify("short"), Verdict::Success);
        assert_eq!(classifier.classify("a much longer body"), Verdict::Failure);
    }

    #[test]
    fn always_success_never_blacklists() {
        let classifier = Classifier::always_success();
        assert_eq!(classifier.classify("error error error"), Verdict::Success);
    }
}
