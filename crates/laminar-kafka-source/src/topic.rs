//! Topic selection.
//!
//! A Kafka source reads either one literal topic or every topic whose name
//! matches a regular expression. When both options are supplied the pattern
//! wins.

use std::fmt;

use crate::error::ConnectorError;

/// Which topics a source consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicSelection {
    /// A single topic, by exact name.
    SingleTopic(String),
    /// Every topic whose full name matches this regular expression.
    Pattern(String),
}

impl TopicSelection {
    /// Returns `true` for [`TopicSelection::Pattern`].
    #[must_use]
    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }

    /// Returns the topic name or pattern text exactly as supplied.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SingleTopic(s) | Self::Pattern(s) => s,
        }
    }
}

impl fmt::Display for TopicSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleTopic(t) => write!(f, "topic '{t}'"),
            Self::Pattern(p) => write!(f, "pattern '{p}'"),
        }
    }
}

/// Resolves the topic options into a [`TopicSelection`].
///
/// A non-blank `pattern` takes precedence and `topic` is then ignored.
/// Values are kept verbatim, including surrounding whitespace.
///
/// # Errors
///
/// Returns `ConnectorError::ConfigurationError` when both are absent or blank.
pub fn resolve(
    topic: Option<&str>,
    pattern: Option<&str>,
) -> Result<TopicSelection, ConnectorError> {
    if let Some(p) = pattern.filter(|p| !is_blank(p)) {
        return Ok(TopicSelection::Pattern(p.to_string()));
    }
    if let Some(t) = topic.filter(|t| !is_blank(t)) {
        return Ok(TopicSelection::SingleTopic(t.to_string()));
    }
    Err(ConnectorError::config("either topic or topicPattern must be set"))
}

/// Returns `true` if `s` is empty or only whitespace.
pub(crate) fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
