//! Initial partition assignment planning.
//!
//! Given the resolved topic selection, the startup policy and a snapshot of
//! cluster metadata, [`plan`] decides which partitions a source reads and
//! where each one starts. The planner is pure so broker client adapters can
//! share it and tests can drive it without a broker.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::ConnectorError;
use crate::startup::StartupPolicy;
use crate::topic::TopicSelection;

/// Topic name to partition ids, as reported by cluster metadata.
pub type TopicMetadata = BTreeMap<String, Vec<i32>>;

/// Start position for one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// Oldest retained offset.
    Beginning,
    /// Next offset to be produced.
    End,
    /// Consumer group's committed offset, falling back to the client's
    /// `auto.offset.reset`.
    Committed,
    /// First offset whose record timestamp is at or after this epoch time
    /// in milliseconds.
    Timestamp(i64),
}

/// One partition of the initial assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionStart {
    /// Topic name.
    pub topic: String,
    /// Partition id.
    pub partition: i32,
    /// Where reading begins.
    pub position: StartPosition,
}

/// Maps a startup policy to a per-partition start position.
///
/// # Errors
///
/// Returns `ConnectorError::ConfigurationError` for
/// [`StartupPolicy::Unrecognized`].
pub fn start_position(policy: &StartupPolicy) -> Result<StartPosition, ConnectorError> {
    match policy {
        StartupPolicy::Earliest => Ok(StartPosition::Beginning),
        StartupPolicy::Latest => Ok(StartPosition::End),
        StartupPolicy::GroupOffsets => Ok(StartPosition::Committed),
        StartupPolicy::Timestamp(ms) => Ok(StartPosition::Timestamp(*ms)),
        StartupPolicy::Unrecognized(mode) => Err(ConnectorError::config(format!(
            "unsupported startupMode '{mode}': \
             expected EARLIEST, LATEST, GROUP_OFFSETS or TIMESTAMP"
        ))),
    }
}

/// Returns the topics in `metadata` selected by `selection`, sorted.
///
/// A pattern must match the whole topic name. Internal topics (names
/// starting with `__`) are never matched by a pattern.
///
/// # Errors
///
/// Returns `ConnectorError::ConfigurationError` if the pattern is not a
/// valid regular expression, the single topic does not exist, or the
/// pattern matches nothing.
pub fn matching_topics(
    selection: &TopicSelection,
    metadata: &TopicMetadata,
) -> Result<Vec<String>, ConnectorError> {
    match selection {
        TopicSelection::SingleTopic(name) => {
            if metadata.contains_key(name) {
                Ok(vec![name.clone()])
            } else {
                Err(ConnectorError::config(format!(
                    "topic '{name}' does not exist"
                )))
            }
        }
        TopicSelection::Pattern(pattern) => {
            let re = full_match_regex(pattern)?;
            let topics: Vec<String> = metadata
                .keys()
                .filter(|t| !t.starts_with("__") && re.is_match(t))
                .cloned()
                .collect();
            if topics.is_empty() {
                return Err(ConnectorError::config(format!(
                    "topicPattern '{pattern}' matches no topic"
                )));
            }
            Ok(topics)
        }
    }
}

/// Plans the initial assignment, ordered by topic then partition.
///
/// # Errors
///
/// Propagates errors from [`start_position`] and [`matching_topics`].
pub fn plan(
    selection: &TopicSelection,
    policy: &StartupPolicy,
    metadata: &TopicMetadata,
) -> Result<Vec<PartitionStart>, ConnectorError> {
    let position = start_position(policy)?;
    let topics = matching_topics(selection, metadata)?;

    let mut starts = Vec::new();
    for topic in topics {
        let mut partitions = metadata.get(&topic).cloned().unwrap_or_default();
        partitions.sort_unstable();
        starts.extend(partitions.into_iter().map(|partition| PartitionStart {
            topic: topic.clone(),
            partition,
            position,
        }));
    }
    Ok(starts)
}

fn full_match_regex(pattern: &str) -> Result<Regex, ConnectorError> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| ConnectorError::config(format!("invalid topicPattern '{pattern}': {e}")))
}
