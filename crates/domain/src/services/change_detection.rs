//! Change detection for event updates.
//!
//! Compares the watched fields of two event snapshots and classifies the
//! update. Only time and location changes are notify-worthy; edits to any
//! other field produce an empty change set.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The event fields change detection looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSnapshot {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A notify-worthy category of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTag {
    Time,
    Location,
}

impl ChangeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTag::Time => "time",
            ChangeTag::Location => "location",
        }
    }
}

impl std::fmt::Display for ChangeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of change tags. Iteration order is fixed (time before location).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    tags: BTreeSet<ChangeTag>,
}

impl ChangeSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: ChangeTag) {
        self.tags.insert(tag);
    }

    pub fn contains(&self, tag: ChangeTag) -> bool {
        self.tags.contains(&tag)
    }

    /// An empty set means "do not notify".
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ChangeTag> + '_ {
        self.tags.iter().copied()
    }

    /// Comma separated tag list, e.g. `time,location`.
    pub fn label(&self) -> String {
        self.iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromIterator<ChangeTag> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = ChangeTag>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

fn location_name_of(s: &EventSnapshot) -> &str {
    s.location_name.as_deref().unwrap_or("")
}

fn coordinate(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0)
}

/// Classifies an update from `before` to `after`.
///
/// Creation (`before` absent) and deletion (`after` absent) never notify.
pub fn detect_changes(before: Option<&EventSnapshot>, after: Option<&EventSnapshot>) -> ChangeSet {
    let (Some(before), Some(after)) = (before, after) else {
        return ChangeSet::empty();
    };

    let mut changes = ChangeSet::empty();

    if before.start_time != after.start_time || before.end_time != after.end_time {
        changes.insert(ChangeTag::Time);
    }

    if location_name_of(before) != location_name_of(after)
        || coordinate(before.latitude) != coordinate(after.latitude)
        || coordinate(before.longitude) != coordinate(after.longitude)
    {
        changes.insert(ChangeTag::Location);
    }

    changes
}

fn format_instant(t: DateTime<Utc>) -> String {
    t.format("%a, %b %-d, %-I:%M %p UTC").to_string()
}

fn format_window(after: &EventSnapshot) -> Option<String> {
    match (after.start_time, after.end_time) {
        (Some(start), Some(end)) if start.date_naive() == end.date_naive() => Some(format!(
            "{} to {}",
            format_instant(start),
            end.format("%-I:%M %p UTC")
        )),
        (Some(start), Some(end)) => Some(format!(
            "{} to {}",
            format_instant(start),
            format_instant(end)
        )),
        (Some(start), None) => Some(format_instant(start)),
        _ => None,
    }
}

/// Renders the human-readable summary used as the notification body.
pub fn summarize(changes: &ChangeSet, after: &EventSnapshot) -> String {
    let mut parts = Vec::with_capacity(changes.len());

    for tag in changes.iter() {
        match tag {
            ChangeTag::Time => parts.push(match format_window(after) {
                Some(window) => format!("New time: {}.", window),
                None => "The time has changed.".to_string(),
            }),
            ChangeTag::Location => {
                let name = location_name_of(after);
                parts.push(if name.is_empty() {
                    "The location has changed.".to_string()
                } else {
                    format!("New location: {}.", name)
                });
            }
        }
    }

    parts.join(" ")
}
