//! Event selection.
//!
//! Reduces a fetched feed to the events worth displaying. Either the server
//! already filtered by severity and everything passes through, or events are
//! matched locally on their primary subtype.

use crate::models::EventRecord;

/// Selection policy for one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// The query already restricted results; keep every record.
    ServerSide {
        /// Word used in the counter text, e.g. "major"
        label: String,
    },
    /// Keep records whose first subtype equals `tag`.
    Subtype { tag: String },
}

impl Default for Selector {
    fn default() -> Self {
        Self::ServerSide {
            label: "major".to_string(),
        }
    }
}

/// Result of applying a [`Selector`] to a feed.
#[derive(Debug)]
pub struct Selection<'a> {
    /// Selected records, in feed order
    pub events: Vec<&'a EventRecord>,
    /// Number of records received before selection
    pub total: usize,
    /// Word used in the counter text
    pub label: String,
}

impl Selection<'_> {
    #[must_use]
    pub fn selected(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Counter text showing both the selected and total counts.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} {} events of {} total events",
            self.selected(),
            self.label,
            self.total
        )
    }
}

impl Selector {
    /// Check if a record passes this selector.
    #[must_use]
    pub fn matches(&self, event: &EventRecord) -> bool {
        match self {
            Self::ServerSide { .. } => true,
            Self::Subtype { tag } => event
                .primary_subtype()
                .is_some_and(|s| s == tag.as_str()),
        }
    }

    /// Word used in the counter text.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::ServerSide { label } => label.clone(),
            Self::Subtype { tag } => tag.to_lowercase(),
        }
    }

    /// Apply the selector, preserving input order.
    #[must_use]
    pub fn select<'a>(&self, events: &'a [EventRecord]) -> Selection<'a> {
        Selection {
            events: events.iter().filter(|e| self.matches(e)).collect(),
            total: events.len(),
            label: self.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::sample_feed;

    #[test]
    fn test_server_side_passes_everything() {
        let feed = sample_feed();
        let selection = Selector::default().select(&feed.events);
        assert_eq!(selection.selected(), feed.events.len());
        assert_eq!(selection.total, feed.events.len());
        assert_eq!(selection.summary(), "5 major events of 5 total events");
    }

    #[test]
    fn test_subtype_keeps_matching_in_order() {
        let feed = sample_feed();
        let selector = Selector::Subtype {
            tag: "FIRE".to_string(),
        };
        let selection = selector.select(&feed.events);

        let ids: Vec<_> = selection
            .events
            .iter()
            .map(|e| e.id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, ["drivebc.ca/DBC-52011", "drivebc.ca/DBC-52402"]);
        assert_eq!(selection.summary(), "2 fire events of 5 total events");
    }

    #[test]
    fn test_subtype_only_checks_first_tag() {
        let json = r#"{"events": [
            {"event_type": "INCIDENT", "event_subtypes": ["HAZARD", "FIRE"]},
            {"event_type": "INCIDENT", "event_subtypes": ["fire"]},
            {"event_type": "INCIDENT"}
        ]}"#;
        let feed: crate::models::EventFeed = serde_json::from_str(json).unwrap();
        let selector = Selector::Subtype {
            tag: "FIRE".to_string(),
        };
        let selection = selector.select(&feed.events);
        assert_eq!(selection.selected(), 0);
        assert_eq!(selection.total, 3);
    }

    #[test]
    fn test_subtype_match_is_exact() {
        let json = r#"{"events": [
            {"event_type": "INCIDENT", "event_subtypes": ["fire"]},
            {"event_type": "INCIDENT", "event_subtypes": ["FIRE"]}
        ]}"#;
        let feed: crate::models::EventFeed = serde_json::from_str(json).unwrap();
        let selection = Selector::Subtype {
            tag: "FIRE".to_string(),
        }
        .select(&feed.events);
        assert_eq!(selection.selected(), 1);
        assert_eq!(selection.events[0].primary_subtype(), Some("FIRE"));
    }

    #[test]
    fn test_empty_feed() {
        let selection = Selector::Subtype {
            tag: "FIRE".to_string(),
        }
        .select(&[]);
        assert!(selection.is_empty());
        assert_eq!(selection.summary(), "0 fire events of 0 total events");
    }
}
