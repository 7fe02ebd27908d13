//! Data models for Open511 event feed responses.
//!
//! These structures follow the JSON format served by Open511 endpoints
//! such as DriveBC. Decoding is permissive: optional sections default to
//! empty values and unknown geometry degrades to [`Geography::Other`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::geo;

/// Top-level response from an Open511 `/events` endpoint.
///
/// Produced fresh on every fetch; nothing is carried across cycles.
#[derive(Debug, Clone, Deserialize)]
pub struct EventFeed {
    /// Road events in feed order
    pub events: Vec<EventRecord>,

    /// Paging information, when the server sends it
    #[serde(default)]
    pub pagination: Option<Pagination>,

    /// Feed metadata, when the server sends it
    #[serde(default)]
    pub meta: Option<Meta>,
}

impl EventFeed {
    /// Whether the server holds more events than this response carries.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.pagination
            .as_ref()
            .is_some_and(|p| p.next_url.is_some())
    }
}

/// Paging block of an Open511 response.
#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    /// Set when the server has more events than it returned
    pub next_url: Option<String>,
}

/// Metadata block of an Open511 response.
#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    /// API version string
    pub version: Option<String>,
}

/// A single road event. Read-only once decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    /// Stable Open511 identifier (`jurisdiction/ID`)
    #[serde(default)]
    pub id: Option<String>,

    /// Short category label (INCIDENT, CONSTRUCTION, ...)
    #[serde(default, deserialize_with = "null_as_default")]
    pub event_type: String,

    /// Subtype tags; the first one is the primary subtype
    #[serde(default, deserialize_with = "null_as_default")]
    pub event_subtypes: Vec<String>,

    /// Roads affected; the first one is shown
    #[serde(default, deserialize_with = "null_as_default")]
    pub roads: Vec<Road>,

    /// Free text, may contain markup-unsafe characters
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// Short headline
    #[serde(default)]
    pub headline: Option<String>,

    /// ACTIVE or ARCHIVED
    #[serde(default)]
    pub status: Option<String>,

    /// MINOR, MODERATE, MAJOR or UNKNOWN
    #[serde(default)]
    pub severity: Option<String>,

    /// Creation time, kept as the feed's display string
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: String,

    /// Last update time, kept as the feed's display string
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated: String,

    /// Location, absent for some events
    #[serde(default, deserialize_with = "lenient_geography")]
    pub geography: Option<Geography>,
}

impl EventRecord {
    /// First subtype tag, if any.
    #[must_use]
    pub fn primary_subtype(&self) -> Option<&str> {
        self.event_subtypes.first().map(String::as_str)
    }

    /// Name of the first road, or an empty string.
    #[must_use]
    pub fn primary_road(&self) -> &str {
        self.roads
            .first()
            .and_then(|r| r.name.as_deref())
            .unwrap_or("")
    }
}

/// A road reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Road {
    pub name: Option<String>,
    /// BOTH, N, S, E, W, ...
    pub direction: Option<String>,
}

/// Event geometry.
///
/// Coordinates are GeoJSON order: `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Geography {
    Point { coordinates: Vec<f64> },
    LineString { coordinates: Vec<Vec<f64>> },
    #[serde(other)]
    Other,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Decode geography without letting one bad shape fail the whole feed.
fn lenient_geography<'de, D>(deserializer: D) -> Result<Option<Geography>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.map(|v| Geography::deserialize(v).unwrap_or(Geography::Other)))
}

/// Simplified event for output.
///
/// This is the normalized structure we emit in JSON/NDJSON output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEvent {
    pub id: Option<String>,
    pub headline: Option<String>,
    pub status: Option<String>,
    pub event_type: String,
    pub subtype: Option<String>,
    pub road: String,
    pub severity: Option<String>,
    pub description: String,
    pub created: String,
    pub updated: String,
    pub map_url: Option<String>,
}

impl From<&EventRecord> for OutputEvent {
    fn from(e: &EventRecord) -> Self {
        let map_url = geo::map_url(e.geography.as_ref());
        Self {
            id: e.id.clone(),
            headline: e.headline.clone(),
            status: e.status.clone(),
            event_type: e.event_type.clone(),
            subtype: e.primary_subtype().map(str::to_string),
            road: e.primary_road().to_string(),
            severity: e.severity.clone(),
            description: e.description.clone(),
            created: e.created.clone(),
            updated: e.updated.clone(),
            map_url: (!map_url.is_empty()).then_some(map_url),
        }
    }
}
