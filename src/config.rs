//! Feed configuration.
//!
//! Built once at startup from defaults, an optional JSON file and command
//! line overrides, then passed by value. Nothing mutates it afterwards.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::errors::RoadtailError;
use crate::filters::Selector;
use crate::render::Markup;

/// DriveBC Open511 events endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.open511.gov.bc.ca/events";

/// Jurisdiction queried by default.
pub const DEFAULT_JURISDICTION: &str = "drivebc.ca";

/// Result limit used with local subtype matching. Matching events are often
/// not MAJOR and can sit well past the server's default page size.
pub const SUBTYPE_LIMIT: u32 = 350;

/// Time between fetches.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15 * 60;

/// Shortest poll interval accepted from configuration.
pub const MIN_POLL_INTERVAL_SECS: u64 = 30;

/// Open511 severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
    Unknown,
}

impl Severity {
    /// Query parameter value for this severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "MINOR",
            Self::Moderate => "MODERATE",
            Self::Major => "MAJOR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MINOR" => Ok(Self::Minor),
            "MODERATE" => Ok(Self::Moderate),
            "MAJOR" => Ok(Self::Major),
            "UNKNOWN" => Ok(Self::Unknown),
            _ => Err(format!(
                "unknown severity: {s} (expected: minor, moderate, major, unknown)"
            )),
        }
    }
}

/// Static configuration for fetching and rendering one feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Open511 events endpoint, without query string
    pub endpoint: String,
    pub jurisdiction: String,
    /// Server-side severity filter
    pub severity: Option<Severity>,
    /// Maximum number of events requested
    pub limit: Option<u32>,
    /// When set, match events locally on their first subtype
    pub subtype: Option<String>,
    pub poll_interval_secs: u64,
    /// Insert feed text without escaping
    pub raw_markup: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            jurisdiction: DEFAULT_JURISDICTION.to_string(),
            severity: None,
            limit: None,
            subtype: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            raw_markup: false,
        }
    }
}

impl FeedConfig {
    /// Load a configuration file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, RoadtailError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            RoadtailError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            RoadtailError::Config(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Selection policy implied by this configuration.
    #[must_use]
    pub fn selector(&self) -> Selector {
        match &self.subtype {
            Some(tag) => Selector::Subtype { tag: tag.clone() },
            None => Selector::ServerSide {
                label: self.effective_severity().map_or_else(
                    || "active".to_string(),
                    |s| s.as_str().to_lowercase(),
                ),
            },
        }
    }

    /// Severity sent to the server. Server-side selection defaults to MAJOR.
    #[must_use]
    pub fn effective_severity(&self) -> Option<Severity> {
        match self.subtype {
            Some(_) => self.severity,
            None => Some(self.severity.unwrap_or(Severity::Major)),
        }
    }

    /// Limit sent to the server. Subtype matching defaults to a large page.
    #[must_use]
    pub fn effective_limit(&self) -> Option<u32> {
        match self.subtype {
            Some(_) => Some(self.limit.unwrap_or(SUBTYPE_LIMIT)),
            None => self.limit,
        }
    }

    /// Query parameters for the events request.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("format", "json".to_string()),
            ("status", "ACTIVE".to_string()),
            ("jurisdiction", self.jurisdiction.clone()),
        ];
        if let Some(severity) = self.effective_severity() {
            pairs.push(("severity", severity.as_str().to_string()));
        }
        if let Some(limit) = self.effective_limit() {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }

    /// Full request URL including the query string.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL.
    pub fn events_url(&self) -> Result<Url, RoadtailError> {
        Url::parse_with_params(&self.endpoint, self.query_pairs()).map_err(|e| {
            RoadtailError::Config(format!("invalid endpoint {}: {e}", self.endpoint))
        })
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn markup(&self) -> Markup {
        if self.raw_markup {
            Markup::Raw
        } else {
            Markup::Escaped
        }
    }
}
