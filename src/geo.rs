//! Map-link coordinates derived from event geometry.
//!
//! Picks one representative point per event and turns it into a map
//! service URL. This is only enough geometry to place a single marker.

use std::fmt;

use crate::models::Geography;

/// Map service used for event links.
const MAP_BASE_URL: &str = "https://maps.google.com/";

/// Zoom level embedded in every map link.
const MAP_ZOOM: u8 = 12;

/// A derived `(lat, lon)` pair for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapCoordinate {
    pub lat: f64,
    pub lon: f64,
}

impl fmt::Display for MapCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

impl MapCoordinate {
    /// Derive the marker coordinate for a geometry.
    ///
    /// - `Point [lon, lat]` yields `(lat, lon)`.
    /// - `LineString` takes the pair at `floor(len / 2)` and always returns
    ///   it as `(second, first)`. Feeds covering North America carry a
    ///   negative first component (western longitude); pairs with a
    ///   non-negative first component are normalised by the same swap. This
    ///   is a regional heuristic, not a general geometry rule.
    /// - Anything else yields `None`.
    #[must_use]
    pub fn from_geography(geo: &Geography) -> Option<Self> {
        match geo {
            Geography::Point { coordinates } => match coordinates.as_slice() {
                [lon, lat, ..] => Some(Self { lat: *lat, lon: *lon }),
                _ => None,
            },
            Geography::LineString { coordinates } => {
                let mid = midpoint_index(coordinates.len())?;
                match coordinates[mid].as_slice() {
                    [first, second, ..] => Some(Self {
                        lat: *second,
                        lon: *first,
                    }),
                    _ => None,
                }
            }
            Geography::Other => None,
        }
    }

    /// Full map URL placing a marker here and centring the view on it.
    #[must_use]
    pub fn to_url(self) -> String {
        format!("{MAP_BASE_URL}?q={0}&ll={0}&z={MAP_ZOOM}", self)
    }
}

/// Index of the representative vertex of a line: `floor(len / 2)`.
///
/// Returns `None` for an empty line.
#[must_use]
pub fn midpoint_index(len: usize) -> Option<usize> {
    (len > 0).then_some(len / 2)
}

/// Map URL for an event's geometry, or an empty string when there is none.
#[must_use]
pub fn map_url(geo: Option<&Geography>) -> String {
    geo.and_then(MapCoordinate::from_geography)
        .map(MapCoordinate::to_url)
        .unwrap_or_default()
}
