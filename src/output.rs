//! Output formatters for road events.
//!
//! Supports a standalone HTML page, human-readable terminal lines (with
//! colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use chrono::{DateTime, Local};

use crate::filters::Selection;
use crate::geo;
use crate::models::{EventRecord, OutputEvent};
use crate::render::Renderer;
use crate::surface::HtmlPage;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Event-type colors
const RED: &str = "\x1b[91m"; // Incidents
const YELLOW: &str = "\x1b[93m"; // Construction
const CYAN: &str = "\x1b[96m"; // Weather and road conditions
const WHITE: &str = "\x1b[97m"; // Everything else

const ICON_ROAD: &str = "🚧";
const ICON_FIRE: &str = "🔥";

/// Longest description shown on one terminal line.
const MAX_DESCRIPTION_CHARS: usize = 100;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Standalone HTML page
    Html,
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!(
                "unknown format: {s} (expected: html, human, json, ndjson)"
            )),
        }
    }
}

/// Get the color code for an event type.
fn event_color(event_type: &str) -> &'static str {
    match event_type {
        "INCIDENT" => RED,
        "CONSTRUCTION" | "SPECIAL_EVENT" => YELLOW,
        "WEATHER_CONDITION" | "ROAD_CONDITION" => CYAN,
        _ => WHITE,
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

/// Write the selection as a standalone HTML page.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_html<W: Write>(
    writer: &mut W,
    selection: &Selection<'_>,
    renderer: &Renderer,
    acquired: DateTime<Local>,
) -> io::Result<()> {
    let mut page = HtmlPage::default();
    renderer.render(&mut page, selection, acquired);
    write!(writer, "{}", page.document())
}

/// Write events in human-readable format with colors.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, selection: &Selection<'_>) -> io::Result<()> {
    writeln!(writer, "{BOLD}{}{RESET}", selection.summary())?;

    for event in &selection.events {
        let color = event_color(&event.event_type);
        let icon = if event.primary_subtype() == Some("FIRE") {
            ICON_FIRE
        } else {
            ICON_ROAD
        };
        let road = match event.primary_road() {
            "" => "Unknown road".to_string(),
            name => match event.roads.first().and_then(|r| r.direction.as_deref()) {
                Some(direction) => format!("{name} ({direction})"),
                None => name.to_string(),
            },
        };
        let description = truncate(&event.description, MAX_DESCRIPTION_CHARS);
        let map = geo::map_url(event.geography.as_ref());

        writeln!(
            writer,
            "{icon} {color}{BOLD}{:<17}{RESET} │ \
             {road} │ \
             {DIM}{}{RESET} │ \
             {description}",
            event.event_type, event.updated,
        )?;
        if !map.is_empty() {
            writeln!(writer, "   {DIM}{map}{RESET}")?;
        }
    }
    Ok(())
}

/// Write events as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, events: &[&EventRecord]) -> io::Result<()> {
    let output: Vec<OutputEvent> = events.iter().map(|e| OutputEvent::from(*e)).collect();
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write events as newline-delimited JSON.
///
/// Each event is written as a single line of JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, events: &[&EventRecord]) -> io::Result<()> {
    for event in events {
        let output = OutputEvent::from(*event);
        let json = serde_json::to_string(&output)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write a selection in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_selection<W: Write>(
    writer: &mut W,
    selection: &Selection<'_>,
    format: Format,
    renderer: &Renderer,
) -> io::Result<()> {
    match format {
        Format::Html => write_html(writer, selection, renderer, Local::now()),
        Format::Human => write_human(writer, selection),
        Format::Json => write_json(writer, &selection.events),
        Format::Ndjson => write_ndjson(writer, &selection.events),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Selector;
    use crate::models::tests::sample_feed;

    #[test]
    fn test_format_parse() {
        assert_eq!("html".parse::<Format>().unwrap(), Format::Html);
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("ndjson".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_ndjson_one_line_per_event() {
        let feed = sample_feed();
        let selection = Selector::default().select(&feed.events);
        let mut out = Vec::new();
        write_ndjson(&mut out, &selection.events).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 5);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["road"], "Highway 1");
        assert_eq!(first["subtype"], "FIRE");
        assert!(first["map_url"].as_str().unwrap().contains("q=50.4241,-121.4208"));
    }

    #[test]
    fn test_html_page_output() {
        let feed = sample_feed();
        let selection = Selector::Subtype {
            tag: "FIRE".to_string(),
        }
        .select(&feed.events);
        let mut out = Vec::new();
        write_selection(&mut out, &selection, Format::Html, &Renderer::default()).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("<!DOCTYPE html>"));
        assert!(text.contains("2 fire events of 5 total events"));
    }

    #[test]
    fn test_human_output_lists_summary_and_events() {
        let feed = sample_feed();
        let selection = Selector::default().select(&feed.events);
        let mut out = Vec::new();
        write_human(&mut out, &selection).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("5 major events of 5 total events"));
        assert!(text.contains("Highway 97C (W)"));
        assert!(text.contains("Unknown road"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
