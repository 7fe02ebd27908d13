//! HTML rendering of a selection onto a [`Surface`].

use std::fmt::Write as _;

use chrono::{DateTime, Local};

use crate::filters::Selection;
use crate::geo;
use crate::models::EventRecord;
use crate::surface::{Surface, escape_html};

/// Local time format used for the acquisition time.
pub const TIME_FORMAT: &str = "%-I:%M:%S %p";

/// Fragment shown when nothing was selected.
pub const NO_EVENTS_HTML: &str = r#"<p class="noevents">No events at this time</p>"#;

/// How feed text is inserted into the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Markup {
    /// Escape feed text (default)
    #[default]
    Escaped,
    /// Insert feed text as-is, matching legacy pages
    Raw,
}

/// Renders selections as a table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    markup: Markup,
}

impl Renderer {
    #[must_use]
    pub const fn new(markup: Markup) -> Self {
        Self { markup }
    }

    /// Render one cycle's selection.
    ///
    /// Updates the time and counter, then replaces the table region. An
    /// empty selection renders only the placeholder.
    pub fn render<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        selection: &Selection<'_>,
        acquired: DateTime<Local>,
    ) {
        surface.set_timestamp(&acquired.format(TIME_FORMAT).to_string());
        surface.set_count(&selection.summary());

        if selection.is_empty() {
            surface.set_table(NO_EVENTS_HTML.to_string());
            return;
        }

        surface.set_table(self.table(&selection.events));
    }

    /// Build the table for a non-empty list of events.
    #[must_use]
    pub fn table(&self, events: &[&EventRecord]) -> String {
        let mut html = String::from(r#"<table id="theTable">"#);
        for event in events {
            html.push_str(&self.row(event));
        }
        html.push_str("</table>");
        html
    }

    fn row(&self, event: &EventRecord) -> String {
        let url = geo::map_url(event.geography.as_ref());
        let created = self.text(&event.created);

        let mut first = String::new();
        let _ = write!(
            first,
            "{}<br>{}<br>{}",
            self.text(&event.event_type),
            self.text(event.primary_road()),
            created,
        );
        if !url.is_empty() {
            let _ = write!(
                first,
                "<br><a target='_blank' href='{}'>MAP</a>",
                escape_html(&url)
            );
        }

        format!(
            r#"<tr><td class="datecell">{first}</td><td>{description}<br><em>Created: {created}<br>Updated: {updated}</em></td></tr>"#,
            description = self.text(&event.description),
            updated = self.text(&event.updated),
        )
    }

    fn text(&self, value: &str) -> String {
        match self.markup {
            Markup::Escaped => escape_html(value),
            Markup::Raw => value.to_string(),
        }
    }
}
