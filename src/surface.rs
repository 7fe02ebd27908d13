//! Presentation surfaces.
//!
//! A surface exposes the three regions a render cycle writes to (counter,
//! acquisition time, table) plus a notice area for fetch errors. The
//! renderer never looks regions up by itself; it is handed a surface.

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::errors::RoadtailError;

/// Maximum number of error notices kept on a page.
pub const MAX_NOTICES: usize = 50;

/// Write operations a render cycle needs.
pub trait Surface {
    /// Replace the counter text.
    fn set_count(&mut self, text: &str);

    /// Replace the acquisition-time text.
    fn set_timestamp(&mut self, text: &str);

    /// Replace the whole table region with `html`.
    fn set_table(&mut self, html: String);

    /// Append one notice fragment without touching other regions.
    fn append_notice(&mut self, html: String);

    /// Publish the current state, called once at the end of every cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface could not be published.
    fn flush(&mut self) -> impl Future<Output = Result<(), RoadtailError>> + Send {
        async { Ok(()) }
    }
}

/// In-memory page holding the rendered regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlPage {
    count: String,
    timestamp: String,
    table: String,
    notices: VecDeque<String>,
}

impl HtmlPage {
    #[must_use]
    pub fn count(&self) -> &str {
        &self.count
    }

    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn notices(&self) -> impl Iterator<Item = &str> {
        self.notices.iter().map(String::as_str)
    }

    /// The four regions as an HTML fragment.
    #[must_use]
    pub fn regions(&self) -> String {
        let notices: String = self.notices().collect();
        format!(
            r#"<p class="summary"><span id="incidentcount">{count}</span> as of <span id="thetime">{time}</span></p>
<div id="TableHere">{table}</div>
<div id="datahere">{notices}</div>"#,
            count = escape_html(&self.count),
            time = escape_html(&self.timestamp),
            table = self.table(),
        )
    }

    /// A standalone HTML document with the regions.
    #[must_use]
    pub fn document(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Road Events</title>
    <style>{PAGE_CSS}</style>
</head>
<body>
{regions}
</body>
</html>
"#,
            regions = self.regions(),
        )
    }
}

impl Surface for HtmlPage {
    fn set_count(&mut self, text: &str) {
        text.clone_into(&mut self.count);
    }

    fn set_timestamp(&mut self, text: &str) {
        text.clone_into(&mut self.timestamp);
    }

    fn set_table(&mut self, html: String) {
        self.table = html;
    }

    fn append_notice(&mut self, html: String) {
        if self.notices.len() >= MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(html);
    }
}

/// Page that rewrites an HTML file every time it is flushed.
#[derive(Debug)]
pub struct PageFile {
    page: HtmlPage,
    path: PathBuf,
}

impl PageFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            page: HtmlPage::default(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn page(&self) -> &HtmlPage {
        &self.page
    }
}

impl Surface for PageFile {
    fn set_count(&mut self, text: &str) {
        self.page.set_count(text);
    }

    fn set_timestamp(&mut self, text: &str) {
        self.page.set_timestamp(text);
    }

    fn set_table(&mut self, html: String) {
        self.page.set_table(html);
    }

    fn append_notice(&mut self, html: String) {
        self.page.append_notice(html);
    }

    async fn flush(&mut self) -> Result<(), RoadtailError> {
        // Readers never see a half-written page
        let tmp = self.path.with_extension("html.tmp");
        tokio::fs::write(&tmp, self.page.document()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Escape text for insertion into HTML content or attribute values.
#[must_use]
pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const PAGE_CSS: &str = r"
body { font-family: -apple-system, BlinkMacSystemFont, sans-serif; margin: 2rem; color: #1f2937; }
.summary { font-weight: 600; }
#theTable { border-collapse: collapse; width: 100%; }
#theTable td { border-bottom: 1px solid #e5e7eb; padding: 0.5rem; vertical-align: top; }
.datecell { white-space: nowrap; width: 14rem; }
.noevents { color: #6b7280; font-style: italic; }
.error { color: #b91c1c; }
";
