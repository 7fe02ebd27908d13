//! Web server for the roadtail UI.
//!
//! Serves the rendered page and pushes every refresh to the browser using:
//! - Axum for HTTP server
//! - SSE (Server-Sent Events) for real-time updates
//! - HTMX for swapping the page regions without custom JavaScript

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    response::{
        Html,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use tokio::sync::{Mutex, broadcast};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::client::Open511Client;
use crate::config::FeedConfig;
use crate::errors::RoadtailError;
use crate::poller::Poller;
use crate::render::Renderer;
use crate::surface::{HtmlPage, Surface};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub feed: FeedConfig,
}

/// Page that broadcasts its regions to SSE subscribers on every flush.
#[derive(Debug)]
pub struct LivePage {
    page: HtmlPage,
    tx: broadcast::Sender<String>,
}

impl LivePage {
    #[must_use]
    pub fn new(tx: broadcast::Sender<String>) -> Self {
        Self {
            page: HtmlPage::default(),
            tx,
        }
    }

    #[must_use]
    pub fn page(&self) -> &HtmlPage {
        &self.page
    }
}

impl Surface for LivePage {
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
        // No subscribers is fine
        let _ = self.tx.send(self.page.regions());
        Ok(())
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Channel for broadcasting refreshed regions to SSE clients
    tx: broadcast::Sender<String>,
    /// The page the poller renders onto
    page: Arc<Mutex<LivePage>>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/page", get(page_handler))
        .route("/stream", get(sse_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start polling and serve the UI until Ctrl+C.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    // Create broadcast channel for SSE
    let (tx, _rx) = broadcast::channel::<String>(16);
    let page = Arc::new(Mutex::new(LivePage::new(tx.clone())));

    let client = Open511Client::new(&config.feed)?;
    tracing::info!("polling {}", client.url());
    let poller = Poller::new(
        client,
        config.feed.selector(),
        Renderer::new(config.feed.markup()),
        Arc::clone(&page),
    );
    let handle = poller.spawn(config.feed.poll_interval());

    let app = create_router(AppState { tx, page });

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("roadtail UI starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    handle.stop().await;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - the current regions wrapped in the live template.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let regions = state.page.lock().await.page().regions();
    Html(INDEX_HTML.replace("{{regions}}", &regions))
}

/// Current regions as a fragment.
async fn page_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.page.lock().await.page().regions())
}

/// SSE stream handler for page refreshes.
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(html) => Some(Ok(Event::default().event("refresh").data(html))),
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>roadtail - Road Events</title>

    <!-- HTMX + SSE -->
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>
    <script src="https://unpkg.com/htmx.org@1.9.10/dist/ext/sse.js"></script>

    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, sans-serif; margin: 2rem; color: #1f2937; }
        .summary { font-weight: 600; }
        #theTable { border-collapse: collapse; width: 100%; }
        #theTable td { border-bottom: 1px solid #e5e7eb; padding: 0.5rem; vertical-align: top; }
        .datecell { white-space: nowrap; width: 14rem; }
        .noevents { color: #6b7280; font-style: italic; }
        .error { color: #b91c1c; }
    </style>
</head>
<body>
    <h1>Road Events</h1>
    <div id="regions" hx-ext="sse" sse-connect="/stream" sse-swap="refresh">
{{regions}}
    </div>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_live_page_broadcasts_on_flush() {
        let (tx, mut rx) = broadcast::channel(4);
        let mut page = LivePage::new(tx);
        page.set_count("1 major events of 3 total events");
        page.flush().await.expect("flush");

        let pushed = rx.try_recv().expect("refresh sent");
        assert!(pushed.contains("1 major events of 3 total events"));
        assert_eq!(pushed, page.page().regions());
    }

    #[tokio::test]
    async fn test_flush_without_subscribers() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        let mut page = LivePage::new(tx);
        assert!(page.flush().await.is_ok());
    }

    #[tokio::test]
    async fn test_routes_serve_current_page() {
        let (tx, _rx) = broadcast::channel(4);
        let page = Arc::new(Mutex::new(LivePage::new(tx.clone())));
        page.lock().await.set_count("0 fire events of 0 total events");

        let app = create_router(AppState { tx, page });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let base = format!("http://{addr}");
        let health = reqwest::get(format!("{base}/health")).await.expect("health");
        assert_eq!(health.text().await.expect("body"), "OK");

        let index = reqwest::get(format!("{base}/")).await.expect("index");
        let body = index.text().await.expect("body");
        assert!(body.contains(r#"sse-connect="/stream""#));
        assert!(body.contains("0 fire events of 0 total events"));
        assert!(!body.contains("{{regions}}"));
    }
}
