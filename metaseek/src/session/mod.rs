//! Shared headless-browser session.
//!
//! One browser process per application, created lazily on first use and
//! shared by every caller. When a render fails, callers invoke [`reset`] and
//! the next [`acquire`] launches a fresh process.

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EventResponseReceived, ResourceType};
use futures::StreamExt;
use once_cell::sync::Lazy;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::MetaseekError;

/// How long media interception listens after navigation starts.
const CAPTURE_WINDOW: Duration = Duration::from_secs(4);

static SESSION: Lazy<Mutex<Option<Arc<BrowserSession>>>> = Lazy::new(|| Mutex::new(None));

/// A launched browser process plus its CDP event pump.
pub struct BrowserSession {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
}

impl BrowserSession {
    async fn launch() -> Result<Self, MetaseekError> {
        let config = BrowserConfig::builder()
            .build()
            .map_err(MetaseekError::Session)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| MetaseekError::Session(e.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        info!("browser session launched");
        Ok(Self {
            browser,
            handler_task,
        })
    }

    fn is_healthy(&self) -> bool {
        !self.handler_task.is_finished()
    }

    /// Navigates to `url`, waits for the page to settle, and returns the
    /// rendered markup.
    pub async fn render(&self, url: &str) -> Result<String, MetaseekError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| MetaseekError::Session(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| MetaseekError::Session(e.to_string()))?;
        let html = page
            .content()
            .await
            .map_err(|e| MetaseekError::Session(e.to_string()))?;
        if let Err(e) = page.close().await {
            warn!(error = %e, "page close failed");
        }
        Ok(html)
    }

    /// Navigates to `url` and collects the addresses of media responses seen
    /// on the wire within a bounded window.
    pub async fn capture_media(&self, url: &str) -> Result<Vec<String>, MetaseekError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| MetaseekError::Session(e.to_string()))?;
        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| MetaseekError::Session(e.to_string()))?;
        page.goto(url)
            .await
            .map_err(|e| MetaseekError::Session(e.to_string()))?;

        let mut urls = Vec::new();
        let deadline = tokio::time::sleep(CAPTURE_WINDOW);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                () = &mut deadline => break,
                event = events.next() => {
                    let Some(event) = event else { break };
                    let mime = event.response.mime_type.to_lowercase();
                    if event.r#type == ResourceType::Media
                        || mime.starts_with("video/")
                        || mime.contains("mpegurl")
                        || mime.contains("dash+xml")
                    {
                        debug!(url = %event.response.url, mime, "intercepted media response");
                        urls.push(event.response.url.clone());
                    }
                }
            }
        }

        if let Err(e) = page.close().await {
            warn!(error = %e, "page close failed");
        }
        Ok(urls)
    }
}

/// Returns the shared session, launching the browser on first use or after a
/// [`reset`].
pub async fn acquire() -> Result<Arc<BrowserSession>, MetaseekError> {
    let mut slot = SESSION.lock().await;
    if let Some(session) = slot.as_ref() {
        if session.is_healthy() {
            return Ok(Arc::clone(session));
        }
        warn!("browser session unhealthy, relaunching");
        slot.take();
    }
    let session = Arc::new(BrowserSession::launch().await?);
    *slot = Some(Arc::clone(&session));
    Ok(session)
}

/// Evicts the shared session so the next [`acquire`] starts fresh.
pub async fn reset() {
    let mut slot = SESSION.lock().await;
    if let Some(session) = slot.take() {
        session.handler_task.abort();
        info!("browser session evicted");
    }
}
