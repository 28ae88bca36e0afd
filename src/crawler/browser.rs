//! Headless Chrome renderer over CDP
//!
//! One browser process is shared by every task; each task gets its own page.
//! All DOM interaction goes through small evaluated scripts so the same
//! [`RenderedPage`] surface can be faked in tests.

use crate::config::BrowserConfig as BrowserSettings;
use crate::crawler::page::{
    ControlInfo, ControlQuery, InterceptedPayload, PageRenderer, RenderError, RenderOptions,
    RenderedPage,
};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventResponseReceived, GetResponseBodyParams, RequestId,
    SetUserAgentOverrideParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use url::Url;

/// Common Chrome executable paths to check
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

/// URL fragments that mark a JSON response as a product data payload
const PAYLOAD_URL_MARKERS: &[&str] = &["product", "api", "data"];

const SCROLL_HEIGHT_SCRIPT: &str =
    "document.body ? Math.max(document.body.scrollHeight, document.documentElement.scrollHeight) : 0";

const SCROLL_BOTTOM_SCRIPT: &str =
    "window.scrollTo(0, document.body ? document.body.scrollHeight : 0); true";

const SCROLL_TOP_SCRIPT: &str = "window.scrollTo(0, 0); true";

const ANCHORS_SCRIPT: &str =
    "JSON.stringify(Array.from(document.querySelectorAll('a[href]')).map(a => a.href))";

const CONTENT_SCRIPT: &str = "document.documentElement ? document.documentElement.outerHTML : ''";

/// Tags matching elements with a stable id and describes them
const FIND_CONTROLS_SCRIPT: &str = r#"
(() => {
    const selector = __SELECTOR__;
    const wanted = __TEXT__;
    const out = [];
    let nodes = [];
    try {
        nodes = Array.from(document.querySelectorAll(selector));
    } catch (e) {
        return JSON.stringify(out);
    }
    for (const el of nodes) {
        const label = (el.innerText || el.textContent || '').trim();
        if (wanted !== null && !label.toLowerCase().includes(wanted.toLowerCase())) {
            continue;
        }
        if (!el.dataset.harvestId) {
            window.__harvestSeq = (window.__harvestSeq || 0) + 1;
            el.dataset.harvestId = 'c' + window.__harvestSeq;
        }
        const ancestry = [];
        let parent = el.parentElement;
        for (let depth = 0; parent && depth < 3; depth++, parent = parent.parentElement) {
            ancestry.push(parent.tagName.toLowerCase());
            if (typeof parent.className === 'string' && parent.className) {
                ancestry.push(parent.className);
            }
        }
        const rect = el.getBoundingClientRect();
        const style = window.getComputedStyle(el);
        out.push({
            id: el.dataset.harvestId,
            class: typeof el.className === 'string' ? el.className : '',
            ancestry: ancestry.join(' '),
            text: label.slice(0, 80),
            visible: rect.width > 0 && rect.height > 0
                && style.visibility !== 'hidden' && style.display !== 'none',
            enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
        });
    }
    return JSON.stringify(out);
})()
"#;

const CLICK_SCRIPT: &str = r#"
(() => {
    const el = document.querySelector('[data-harvest-id=' + __ID__ + ']');
    if (!el) {
        return false;
    }
    el.scrollIntoView({ block: 'center' });
    el.click();
    return true;
})()
"#;

/// Shared headless browser
pub struct ChromeRenderer {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    settings: BrowserSettings,
    user_agent: String,
}

impl ChromeRenderer {
    /// Launches the browser and spawns its CDP handler task
    ///
    /// # Returns
    ///
    /// * `Ok(ChromeRenderer)` - Browser is running
    /// * `Err(RenderError::Launch)` - No binary found or the process failed to start
    pub async fn launch(settings: &BrowserSettings, user_agent: &str) -> Result<Self, RenderError> {
        let chrome_path = match &settings.chrome_executable {
            Some(path) => path.clone(),
            None => find_chrome().ok_or_else(|| {
                RenderError::Launch("no Chrome/Chromium executable found".to_string())
            })?,
        };

        tracing::info!(
            "Launching browser at {} (headless={})",
            chrome_path.display(),
            settings.headless
        );

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        if !settings.headless {
            builder = builder.with_head();
        }
        let config = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .build()
            .map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler_task,
            settings: settings.clone(),
            user_agent: user_agent.to_string(),
        })
    }

    /// Closes the browser process
    pub async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            tracing::debug!("Browser close reported: {}", e);
        }
        self.handler_task.abort();
    }

    async fn navigate(&self, page: &Page, url: &Url) -> Result<(), RenderError> {
        let primary = Duration::from_secs(self.settings.navigation_timeout_secs);
        match tokio::time::timeout(primary, page.goto(url.as_str())).await {
            Ok(Ok(_)) => return Ok(()),
            Ok(Err(e)) => return Err(RenderError::Navigation(e.to_string())),
            Err(_) => {
                tracing::warn!(
                    "Navigation to {} exceeded {}s, retrying best-effort",
                    url,
                    primary.as_secs()
                );
            }
        }

        let fallback = Duration::from_secs(self.settings.fallback_timeout_secs);
        match tokio::time::timeout(fallback, page.goto(url.as_str())).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RenderError::Navigation(e.to_string())),
            Err(_) => {
                tracing::debug!("Best-effort load of {} timed out, using partial DOM", url);
                Ok(())
            }
        }
    }

    async fn open_page(&self, url: &Url, options: RenderOptions) -> Result<ChromePage, RenderError> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| RenderError::Launch(e.to_string()))?
        };
        // From here on the guard closes the page on every path
        let mut guarded = ChromePage::new(page);
        let page = guarded.page()?.clone();

        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        if options.intercept_payloads {
            guarded.start_interception().await;
        }

        self.navigate(&page, url).await?;
        tokio::time::sleep(Duration::from_millis(self.settings.initial_settle_ms)).await;

        Ok(guarded)
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn open(
        &self,
        url: &Url,
        options: RenderOptions,
    ) -> Result<Box<dyn RenderedPage>, RenderError> {
        let page = self.open_page(url, options).await?;
        Ok(Box::new(page))
    }
}

/// A CDP page that closes itself if dropped without [`RenderedPage::close`]
struct ChromePage {
    page: Option<Page>,
    captured: Arc<StdMutex<Vec<(String, RequestId)>>>,
    collector: Option<JoinHandle<()>>,
}

impl ChromePage {
    fn new(page: Page) -> Self {
        Self {
            page: Some(page),
            captured: Arc::new(StdMutex::new(Vec::new())),
            collector: None,
        }
    }

    fn page(&self) -> Result<&Page, RenderError> {
        self.page.as_ref().ok_or(RenderError::Closed)
    }

    /// Records the request ids of JSON responses as they arrive
    async fn start_interception(&mut self) {
        let Ok(page) = self.page() else {
            return;
        };

        if let Err(e) = page.execute(EnableParams::default()).await {
            tracing::debug!("Failed to enable network events: {}", e);
            return;
        }

        let mut events = match page.event_listener::<EventResponseReceived>().await {
            Ok(events) => events,
            Err(e) => {
                tracing::debug!("Failed to subscribe to responses: {}", e);
                return;
            }
        };

        let captured = Arc::clone(&self.captured);
        self.collector = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if is_payload_response(&event.response.url, &event.response.mime_type) {
                    if let Ok(mut captured) = captured.lock() {
                        captured.push((event.response.url.clone(), event.request_id.clone()));
                    }
                }
            }
        }));
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, RenderError> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| RenderError::Script(e.to_string()))
    }

    /// Evaluates a script that returns `JSON.stringify(..)`
    async fn eval_json<T: DeserializeOwned>(&self, script: String) -> Result<T, RenderError> {
        let raw: String = self.eval(script).await?;
        serde_json::from_str(&raw).map_err(|e| RenderError::Script(e.to_string()))
    }
}

#[async_trait]
impl RenderedPage for ChromePage {
    async fn scroll_height(&mut self) -> Result<u64, RenderError> {
        let height: f64 = self.eval(SCROLL_HEIGHT_SCRIPT.to_string()).await?;
        Ok(height.max(0.0) as u64)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), RenderError> {
        self.eval::<bool>(SCROLL_BOTTOM_SCRIPT.to_string()).await.map(|_| ())
    }

    async fn scroll_to_top(&mut self) -> Result<(), RenderError> {
        self.eval::<bool>(SCROLL_TOP_SCRIPT.to_string()).await.map(|_| ())
    }

    async fn find_controls(
        &mut self,
        query: &ControlQuery,
    ) -> Result<Vec<ControlInfo>, RenderError> {
        let selector = serde_json::to_string(query.selector)
            .map_err(|e| RenderError::Script(e.to_string()))?;
        let text = serde_json::to_string(&query.text)
            .map_err(|e| RenderError::Script(e.to_string()))?;
        let script = FIND_CONTROLS_SCRIPT
            .replace("__SELECTOR__", &selector)
            .replace("__TEXT__", &text);
        self.eval_json(script).await
    }

    async fn click(&mut self, control: &ControlInfo) -> Result<(), RenderError> {
        let id = serde_json::to_string(&control.id)
            .map_err(|e| RenderError::Script(e.to_string()))?;
        let clicked: bool = self.eval(CLICK_SCRIPT.replace("__ID__", &id)).await?;
        if clicked {
            Ok(())
        } else {
            Err(RenderError::Script(format!(
                "control {} is no longer in the DOM",
                control.id
            )))
        }
    }

    async fn anchor_hrefs(&mut self) -> Result<Vec<String>, RenderError> {
        self.eval_json(ANCHORS_SCRIPT.to_string()).await
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        match self.page()?.content().await {
            Ok(html) => Ok(html),
            Err(_) => self.eval(CONTENT_SCRIPT.to_string()).await,
        }
    }

    async fn intercepted_payloads(&mut self) -> Vec<InterceptedPayload> {
        let captured = match self.captured.lock() {
            Ok(mut captured) => std::mem::take(&mut *captured),
            Err(_) => return Vec::new(),
        };
        let Ok(page) = self.page() else {
            return Vec::new();
        };

        let mut payloads = Vec::new();
        for (url, request_id) in captured {
            let body = match page.execute(GetResponseBodyParams::new(request_id)).await {
                Ok(response) if !response.result.base64_encoded => response.result.body.clone(),
                Ok(_) => continue,
                Err(e) => {
                    tracing::trace!("No body for {}: {}", url, e);
                    continue;
                }
            };
            match serde_json::from_str(&body) {
                Ok(body) => payloads.push(InterceptedPayload { url, body }),
                Err(e) => tracing::trace!("Ignoring non-JSON payload from {}: {}", url, e),
            }
        }
        payloads
    }

    async fn close(self: Box<Self>) {
        let mut this = self;
        if let Some(collector) = this.collector.take() {
            collector.abort();
        }
        if let Some(page) = this.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!("Failed to close page: {}", e);
            }
        }
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
        if let Some(page) = self.page.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = page.close().await;
                });
            }
        }
    }
}

/// JSON responses whose URL looks like a product data endpoint
fn is_payload_response(url: &str, mime_type: &str) -> bool {
    let url = url.to_lowercase();
    mime_type.to_lowercase().contains("json")
        && PAYLOAD_URL_MARKERS.iter().any(|m| url.contains(m))
}

fn find_chrome() -> Option<PathBuf> {
    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            return Some(p.to_path_buf());
        }
    }

    for cmd in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(PathBuf::from(path));
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_filter() {
        assert!(is_payload_response(
            "https://www.samsung.com/uk/api/v4/configurator/product",
            "application/json"
        ));
        assert!(is_payload_response(
            "https://api.example.com/x",
            "application/json; charset=utf-8"
        ));
        assert!(!is_payload_response(
            "https://www.samsung.com/uk/product.css",
            "text/css"
        ));
        assert!(!is_payload_response(
            "https://www.samsung.com/uk/config.json",
            "application/json"
        ));
    }

    #[test]
    fn test_find_controls_script_substitution() {
        let selector = serde_json::to_string("button[class*=\"view-more\"]").unwrap();
        let text = serde_json::to_string(&Some("View more")).unwrap();
        let script = FIND_CONTROLS_SCRIPT
            .replace("__SELECTOR__", &selector)
            .replace("__TEXT__", &text);
        assert!(script.contains(r#"const selector = "button[class*=\"view-more\"]";"#));
        assert!(script.contains(r#"const wanted = "View more";"#));

        let none = serde_json::to_string(&None::<&str>).unwrap();
        assert_eq!(none, "null");
    }
}
