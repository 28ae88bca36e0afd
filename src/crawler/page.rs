//! Browser automation seam
//!
//! The expander and extraction chain drive rendered pages through these
//! traits. [`crate::crawler::ChromeRenderer`] implements them over CDP; tests
//! implement them in memory.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Errors raised while rendering or driving a page
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("page is closed")]
    Closed,
}

/// Options for opening a page
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Capture JSON responses while the page loads
    pub intercept_payloads: bool,
}

/// A CSS selector with an optional case-insensitive text filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlQuery {
    pub selector: &'static str,
    pub text: Option<&'static str>,
}

impl ControlQuery {
    pub const fn css(selector: &'static str) -> Self {
        Self {
            selector,
            text: None,
        }
    }

    pub const fn with_text(selector: &'static str, text: &'static str) -> Self {
        Self {
            selector,
            text: Some(text),
        }
    }
}

/// Snapshot of a clickable element
///
/// `id` is stable for the lifetime of the element on the page, so a
/// control can be recognised again after the DOM changes around it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlInfo {
    pub id: String,
    #[serde(default)]
    pub class: String,
    /// Tag names and classes of the nearest ancestors, space separated
    #[serde(default)]
    pub ancestry: String,
    #[serde(default)]
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
}

/// A JSON response captured during rendering
#[derive(Debug, Clone)]
pub struct InterceptedPayload {
    pub url: String,
    pub body: serde_json::Value,
}

/// Opens rendered pages
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigates to `url` and waits for the initial render
    async fn open(
        &self,
        url: &Url,
        options: RenderOptions,
    ) -> Result<Box<dyn RenderedPage>, RenderError>;
}

/// A live rendered page
///
/// Callers must call [`RenderedPage::close`] on every exit path.
#[async_trait]
pub trait RenderedPage: Send {
    /// Current document scroll height in pixels
    async fn scroll_height(&mut self) -> Result<u64, RenderError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), RenderError>;

    async fn scroll_to_top(&mut self) -> Result<(), RenderError>;

    /// Elements matching the query, in document order
    async fn find_controls(
        &mut self,
        query: &ControlQuery,
    ) -> Result<Vec<ControlInfo>, RenderError>;

    /// Clicks a control previously returned by `find_controls`
    async fn click(&mut self, control: &ControlInfo) -> Result<(), RenderError>;

    /// The `href` attribute of every anchor currently in the DOM
    async fn anchor_hrefs(&mut self) -> Result<Vec<String>, RenderError>;

    /// Serialized DOM
    async fn content(&mut self) -> Result<String, RenderError>;

    /// JSON responses captured since the page was opened
    async fn intercepted_payloads(&mut self) -> Vec<InterceptedPayload>;

    async fn close(self: Box<Self>);
}
