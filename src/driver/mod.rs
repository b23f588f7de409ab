//! Browser driver abstraction.
//!
//! The orchestrator and extraction engine talk to the page through the
//! [`UiDriver`] trait so the interaction flow can be exercised in tests with
//! a scripted mock. The one production implementation wraps a fantoccini
//! WebDriver session.

pub mod webdriver;

pub use webdriver::WebDriverSession;

use crate::behavior::{Keystroke, MovePlan, PathPoint};
use crate::core::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// A cookie restored from a saved session blob.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(rename = "httpOnly", default)]
    pub http_only: bool,
    #[serde(default)]
    pub expires: Option<f64>,
}

fn default_cookie_path() -> String {
    "/".to_string()
}

/// Async surface over the live page. Every method maps to one or a few
/// WebDriver commands; higher-level sequencing lives in the orchestrator.
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Navigates the session to `url`.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// The URL currently loaded, used to decide whether navigation is needed.
    async fn current_url(&self) -> Result<String>;

    /// Installs one restored cookie into the live session.
    async fn add_cookie(&self, cookie: &SessionCookie) -> Result<()>;

    /// Plain click on the first element matching the CSS selector.
    async fn click(&self, css: &str) -> Result<()>;

    /// Replays a planned pointer move and clicks at its end point.
    async fn replay_pointer(&self, plan: &MovePlan) -> Result<()>;

    /// Waits until an element matching `css` is present and displayed.
    async fn wait_visible(&self, css: &str, timeout: Duration) -> Result<()>;

    /// Visible text content of the first element matching `css`.
    async fn inner_text(&self, css: &str) -> Result<String>;

    /// Clicks `css` and replays a keystroke script into it.
    async fn type_script(&self, css: &str, script: &[Keystroke]) -> Result<()>;

    /// Page-center coordinates of the recipient token whose visible text
    /// equals `text` (case-insensitive). `None` when no such token exists.
    async fn locate_token(&self, text: &str) -> Result<Option<PathPoint>>;

    /// Sends Escape to the active element.
    async fn press_escape(&self) -> Result<()>;

    /// Moves focus away from the current field so the page resolves
    /// recipient tokens.
    async fn blur(&self) -> Result<()>;

    /// Captures a PNG of the current viewport.
    async fn screenshot(&self, path: &Path) -> Result<()>;
}
