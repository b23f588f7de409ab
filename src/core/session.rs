//! Saved-session handling.
//!
//! Authentication is out of scope: the operator logs in once, saves a
//! storage-state blob (cookies plus per-origin storage), and every run
//! restores it. The blob is validated before any batch starts so a stale or
//! empty session fails fast instead of mid-run.

use crate::core::error::{AppError, Result};
use crate::driver::{SessionCookie, UiDriver};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Parsed storage-state blob. Origin storage is carried opaquely; only the
/// cookies are replayed into the live session.
#[derive(Debug, Default, Deserialize)]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<SessionCookie>,
    #[serde(default)]
    pub origins: Vec<serde_json::Value>,
}

/// Loads and validates a saved session blob from disk.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the blob. Missing file and malformed JSON both map
    /// to `SessionInvalid` so the caller gets one precondition error kind.
    pub fn load(&self) -> Result<StorageState> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            AppError::SessionInvalid(format!(
                "cannot read session file '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::SessionInvalid(format!(
                "session file '{}' is not a valid storage state: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Loads the blob and checks it holds at least one cookie scoped to the
    /// target page's host.
    pub fn load_validated(&self, page_url: &str) -> Result<StorageState> {
        let state = self.load()?;
        if state.cookies.is_empty() {
            return Err(AppError::SessionInvalid(format!(
                "session file '{}' contains no cookies",
                self.path.display()
            )));
        }

        let host = host_of(page_url);
        let relevant = state
            .cookies
            .iter()
            .filter(|c| domain_matches(&c.domain, &host))
            .count();
        if relevant == 0 {
            return Err(AppError::SessionInvalid(format!(
                "no cookies in '{}' apply to host '{}'",
                self.path.display(),
                host
            )));
        }

        tracing::debug!(
            target: "session",
            "Session blob valid: {} cookies ({} for {})",
            state.cookies.len(),
            relevant,
            host
        );
        Ok(state)
    }

    /// Replays every cookie into the live session. The driver must already
    /// be on the target origin; WebDriver rejects cross-origin cookies.
    pub async fn apply<D: UiDriver + ?Sized>(&self, driver: &D, state: &StorageState) -> Result<()> {
        for cookie in &state.cookies {
            if let Err(e) = driver.add_cookie(cookie).await {
                // Expired or mis-scoped individual cookies are not fatal.
                tracing::warn!(target: "session", "Skipping cookie '{}': {}", cookie.name, e);
            }
        }
        Ok(())
    }
}

/// Host part of a URL, without pulling in a full URL parser.
fn host_of(url: &str) -> String {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme)
        .split('@')
        .last()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Cookie-style domain match: exact host, or the cookie domain is a parent
/// domain of the host (leading dot ignored).
fn domain_matches(cookie_domain: &str, host: &str) -> bool {
    let domain = cookie_domain.trim_start_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}
