//! fantoccini-backed [`UiDriver`].
//!
//! One WebDriver session per run. Pointer plans and keystroke scripts from
//! the behavior layer are replayed here as W3C action sequences and
//! element-level key input.

use super::{SessionCookie, UiDriver};
use crate::behavior::{Key, Keystroke, MovePlan, PathPoint};
use crate::core::config::Config;
use crate::core::error::Result;
use async_trait::async_trait;
use fantoccini::actions::{InputSource, MouseActions, PointerAction, MOUSE_BUTTON_LEFT};
use fantoccini::cookies::Cookie;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::map::Map as JsonMap;
use std::path::Path;
use std::time::Duration;

pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    /// Connects to the WebDriver endpoint with Chrome capabilities and the
    /// given user agent.
    pub async fn connect(config: &Config, user_agent: &str) -> Result<Self> {
        tracing::debug!(target: "driver", "Connecting to WebDriver at {}...", config.webdriver_url);

        let mut caps = JsonMap::new();
        let mut chrome_opts = JsonMap::new();

        let ua_arg = format!("--user-agent={}", user_agent);
        let mut args = vec![
            "--no-sandbox",
            "--disable-gpu",
            "--disable-dev-shm-usage",
            "--window-size=1280,900",
            "--disable-extensions",
            "--disable-background-networking",
            "--disable-sync",
            "--disable-translate",
            "--mute-audio",
            "--disable-blink-features=AutomationControlled",
            "--log-level=1",
            ua_arg.as_str(),
        ];
        if config.headless {
            args.push("--headless=new");
        }
        chrome_opts.insert("args".to_string(), serde_json::json!(args));
        chrome_opts.insert(
            "excludeSwitches".to_string(),
            serde_json::json!(["enable-automation"]),
        );

        caps.insert("browserName".to_string(), serde_json::json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!(chrome_opts),
        );

        let mut builder = ClientBuilder::native();
        builder.capabilities(caps);

        match builder.connect(&config.webdriver_url).await {
            Ok(client) => {
                tracing::info!(target: "driver", "WebDriver session established.");
                Ok(Self { client })
            }
            Err(e) => {
                tracing::error!(
                    target: "driver",
                    "Failed to connect to WebDriver at {}: {}",
                    config.webdriver_url,
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Ends the session, logging instead of failing on teardown errors.
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            tracing::warn!(target: "driver", "WebDriver session did not close cleanly: {}", e);
        }
    }
}

#[async_trait]
impl UiDriver for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.client.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn add_cookie(&self, cookie: &SessionCookie) -> Result<()> {
        let mut built = Cookie::new(cookie.name.clone(), cookie.value.clone());
        built.set_domain(cookie.domain.trim_start_matches('.').to_string());
        built.set_path(cookie.path.clone());
        built.set_secure(cookie.secure);
        built.set_http_only(cookie.http_only);
        self.client.add_cookie(built).await?;
        Ok(())
    }

    async fn click(&self, css: &str) -> Result<()> {
        let element = self.client.find(Locator::Css(css)).await?;
        element.click().await?;
        Ok(())
    }

    async fn replay_pointer(&self, plan: &MovePlan) -> Result<()> {
        for segment in &plan.segments {
            if segment.points.is_empty() {
                continue;
            }
            let step_duration = segment.duration / segment.points.len() as u32;
            let mut actions = MouseActions::new("mouse".to_string());
            for point in &segment.points {
                actions = actions.then(PointerAction::MoveTo {
                    duration: Some(step_duration),
                    x: point.x.round() as i64,
                    y: point.y.round() as i64,
                });
            }
            self.client.perform_actions(actions).await?;
            if !segment.pause_after.is_zero() {
                tokio::time::sleep(segment.pause_after).await;
            }
        }

        tokio::time::sleep(plan.pause_before_click).await;
        let click = MouseActions::new("mouse".to_string())
            .then(PointerAction::Down {
                button: MOUSE_BUTTON_LEFT,
            })
            .then(PointerAction::Up {
                button: MOUSE_BUTTON_LEFT,
            });
        self.client.perform_actions(click).await?;
        Ok(())
    }

    async fn wait_visible(&self, css: &str, timeout: Duration) -> Result<()> {
        let element = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(css))
            .await?;
        // Presence without visibility happens while the card animates in; a
        // short grace poll covers it.
        if !element.is_displayed().await? {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(())
    }

    async fn inner_text(&self, css: &str) -> Result<String> {
        let element = self.client.find(Locator::Css(css)).await?;
        Ok(element.text().await?)
    }

    async fn type_script(&self, css: &str, script: &[Keystroke]) -> Result<()> {
        let element = self.client.find(Locator::Css(css)).await?;
        element.click().await?;
        for stroke in script {
            if !stroke.delay_before.is_zero() {
                tokio::time::sleep(stroke.delay_before).await;
            }
            let text = match &stroke.key {
                Key::Char(c) => c.to_string(),
                Key::Backspace => char::from(fantoccini::key::Key::Backspace).to_string(),
            };
            element.send_keys(&text).await?;
        }
        Ok(())
    }

    async fn locate_token(&self, text: &str) -> Result<Option<PathPoint>> {
        let xpath = format!(
            "//span[translate(normalize-space(.), \
             'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz')={}]",
            xpath_literal(&text.to_lowercase())
        );
        let candidates = self.client.find_all(Locator::XPath(&xpath)).await?;
        for element in candidates {
            if element.is_displayed().await.unwrap_or(false) {
                let (x, y, w, h) = element.rectangle().await?;
                return Ok(Some(PathPoint::new(x + w / 2.0, y + h / 2.0)));
            }
        }
        Ok(None)
    }

    async fn press_escape(&self) -> Result<()> {
        let active = self.client.active_element().await?;
        active
            .send_keys(&char::from(fantoccini::key::Key::Escape).to_string())
            .await?;
        Ok(())
    }

    async fn blur(&self) -> Result<()> {
        self.client
            .execute(
                "if (document.activeElement) document.activeElement.blur();",
                vec![],
            )
            .await?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let png = self.client.screenshot().await?;
        std::fs::write(path, png)?;
        Ok(())
    }
}

/// XPath 1.0 has no escape sequences; strings containing single quotes need
/// a concat() expression.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

#[cfg(test)]
mod tests {
    use super::xpath_literal;

    #[test]
    fn plain_value_is_single_quoted() {
        assert_eq!(xpath_literal("user@madrid.org"), "'user@madrid.org'");
    }

    #[test]
    fn apostrophes_use_concat() {
        assert_eq!(
            xpath_literal("o'brien@madrid.org"),
            "concat('o', \"'\", 'brien@madrid.org')"
        );
    }
}
