//! Handles loading configuration from files and applying it to the Config struct.

use super::{Config, ConfigFile};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration settings from a TOML file.
/// Returns the parsed `ConfigFile` content.
/// Internal to the builder logic.
pub(crate) fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!(
            "File not found or is not a file: {}",
            file_path
        ));
    }
    tracing::debug!("Attempting to read config file: {}", file_path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    tracing::debug!("Attempting to parse TOML from: {}", file_path);
    let config_file_content: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))?;

    tracing::debug!("Successfully parsed configuration file: {}", file_path);
    Ok(config_file_content)
}

/// Applies settings from a parsed `ConfigFile` onto a mutable `Config`
/// instance. Internal helper for the builder. This merges settings; the
/// generic-email pattern is recompiled (and validated) later by the builder.
pub(crate) fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    // Browser
    if let Some(ref url) = file_config.browser.page_url {
        config.page_url = url.clone();
    }
    if let Some(ref url) = file_config.browser.webdriver_url {
        config.webdriver_url = url.clone();
    }
    if let Some(ref path) = file_config.browser.session_file {
        config.session_file = PathBuf::from(path);
    }
    if let Some(headless) = file_config.browser.headless {
        config.headless = headless;
    }

    // Sheet
    if let Some(ref path) = file_config.sheet.file {
        config.sheet_file = PathBuf::from(path);
    }
    if let Some(row) = file_config.sheet.start_row {
        config.start_row = row;
    }
    if let Some(col) = file_config.sheet.email_column {
        config.email_column = col;
    }
    if let Some(col) = file_config.sheet.status_column {
        config.status_column = col;
    }

    // Processing
    if let Some(size) = file_config.processing.batch_size {
        config.batch_size = size;
    }
    if let Some(ref dir) = file_config.processing.screenshot_dir {
        if !dir.trim().is_empty() {
            config.screenshot_dir = Some(PathBuf::from(dir.trim()));
        } else {
            config.screenshot_dir = None;
        }
    }

    // Delays
    if let Some(range) = file_config.delays.between_actions {
        config.delays.between_actions = range;
    }
    if let Some(range) = file_config.delays.between_records {
        config.delays.between_records = range;
    }
    if let Some(range) = file_config.delays.after_typing {
        config.delays.after_typing = range;
    }
    if let Some(range) = file_config.delays.after_click {
        config.delays.after_click = range;
    }
    if let Some(range) = file_config.delays.after_card_close {
        config.delays.after_card_close = range;
    }
    if let Some(range) = file_config.delays.card_load {
        config.delays.card_load = range;
    }

    // Mouse
    if let Some(enabled) = file_config.mouse.bezier_curves {
        config.mouse.bezier_curves = enabled;
    }
    if let Some(px) = file_config.mouse.random_offset_px {
        config.mouse.random_offset_px = px;
    }
    if let Some(range) = file_config.mouse.move_duration_ms {
        config.mouse.move_duration_ms = range;
    }
    if let Some(chance) = file_config.mouse.overshoot_chance {
        config.mouse.overshoot_chance = chance;
    }
    if let Some(range) = file_config.mouse.pause_before_click_ms {
        config.mouse.pause_before_click_ms = range;
    }

    // Typing
    if let Some(cps) = file_config.typing.chars_per_second {
        config.typing.chars_per_second = cps;
    }
    if let Some(prob) = file_config.typing.mistake_probability {
        config.typing.mistake_probability = prob;
    }
    if let Some(range) = file_config.typing.correction_delay_ms {
        config.typing.correction_delay_ms = range;
    }
    if let Some(factor) = file_config.typing.between_words_factor {
        config.typing.between_words_factor = factor;
    }
    if let Some(chance) = file_config.typing.burst_chance {
        config.typing.burst_chance = chance;
    }
    if let Some(len) = file_config.typing.burst_len {
        config.typing.burst_len = len;
    }

    // Identity
    if let Some(rotate) = file_config.identity.rotate {
        config.identity.rotate = rotate;
    }
    if let Some(size) = file_config.identity.pool_size {
        config.identity.pool_size = size;
    }
    if let Some(ref platform) = file_config.identity.prefer_platform {
        if !platform.trim().is_empty() {
            config.identity.prefer_platform = Some(platform.trim().to_string());
        } else {
            config.identity.prefer_platform = None;
        }
    }

    // Selectors
    if let Some(ref sel) = file_config.selectors.new_message_btn {
        config.selectors.new_message_btn = sel.clone();
    }
    if let Some(ref sel) = file_config.selectors.to_field {
        config.selectors.to_field = sel.clone();
    }
    if let Some(ref sel) = file_config.selectors.card {
        config.selectors.card = sel.clone();
    }
    if let Some(ref sel) = file_config.selectors.discard_btn {
        config.selectors.discard_btn = sel.clone();
    }

    // Wait times
    if let Some(ms) = file_config.wait_times.after_new_message {
        config.wait_times.after_new_message = ms;
    }
    if let Some(ms) = file_config.wait_times.after_fill_to {
        config.wait_times.after_fill_to = ms;
    }
    if let Some(ms) = file_config.wait_times.after_blur {
        config.wait_times.after_blur = ms;
    }
    if let Some(ms) = file_config.wait_times.card_visible_timeout {
        config.wait_times.card_visible_timeout = ms;
    }
    if let Some(ms) = file_config.wait_times.before_discard {
        config.wait_times.before_discard = ms;
    }
}
