//! Provides the `ConfigBuilder` for fluent configuration construction.

use super::loading::{apply_file_config, load_config_file};
use super::validation::validate_config;
use super::{Config, ConfigFile, Result};
use crate::core::error::AppError;
use std::path::Path;

/// Builder pattern for creating `Config` instances fluently.
///
/// This is the primary way users should create a `Config` object.
/// It handles loading from files, applying overrides, and validation.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    config_file_path: Option<String>,
    overrides: ConfigFile,
}

impl ConfigBuilder {
    /// Creates a new builder with default configuration values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify an optional configuration file path to load.
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    pub fn page_url(mut self, value: impl Into<String>) -> Self {
        self.overrides.browser.page_url = Some(value.into());
        self
    }
    pub fn webdriver_url(mut self, value: impl Into<String>) -> Self {
        self.overrides.browser.webdriver_url = Some(value.into());
        self
    }
    pub fn session_file(mut self, path: impl Into<String>) -> Self {
        self.overrides.browser.session_file = Some(path.into());
        self
    }
    pub fn headless(mut self, value: bool) -> Self {
        self.overrides.browser.headless = Some(value);
        self
    }
    pub fn sheet_file(mut self, path: impl Into<String>) -> Self {
        self.overrides.sheet.file = Some(path.into());
        self
    }
    pub fn start_row(mut self, value: u32) -> Self {
        self.overrides.sheet.start_row = Some(value);
        self
    }
    pub fn batch_size(mut self, value: usize) -> Self {
        self.overrides.processing.batch_size = Some(value);
        self
    }
    pub fn screenshot_dir(mut self, path: Option<impl Into<String>>) -> Self {
        self.overrides.processing.screenshot_dir = path.map(|p| p.into());
        self
    }
    pub fn between_actions_delay(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.overrides.delays.between_actions = Some((min_ms, max_ms));
        self
    }
    pub fn between_records_delay(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.overrides.delays.between_records = Some((min_ms, max_ms));
        self
    }
    pub fn mistake_probability(mut self, value: f64) -> Self {
        self.overrides.typing.mistake_probability = Some(value);
        self
    }
    pub fn overshoot_chance(mut self, value: f64) -> Self {
        self.overrides.mouse.overshoot_chance = Some(value);
        self
    }
    pub fn rotate_identity(mut self, value: bool) -> Self {
        self.overrides.identity.rotate = Some(value);
        self
    }
    pub fn prefer_platform(mut self, value: Option<impl Into<String>>) -> Self {
        self.overrides.identity.prefer_platform = value.map(|v| v.into());
        self
    }
    pub fn generic_email_prefix(mut self, pattern: impl Into<String>) -> Self {
        self.overrides.patterns.generic_email_prefix = Some(pattern.into());
        self
    }

    /// Builds the final `Config` object, applying defaults, file settings,
    /// overrides, and validation.
    pub fn build(mut self) -> Result<Config> {
        let mut loaded_path: Option<String> = None;

        if let Some(ref path) = self.config_file_path {
            match load_config_file(path) {
                Ok(file_config) => {
                    apply_file_config(&mut self.config, &file_config);
                    apply_pattern_section(&mut self.config, &file_config)?;
                    loaded_path = Some(path.clone());
                    tracing::info!("Loaded base configuration from specified file: {}", path);
                }
                Err(e) => {
                    tracing::error!("Failed to load specified config file '{}': {}", path, e);
                    return Err(AppError::Config(format!(
                        "Failed to load specified configuration file '{}': {}",
                        path, e
                    )));
                }
            }
        } else {
            tracing::debug!("No config file specified, checking default locations.");
            for path_str in ["./contact-scout.toml", "./config.toml"] {
                if Path::new(path_str).exists() {
                    tracing::debug!("Found potential default config file: {}", path_str);
                    match load_config_file(path_str) {
                        Ok(file_config) => {
                            apply_file_config(&mut self.config, &file_config);
                            apply_pattern_section(&mut self.config, &file_config)?;
                            loaded_path = Some(path_str.to_string());
                            tracing::info!(
                                "Loaded base configuration from default location: {}",
                                path_str
                            );
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Failed to load or parse default config '{}': {}",
                                path_str,
                                e
                            );
                        }
                    }
                }
            }
            if loaded_path.is_none() {
                tracing::info!("No configuration file found. Using default values and overrides.");
            }
        }

        apply_file_config(&mut self.config, &self.overrides);
        apply_pattern_section(&mut self.config, &self.overrides)?;
        self.config.loaded_config_path = loaded_path;
        validate_config(&mut self.config)?;

        tracing::debug!("Final configuration built successfully.");
        Ok(self.config)
    }
}

fn apply_pattern_section(config: &mut Config, file_config: &ConfigFile) -> Result<()> {
    if let Some(ref pattern) = file_config.patterns.generic_email_prefix {
        config.set_generic_email_prefix(pattern)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_are_valid() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.start_row, 2);
        assert!(config.patterns.generic_email.is_match("ASP164@MADRID.ORG"));
        assert!(!config.patterns.generic_email.is_match("maria.garcia@madrid.org"));
    }

    #[test]
    fn builder_overrides_apply() {
        let config = ConfigBuilder::new()
            .batch_size(5)
            .rotate_identity(false)
            .mistake_probability(0.0)
            .build()
            .unwrap();
        assert_eq!(config.batch_size, 5);
        assert!(!config.identity.rotate);
        assert_eq!(config.typing.mistake_probability, 0.0);
    }

    #[test]
    fn invalid_generic_pattern_is_rejected() {
        let result = ConfigBuilder::new().generic_email_prefix("([").build();
        assert!(result.is_err());
    }
}
