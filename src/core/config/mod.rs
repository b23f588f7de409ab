//! Application configuration: defaults, the TOML file overlay, and the
//! builder used to construct a validated [`Config`].
//!
//! A single immutable `Config` value is threaded explicitly through every
//! component constructor; there is no ambient/global lookup.

mod builder;
mod loading;
mod validation;

pub use builder::ConfigBuilder;

use super::error::Result;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;

/// Millisecond `[min, max]` range used by the behavior simulation layer.
pub type MsRange = (u64, u64);

/// Delay ranges per action category, in milliseconds.
#[derive(Debug, Clone)]
pub struct DelayRanges {
    pub between_actions: MsRange,
    pub between_records: MsRange,
    pub after_typing: MsRange,
    pub after_click: MsRange,
    pub after_card_close: MsRange,
    pub card_load: MsRange,
}

impl Default for DelayRanges {
    fn default() -> Self {
        Self {
            between_actions: (500, 2000),
            between_records: (3000, 8000),
            after_typing: (200, 800),
            after_click: (800, 1500),
            after_card_close: (1000, 2000),
            card_load: (1500, 2500),
        }
    }
}

/// Pointer emulation policy.
#[derive(Debug, Clone)]
pub struct MouseSettings {
    pub bezier_curves: bool,
    pub random_offset_px: i32,
    pub move_duration_ms: MsRange,
    pub overshoot_chance: f64,
    pub pause_before_click_ms: MsRange,
}

impl Default for MouseSettings {
    fn default() -> Self {
        Self {
            bezier_curves: true,
            random_offset_px: 10,
            move_duration_ms: (500, 1500),
            overshoot_chance: 0.15,
            pause_before_click_ms: (50, 150),
        }
    }
}

/// Keystroke emulation policy.
#[derive(Debug, Clone)]
pub struct TypingSettings {
    pub chars_per_second: (f64, f64),
    pub mistake_probability: f64,
    pub correction_delay_ms: MsRange,
    pub between_words_factor: f64,
    pub burst_chance: f64,
    pub burst_len: usize,
}

impl Default for TypingSettings {
    fn default() -> Self {
        Self {
            chars_per_second: (2.0, 6.0),
            mistake_probability: 0.02,
            correction_delay_ms: (100, 300),
            between_words_factor: 1.5,
            burst_chance: 0.3,
            burst_len: 5,
        }
    }
}

/// Client identity (user-agent) rotation policy.
#[derive(Debug, Clone)]
pub struct IdentitySettings {
    pub rotate: bool,
    pub pool_size: usize,
    pub prefer_platform: Option<String>,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            rotate: true,
            pool_size: 10,
            prefer_platform: None,
        }
    }
}

/// CSS selectors for the webmail interface elements. Treated as
/// configuration, not code: the interface's markup shifts between versions.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub new_message_btn: String,
    pub to_field: String,
    pub card: String,
    pub discard_btn: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            new_message_btn: r#"button[title="Escribir un mensaje nuevo (N)"]"#.to_string(),
            to_field: r#"div[role="textbox"][aria-label="Para"]"#.to_string(),
            card: r#"div._pe_Y[ispopup="1"]"#.to_string(),
            discard_btn: r#"button[aria-label="Descartar"]"#.to_string(),
        }
    }
}

/// Structural waits and timeouts, in milliseconds. Distinct from
/// [`DelayRanges`]: these bound how long we wait for the UI, while delay
/// ranges pace our own actions.
#[derive(Debug, Clone)]
pub struct WaitTimes {
    pub after_new_message: u64,
    pub after_fill_to: u64,
    pub after_blur: u64,
    pub card_visible_timeout: u64,
    pub before_discard: u64,
}

impl Default for WaitTimes {
    fn default() -> Self {
        Self {
            after_new_message: 1000,
            after_fill_to: 3000,
            after_blur: 500,
            card_visible_timeout: 5000,
            before_discard: 2000,
        }
    }
}

/// Compiled extraction patterns. The generic-email prefix set is the one
/// configurable piece; the rest are stable text conventions of the interface.
#[derive(Debug, Clone)]
pub struct Patterns {
    pub email: Regex,
    pub sip: Regex,
    pub postal_addr: Regex,
    pub street_addr: Regex,
    pub name: Regex,
    pub generic_email: Regex,
}

impl Patterns {
    pub(crate) fn compile(generic_prefix: &str) -> Result<Self> {
        let build = |src: &str| {
            Regex::new(src).map_err(|e| {
                super::error::AppError::Config(format!("Invalid pattern '{}': {}", src, e))
            })
        };
        Ok(Self {
            email: build(r"(?i)[\w.+-]+@[\w.-]+\.[a-z]{2,}")?,
            sip: build(r"(?i)sip:[\w.+-]+@[\w.-]+")?,
            postal_addr: build(r"(?i)\d{5} +[A-ZÁÉÍÓÚÑ][A-ZÁÉÍÓÚÑ\- ]*")?,
            street_addr: build(r"(?i)C/ *[A-ZÁÉÍÓÚÑ ,]+\d+ +\d{5} +[A-ZÁÉÍÓÚÑ\- ]+")?,
            name: build(
                r"([A-ZÁÉÍÓÚÑ][A-Za-zÁÉÍÓÚÑáéíóúñ\-\. ]+, *[A-ZÁÉÍÓÚÑ][A-Za-zÁÉÍÓÚÑáéíóúñ\- ]+)",
            )?,
            generic_email: build(generic_prefix)?,
        })
    }
}

/// Default generic-email prefix pattern: institutional placeholder addresses
/// with a short uppercase prefix followed by digits.
pub const DEFAULT_GENERIC_EMAIL_PREFIX: &str = r"(?i)^(ASP|AGM|AEM|ADM)\d+@";

/// The complete, validated application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub page_url: String,
    pub webdriver_url: String,
    pub session_file: PathBuf,
    pub headless: bool,

    pub sheet_file: PathBuf,
    pub start_row: u32,
    pub email_column: u32,
    pub status_column: u32,

    pub batch_size: usize,
    pub screenshot_dir: Option<PathBuf>,

    pub delays: DelayRanges,
    pub mouse: MouseSettings,
    pub typing: TypingSettings,
    pub identity: IdentitySettings,
    pub selectors: Selectors,
    pub wait_times: WaitTimes,
    pub patterns: Patterns,

    pub loaded_config_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_url: "https://correoweb.madrid.org/owa/#path=/mail".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            session_file: PathBuf::from("state.json"),
            headless: false,
            sheet_file: PathBuf::from("data/correos.csv"),
            start_row: 2,
            email_column: 1,
            status_column: 2,
            batch_size: 10,
            screenshot_dir: None,
            delays: DelayRanges::default(),
            mouse: MouseSettings::default(),
            typing: TypingSettings::default(),
            identity: IdentitySettings::default(),
            selectors: Selectors::default(),
            wait_times: WaitTimes::default(),
            patterns: Patterns::compile(DEFAULT_GENERIC_EMAIL_PREFIX)
                .expect("default patterns must compile"),
            loaded_config_path: None,
        }
    }
}

impl Config {
    /// Recompiles the generic-email pattern; used by file loading/overrides.
    pub(crate) fn set_generic_email_prefix(&mut self, pattern: &str) -> Result<()> {
        self.patterns = Patterns::compile(pattern)?;
        Ok(())
    }
}

/// Raw, partially-specified configuration as parsed from a TOML file. Every
/// field is optional; anything absent keeps its default or builder value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub browser: BrowserSection,
    pub sheet: SheetSection,
    pub processing: ProcessingSection,
    pub delays: DelaysSection,
    pub mouse: MouseSection,
    pub typing: TypingSection,
    pub identity: IdentitySection,
    pub selectors: SelectorsSection,
    pub wait_times: WaitTimesSection,
    pub patterns: PatternsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub page_url: Option<String>,
    pub webdriver_url: Option<String>,
    pub session_file: Option<String>,
    pub headless: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SheetSection {
    pub file: Option<String>,
    pub start_row: Option<u32>,
    pub email_column: Option<u32>,
    pub status_column: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProcessingSection {
    pub batch_size: Option<usize>,
    pub screenshot_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DelaysSection {
    pub between_actions: Option<MsRange>,
    pub between_records: Option<MsRange>,
    pub after_typing: Option<MsRange>,
    pub after_click: Option<MsRange>,
    pub after_card_close: Option<MsRange>,
    pub card_load: Option<MsRange>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MouseSection {
    pub bezier_curves: Option<bool>,
    pub random_offset_px: Option<i32>,
    pub move_duration_ms: Option<MsRange>,
    pub overshoot_chance: Option<f64>,
    pub pause_before_click_ms: Option<MsRange>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TypingSection {
    pub chars_per_second: Option<(f64, f64)>,
    pub mistake_probability: Option<f64>,
    pub correction_delay_ms: Option<MsRange>,
    pub between_words_factor: Option<f64>,
    pub burst_chance: Option<f64>,
    pub burst_len: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IdentitySection {
    pub rotate: Option<bool>,
    pub pool_size: Option<usize>,
    pub prefer_platform: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SelectorsSection {
    pub new_message_btn: Option<String>,
    pub to_field: Option<String>,
    pub card: Option<String>,
    pub discard_btn: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WaitTimesSection {
    pub after_new_message: Option<u64>,
    pub after_fill_to: Option<u64>,
    pub after_blur: Option<u64>,
    pub card_visible_timeout: Option<u64>,
    pub before_discard: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PatternsSection {
    pub generic_email_prefix: Option<String>,
}
