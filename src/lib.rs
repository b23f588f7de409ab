//! # Contact Scout Core Library
//!
//! This crate drives an authenticated webmail directory session to resolve a
//! list of email addresses into structured contact details (name, phone,
//! SIP, department, ...). Addresses are processed in batches through the
//! compose surface: all of a batch's addresses are filled at once, the page
//! resolves them into recipient tokens, and each token's contact card is
//! opened and parsed. Every interaction is paced and shaped by a behavior
//! simulation layer so the session reads like a person at a keyboard.
//!
//! It is designed to be used either directly as a library or via the
//! `contact-scout` command-line tool.

mod behavior;
mod core;
mod driver;
mod events;
mod store;

pub use crate::behavior::{
    DelayCategory, DelayManager, IdentityRotator, Key, Keystroke, MouseEmulator, MovePlan,
    MoveSegment, PathPoint, TypingSimulator,
};
pub use crate::core::config::{Config, ConfigBuilder, ConfigFile};
pub use crate::core::error::{AppError, Result};
pub use crate::core::extractor::ContactExtractionEngine;
pub use crate::core::models::{BatchResult, ContactInfo, EmailRecord, ProcessingStats, Status};
pub use crate::core::orchestrator::{BatchOrchestrator, SetupReport};
pub use crate::core::session::{SessionStore, StorageState};
pub use crate::driver::{SessionCookie, UiDriver, WebDriverSession};
pub use crate::events::{channel, EventReceiver, EventSender, ProgressEvent};
pub use crate::store::{CsvStore, MemoryStore, SpreadsheetStore};

/// Establishes the WebDriver session with a user agent drawn from the
/// configured identity pool.
pub async fn connect_session(config: &Config) -> Result<WebDriverSession> {
    let rotator = IdentityRotator::new(&config.identity);
    let agent = rotator.next_agent();
    tracing::debug!(target: "driver", "Session user agent: {}", agent);
    WebDriverSession::connect(config, &agent).await
}
