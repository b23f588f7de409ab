pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod orchestrator;
pub mod session;
