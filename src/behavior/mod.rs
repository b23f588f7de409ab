//! Behavior simulation layer: human-plausible timing, pointer trajectories,
//! keystroke cadence and client identity rotation.
//!
//! None of these components carry cross-call state beyond a bounded rolling
//! history; each is a function of its configuration plus randomness. They
//! produce *plans* (durations, paths, keystroke scripts) that the driver
//! layer replays against the live session.

pub mod delays;
pub mod identity;
pub mod mouse;
pub mod typing;

pub use delays::{DelayCategory, DelayManager};
pub use identity::IdentityRotator;
pub use mouse::{MouseEmulator, MovePlan, MoveSegment, PathPoint};
pub use typing::{Key, Keystroke, TypingSimulator};
