//! Human-like typing simulation.
//!
//! Builds a keystroke script with variable cadence, burst runs, and
//! occasional keyboard-adjacent mistakes followed by a backspace correction.
//! The driver layer replays the script key by key.

use crate::core::config::TypingSettings;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// A single key event in a typing script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
}

/// A key plus the delay to wait before pressing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keystroke {
    pub key: Key,
    pub delay_before: Duration,
}

/// QWERTY adjacency used for plausible wrong-character picks.
const KEYBOARD_NEARBY: &[(char, &str)] = &[
    ('a', "sq"),
    ('b', "vn"),
    ('c', "xv"),
    ('d', "sf"),
    ('e', "wr"),
    ('f', "dg"),
    ('g', "fh"),
    ('h', "gj"),
    ('i', "uo"),
    ('j', "hk"),
    ('k', "jl"),
    ('l', "k"),
    ('m', "n"),
    ('n', "bm"),
    ('o', "ip"),
    ('p', "o"),
    ('q', "w"),
    ('r', "et"),
    ('s', "ad"),
    ('t', "ry"),
    ('u', "yi"),
    ('v', "cb"),
    ('w', "qe"),
    ('x', "zc"),
    ('y', "tu"),
    ('z', "x"),
];

/// Synthesizes character-by-character input with mistakes and variable
/// cadence.
pub struct TypingSimulator {
    settings: TypingSettings,
}

impl TypingSimulator {
    pub fn new(settings: TypingSettings) -> Self {
        Self { settings }
    }

    /// Builds the full keystroke script for `text`.
    pub fn script(&self, text: &str) -> Vec<Keystroke> {
        let mut rng = rand::thread_rng();
        let chars: Vec<char> = text.chars().collect();
        let mut script = Vec::with_capacity(chars.len());
        let mut burst_remaining = 0usize;

        for (i, &ch) in chars.iter().enumerate() {
            if self.should_make_mistake(&mut rng, ch) {
                let wrong = mistake_char(&mut rng, ch);
                script.push(Keystroke {
                    key: Key::Char(wrong),
                    delay_before: Duration::ZERO,
                });
                let (min_ms, max_ms) = self.settings.correction_delay_ms;
                script.push(Keystroke {
                    key: Key::Backspace,
                    delay_before: Duration::from_secs_f64(
                        rng.gen_range(min_ms as f64..=max_ms as f64) / 1000.0,
                    ),
                });
                // Brief settle after the backspace before the real key.
                script.push(Keystroke {
                    key: Key::Char(ch),
                    delay_before: Duration::from_millis(50),
                });
            } else {
                script.push(Keystroke {
                    key: Key::Char(ch),
                    delay_before: Duration::ZERO,
                });
            }

            // Cadence: no trailing delay after the last character.
            if i + 1 < chars.len() {
                let delay = self.char_delay(&mut rng, ch, &mut burst_remaining);
                script.push(Keystroke {
                    key: Key::Char('\0'),
                    delay_before: delay,
                });
                // Marker entries are folded below; keep construction simple.
            }
        }

        fold_delays(script)
    }

    /// Delay after typing `ch`, honoring burst mode and per-character
    /// multipliers.
    fn char_delay(&self, rng: &mut impl Rng, ch: char, burst_remaining: &mut usize) -> Duration {
        let (min_cps, max_cps) = self.settings.chars_per_second;
        let base = 1.0 / rng.gen_range(min_cps..=max_cps);

        if *burst_remaining > 0 {
            *burst_remaining -= 1;
            return Duration::from_secs_f64(base * 0.4);
        }
        if rng.gen_bool(self.settings.burst_chance) {
            *burst_remaining = self.settings.burst_len;
            return Duration::from_secs_f64(base * 0.4);
        }

        let secs = if ch == ' ' {
            base * self.settings.between_words_factor
        } else if ".,;:!?".contains(ch) {
            base * 1.8
        } else if ch.is_uppercase() {
            base * 1.1
        } else {
            let variation = base * 0.2;
            base + rng.gen_range(-variation..=variation)
        };
        Duration::from_secs_f64(secs.max(0.0))
    }

    fn should_make_mistake(&self, rng: &mut impl Rng, ch: char) -> bool {
        if ch.is_whitespace() || ".,;:!?".contains(ch) {
            return false;
        }
        rng.gen_bool(self.settings.mistake_probability)
    }
}

/// Folds the `'\0'` cadence markers into the `delay_before` of the following
/// keystroke.
fn fold_delays(raw: Vec<Keystroke>) -> Vec<Keystroke> {
    let mut script = Vec::with_capacity(raw.len());
    let mut pending = Duration::ZERO;
    for stroke in raw {
        if stroke.key == Key::Char('\0') {
            pending += stroke.delay_before;
            continue;
        }
        let mut stroke = stroke;
        stroke.delay_before += pending;
        pending = Duration::ZERO;
        script.push(stroke);
    }
    script
}

/// Picks a keyboard-adjacent wrong character, preserving case. Characters
/// with no adjacency entry fall back to a random lowercase letter.
fn mistake_char(rng: &mut impl Rng, correct: char) -> char {
    let lower = correct.to_ascii_lowercase();
    let nearby = KEYBOARD_NEARBY
        .iter()
        .find(|(key, _)| *key == lower)
        .map(|(_, neighbors)| *neighbors);

    let wrong = match nearby {
        Some(neighbors) => {
            let candidates: Vec<char> = neighbors.chars().collect();
            *candidates.choose(rng).unwrap_or(&'x')
        }
        None => {
            let alphabet: Vec<char> = ('a'..='z').collect();
            *alphabet.choose(rng).unwrap_or(&'x')
        }
    };

    if correct.is_uppercase() {
        wrong.to_ascii_uppercase()
    } else {
        wrong
    }
}
