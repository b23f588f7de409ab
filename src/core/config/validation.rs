//! Contains validation logic for the final Config struct.

use super::{Config, MsRange, Result};
use crate::core::error::AppError;

/// Validates the configuration settings after loading and potential overrides.
/// Mutates the config to clamp values or set defaults where applicable and
/// logical. Internal helper for the builder's `build` method.
pub(crate) fn validate_config(config: &mut Config) -> Result<()> {
    if config.page_url.trim().is_empty() {
        return Err(AppError::Config("page_url cannot be empty.".to_string()));
    }
    if config.webdriver_url.trim().is_empty() {
        return Err(AppError::Config(
            "webdriver_url cannot be empty.".to_string(),
        ));
    }

    if config.batch_size == 0 {
        tracing::warn!("Batch size was set to 0. Setting to 1.");
        config.batch_size = 1;
    }
    if config.start_row < 1 {
        tracing::warn!("start_row must be >= 1. Setting to 1.");
        config.start_row = 1;
    }
    if config.email_column < 1 || config.status_column < 1 {
        return Err(AppError::Config(
            "Sheet columns are 1-based and must be >= 1.".to_string(),
        ));
    }
    if config.email_column == config.status_column {
        return Err(AppError::Config(
            "Email and status columns cannot coincide.".to_string(),
        ));
    }

    let fix_range = |name: &str, range: &mut MsRange| {
        if range.0 > range.1 {
            tracing::warn!(
                "Delay range '{}' has min ({}) > max ({}). Setting max = min.",
                name,
                range.0,
                range.1
            );
            range.1 = range.0;
        }
    };
    fix_range("between_actions", &mut config.delays.between_actions);
    fix_range("between_records", &mut config.delays.between_records);
    fix_range("after_typing", &mut config.delays.after_typing);
    fix_range("after_click", &mut config.delays.after_click);
    fix_range("after_card_close", &mut config.delays.after_card_close);
    fix_range("card_load", &mut config.delays.card_load);
    fix_range("move_duration_ms", &mut config.mouse.move_duration_ms);
    fix_range(
        "pause_before_click_ms",
        &mut config.mouse.pause_before_click_ms,
    );
    fix_range(
        "correction_delay_ms",
        &mut config.typing.correction_delay_ms,
    );

    if config.mouse.random_offset_px < 0 {
        tracing::warn!(
            "Negative mouse offset radius ({}). Using its absolute value.",
            config.mouse.random_offset_px
        );
        config.mouse.random_offset_px = config.mouse.random_offset_px.abs();
    }
    if !(0.0..=1.0).contains(&config.mouse.overshoot_chance) {
        tracing::warn!(
            "Overshoot chance ({}) outside [0, 1]. Clamping.",
            config.mouse.overshoot_chance
        );
        config.mouse.overshoot_chance = config.mouse.overshoot_chance.clamp(0.0, 1.0);
    }

    let (min_cps, max_cps) = config.typing.chars_per_second;
    if min_cps <= 0.0 || max_cps <= 0.0 {
        return Err(AppError::Config(
            "Typing speed (chars per second) must be positive.".to_string(),
        ));
    }
    if min_cps > max_cps {
        tracing::warn!(
            "Min typing speed ({:.1}) > max ({:.1}). Setting max = min.",
            min_cps,
            max_cps
        );
        config.typing.chars_per_second.1 = min_cps;
    }
    if !(0.0..=1.0).contains(&config.typing.mistake_probability) {
        tracing::warn!(
            "Mistake probability ({}) outside [0, 1]. Clamping.",
            config.typing.mistake_probability
        );
        config.typing.mistake_probability = config.typing.mistake_probability.clamp(0.0, 1.0);
    }
    if !(0.0..=1.0).contains(&config.typing.burst_chance) {
        tracing::warn!(
            "Burst chance ({}) outside [0, 1]. Clamping.",
            config.typing.burst_chance
        );
        config.typing.burst_chance = config.typing.burst_chance.clamp(0.0, 1.0);
    }

    if config.identity.pool_size == 0 {
        tracing::warn!("Identity pool size was set to 0. Setting to 1.");
        config.identity.pool_size = 1;
    }

    if config.wait_times.card_visible_timeout == 0 {
        return Err(AppError::Config(
            "card_visible_timeout must be greater than 0 ms.".to_string(),
        ));
    }

    Ok(())
}
