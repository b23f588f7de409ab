//! Client identity (user-agent) rotation.
//!
//! Maintains a pool of realistic desktop user-agent strings, optionally
//! filtered by platform, and hands out a different one per session while
//! avoiding recent repeats.

use crate::core::config::IdentitySettings;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

const MAX_HISTORY: usize = 10;
const AVOID_RECENT: usize = 3;

/// Curated desktop user agents across the major browser/OS combinations.
const USER_AGENTS: &[&str] = &[
    // Chrome / Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    // Chrome / macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    // Chrome / Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    // Edge / Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36 Edg/123.0.0.0",
    // Edge / macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    // Firefox / Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
    // Firefox / macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    // Firefox / Linux
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0",
    // Safari / macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
];

/// Hands out user-agent strings per session.
///
/// With rotation disabled, one agent is pinned at construction and returned
/// for every request. With rotation enabled, each pick avoids the last three
/// agents used (falling back to the whole pool when it is too small to avoid
/// anything).
pub struct IdentityRotator {
    pool: Vec<String>,
    rotate: bool,
    pinned: String,
    history: Mutex<VecDeque<String>>,
}

impl IdentityRotator {
    pub fn new(settings: &IdentitySettings) -> Self {
        let mut rng = rand::thread_rng();
        let mut pool: Vec<String> = USER_AGENTS
            .iter()
            .filter(|ua| matches_platform(ua, settings.prefer_platform.as_deref()))
            .map(|ua| ua.to_string())
            .collect();

        // An over-narrow platform filter must not empty the pool.
        if pool.is_empty() {
            tracing::warn!(
                target: "behavior",
                "No user agents match platform filter {:?}; using the full pool",
                settings.prefer_platform
            );
            pool = USER_AGENTS.iter().map(|ua| ua.to_string()).collect();
        }

        pool.shuffle(&mut rng);
        pool.truncate(settings.pool_size.max(1));

        let pinned = pool
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| USER_AGENTS[0].to_string());

        Self {
            pool,
            rotate: settings.rotate,
            pinned,
            history: Mutex::new(VecDeque::with_capacity(MAX_HISTORY)),
        }
    }

    /// Returns the user agent for the next session.
    pub fn next_agent(&self) -> String {
        if !self.rotate {
            return self.pinned.clone();
        }

        let mut rng = rand::thread_rng();
        let mut history = self.history.lock();

        let recent: Vec<&String> = history.iter().rev().take(AVOID_RECENT).collect();
        let fresh: Vec<&String> = self
            .pool
            .iter()
            .filter(|ua| !recent.contains(ua))
            .collect();

        let chosen = if fresh.is_empty() {
            self.pool.choose(&mut rng).cloned()
        } else {
            fresh.choose(&mut rng).map(|ua| (*ua).clone())
        }
        .unwrap_or_else(|| self.pinned.clone());

        history.push_back(chosen.clone());
        if history.len() > MAX_HISTORY {
            history.pop_front();
        }
        chosen
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }
}

fn matches_platform(agent: &str, prefer: Option<&str>) -> bool {
    let Some(platform) = prefer else {
        return true;
    };
    match platform.to_ascii_lowercase().as_str() {
        "windows" => agent.contains("Windows"),
        "mac" | "macos" => agent.contains("Macintosh"),
        "linux" => agent.contains("Linux"),
        other => {
            tracing::warn!(target: "behavior", "Unknown platform filter '{}'", other);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::IdentitySettings;

    fn settings(rotate: bool, pool_size: usize, platform: Option<&str>) -> IdentitySettings {
        IdentitySettings {
            rotate,
            pool_size,
            prefer_platform: platform.map(|p| p.to_string()),
        }
    }

    #[test]
    fn pinned_agent_is_stable_when_rotation_disabled() {
        let rotator = IdentityRotator::new(&settings(false, 10, None));
        let first = rotator.next_agent();
        for _ in 0..10 {
            assert_eq!(rotator.next_agent(), first);
        }
    }

    #[test]
    fn pool_is_capped_to_requested_size() {
        let rotator = IdentityRotator::new(&settings(true, 4, None));
        assert_eq!(rotator.pool_len(), 4);
    }

    #[test]
    fn platform_filter_selects_matching_agents() {
        let rotator = IdentityRotator::new(&settings(true, 50, Some("linux")));
        for _ in 0..20 {
            assert!(rotator.next_agent().contains("Linux"));
        }
    }

    #[test]
    fn unmatchable_filter_falls_back_to_full_pool() {
        let rotator = IdentityRotator::new(&settings(true, 50, Some("windows")));
        assert!(rotator.pool_len() > 0);
    }

    #[test]
    fn rotation_avoids_immediate_repeat_with_large_pool() {
        let rotator = IdentityRotator::new(&settings(true, 17, None));
        let mut previous = rotator.next_agent();
        for _ in 0..30 {
            let current = rotator.next_agent();
            assert_ne!(current, previous);
            previous = current;
        }
    }

    #[test]
    fn tiny_pool_still_yields_agents() {
        let rotator = IdentityRotator::new(&settings(true, 2, None));
        for _ in 0..10 {
            assert!(!rotator.next_agent().is_empty());
        }
    }
}
