//! Build identifier cache
//!
//! The portal embeds a per-deployment `buildId` in every page; its data
//! endpoints are addressed as `/_next/data/<buildId>/...`. The token is kept
//! with an expiry and replaced as a whole whenever it goes stale.

use crate::config::settings::DEFAULT_BUILD_ID_TTL_SECS;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::LazyLock;

static BUILD_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""buildId"\s*:\s*"([^"]+)""#).expect("build id pattern is valid")
});

/// Extract the build identifier from an HTML document.
pub fn extract_build_id(html: &str) -> Option<String> {
    BUILD_ID_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Time-bounded build identifier
#[derive(Debug, Clone)]
pub struct BuildIdCache {
    value: String,
    expires_at: DateTime<Utc>,
    ttl: Duration,
}

impl BuildIdCache {
    /// Empty cache; a non-positive `ttl` falls back to 24 hours.
    pub fn new(ttl: Duration) -> Self {
        let ttl = if ttl > Duration::zero() {
            ttl
        } else {
            default_ttl()
        };
        Self {
            value: String::new(),
            expires_at: DateTime::<Utc>::MIN_UTC,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current token if present and unexpired
    pub fn get(&self) -> Option<String> {
        self.get_at(Utc::now())
    }

    pub fn get_at(&self, now: DateTime<Utc>) -> Option<String> {
        if self.value.is_empty() || now > self.expires_at {
            return None;
        }
        Some(self.value.clone())
    }

    /// Replace the token and push the expiry to now + TTL
    pub fn set(&mut self, value: impl Into<String>) {
        self.set_at(value, Utc::now());
    }

    /// An expiry past the last representable instant saturates there.
    pub fn set_at(&mut self, value: impl Into<String>, now: DateTime<Utc>) {
        self.value = value.into();
        self.expires_at = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Drop the token; the next lookup re-extracts it
    pub fn invalidate(&mut self) {
        self.value.clear();
        self.expires_at = DateTime::<Utc>::MIN_UTC;
    }
}

impl Default for BuildIdCache {
    fn default() -> Self {
        Self::new(default_ttl())
    }
}

fn default_ttl() -> Duration {
    Duration::try_seconds(DEFAULT_BUILD_ID_TTL_SECS).unwrap_or(Duration::MAX)
}
