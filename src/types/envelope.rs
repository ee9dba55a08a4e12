//! Cookie envelope
//!
//! A serializable snapshot of the cookies one origin holds, independent of any
//! client instance so it can be stored and later rehydrated.

use cookie::Cookie;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Exportable snapshot of a session's cookies for one origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieEnvelope {
    /// Origin the cookies were read from and are written back to
    pub url: String,
    pub cookies: Vec<CookieRecord>,
}

/// One cookie, flattened for storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Expiry as a unix timestamp; `None` for session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl CookieEnvelope {
    pub fn new(url: impl Into<String>, cookies: Vec<CookieRecord>) -> Self {
        Self {
            url: url.into(),
            cookies,
        }
    }

    /// Look up a cookie by name
    pub fn get(&self, name: &str) -> Option<&CookieRecord> {
        self.cookies.iter().find(|c| c.name == name)
    }
}

impl CookieRecord {
    /// Plain host-only cookie with path `/`
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: Some("/".to_string()),
            expires: None,
            secure: false,
            http_only: false,
        }
    }

    /// Flatten a jar cookie. `Max-Age` is converted to an absolute expiry so
    /// it survives the round trip; one too large to represent is kept without
    /// an expiry.
    pub fn from_cookie(cookie: &Cookie<'_>, now: OffsetDateTime) -> Self {
        let expires = cookie
            .expires_datetime()
            .or_else(|| cookie.max_age().and_then(|age| now.checked_add(age)))
            .map(|at| at.unix_timestamp());
        Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: cookie.domain().map(str::to_string),
            path: cookie.path().map(str::to_string),
            expires,
            secure: cookie.secure().unwrap_or(false),
            http_only: cookie.http_only().unwrap_or(false),
        }
    }

    /// Rebuild a jar cookie
    pub fn to_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), self.value.clone());
        if let Some(domain) = &self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie.set_path(self.path.clone().unwrap_or_else(|| "/".to_string()));
        if let Some(at) = self
            .expires
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
        {
            cookie.set_expires(at);
        }
        if self.secure {
            cookie.set_secure(true);
        }
        if self.http_only {
            cookie.set_http_only(true);
        }
        cookie
    }

    /// Whether the cookie's expiry is at or before `now`
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires
            .is_some_and(|ts| ts <= now.unix_timestamp())
    }
}
