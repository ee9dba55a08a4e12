//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the Buckler client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default build identifier lifetime (24 hours)
pub const DEFAULT_BUILD_ID_TTL_SECS: i64 = 24 * 60 * 60;

/// Main configuration settings for the Buckler client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Account credentials
    pub credentials: CredentialSettings,
    /// Identity-provider OAuth parameters
    pub identity: IdentitySettings,
    /// Portal location and its own authorize parameters
    pub portal: PortalSettings,
    /// HTTP client configuration
    pub network: NetworkSettings,
    /// Build identifier cache configuration
    pub cache: CacheSettings,
    /// Session persistence configuration
    pub session: SessionSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Account credentials
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Login e-mail address
    pub email: String,
    /// Login password
    pub password: String,
}

/// Identity-provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Identity provider base URL
    pub base_url: String,
    /// OAuth client id
    pub client_id: String,
    /// Connection (database) name
    pub connection: String,
    /// Tenant name
    pub tenant: String,
    /// Protocol name
    pub protocol: String,
    /// Redirect URI registered for the client
    pub redirect_uri: String,
    /// OAuth response type
    pub response_type: String,
    /// OAuth scope
    pub scope: String,
    /// UI locale passed to the login page
    pub ui_locales: String,
    /// Sign-up toggle echoed back in the credential payload
    pub show_sign_up: String,
    /// API audience
    pub audience: String,
}

/// Portal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSettings {
    /// Portal base URL (including its path prefix)
    pub base_url: String,
    /// Locale segment, e.g. `ja-jp`
    pub lang: String,
    /// Portal-scoped OAuth client id used by the last login fallback
    pub client_id: Option<String>,
    /// Portal-scoped redirect URI
    pub redirect_uri: String,
    /// Portal-scoped scope
    pub scope: String,
    /// Portal-scoped audience
    pub audience: String,
    /// Portal-scoped response type
    pub response_type: String,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// User agent sent with every request
    pub user_agent: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Build identifier cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Build identifier TTL in seconds; non-positive values use the default
    pub build_id_ttl_secs: i64,
}

/// Session persistence configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Envelope encryption key (raw, base64 or hex, 32 bytes)
    pub cookie_key: Option<String>,
    /// Where the encrypted session bundle is stored
    pub store_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Emit per-request diagnostics
    pub debug: bool,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            base_url: "https://auth.cid.capcom.com".to_string(),
            client_id: "mVxOARlAyTcJkcFAb8IZoiKYV8qGAH9a".to_string(),
            connection: "Username-Password-Authentication".to_string(),
            tenant: "capcom".to_string(),
            protocol: "oauth2".to_string(),
            redirect_uri: "https://cid.capcom.com/ja/loginCallback".to_string(),
            response_type: "code".to_string(),
            scope: "openid profile email".to_string(),
            ui_locales: "ja".to_string(),
            show_sign_up: "0".to_string(),
            audience: "urn:rebe:capcom:apis".to_string(),
        }
    }
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.streetfighter.com/6/buckler".to_string(),
            lang: "ja-jp".to_string(),
            client_id: None,
            redirect_uri: "https://www.streetfighter.com/6/buckler/auth/login".to_string(),
            scope: "openid".to_string(),
            audience: "urn:rebe:capcom:apis".to_string(),
            response_type: "code".to_string(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            timeout_secs: 20,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            build_id_ttl_secs: DEFAULT_BUILD_ID_TTL_SECS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug: false,
        }
    }
}

impl fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSettings")
            .field("email", &self.email)
            .field("password", &redacted(&self.password))
            .finish()
    }
}

impl fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSettings")
            .field("cookie_key", &self.cookie_key.as_deref().map(redacted))
            .field("store_path", &self.store_path)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "<redacted>" }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from environment variables on top of the defaults
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_with_env()
    }

    /// Load settings from a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| {
            crate::Error::config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Override settings with process environment variables
    pub fn merge_with_env(self) -> crate::Result<Self> {
        self.merge_with_vars(|key| std::env::var(key).ok())
    }

    /// Override settings from an arbitrary variable lookup.
    ///
    /// Empty values are ignored, matching how unset variables behave.
    pub fn merge_with_vars<F>(mut self, lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let strings = [
            ("CAPCOM_EMAIL", &mut self.credentials.email),
            ("CAPCOM_PASSWORD", &mut self.credentials.password),
            ("CAPCOM_AUTH_BASE_URL", &mut self.identity.base_url),
            ("CAPCOM_CLIENT_ID", &mut self.identity.client_id),
            ("CAPCOM_CONNECTION", &mut self.identity.connection),
            ("CAPCOM_TENANT", &mut self.identity.tenant),
            ("CAPCOM_PROTOCOL", &mut self.identity.protocol),
            ("CAPCOM_REDIRECT_URI", &mut self.identity.redirect_uri),
            ("CAPCOM_RESPONSE_TYPE", &mut self.identity.response_type),
            ("CAPCOM_SCOPE", &mut self.identity.scope),
            ("CAPCOM_UI_LOCALES", &mut self.identity.ui_locales),
            ("CAPCOM_SHOW_SIGN_UP", &mut self.identity.show_sign_up),
            ("CAPCOM_AUDIENCE", &mut self.identity.audience),
            ("BUCKLER_BASE_URL", &mut self.portal.base_url),
            ("BUCKLER_LANG", &mut self.portal.lang),
            ("BUCKLER_REDIRECT_URI", &mut self.portal.redirect_uri),
            ("BUCKLER_SCOPE", &mut self.portal.scope),
            ("BUCKLER_AUDIENCE", &mut self.portal.audience),
            ("BUCKLER_RESPONSE_TYPE", &mut self.portal.response_type),
            ("BUCKLER_USER_AGENT", &mut self.network.user_agent),
            ("BUCKLER_LOG_LEVEL", &mut self.logging.level),
        ];
        for (key, slot) in strings {
            if let Some(value) = var(key) {
                *slot = value;
            }
        }

        if let Some(id) = var("BUCKLER_CLIENT_ID") {
            self.portal.client_id = Some(id);
        }
        if let Some(key) = var("BUCKLER_COOKIE_ENC_KEY") {
            self.session.cookie_key = Some(key);
        }
        if let Some(path) = var("BUCKLER_SESSION_FILE") {
            self.session.store_path = Some(PathBuf::from(path));
        }
        if let Some(debug) = var("BUCKLER_DEBUG") {
            self.logging.debug = parse_bool(&debug).unwrap_or(self.logging.debug);
        }
        if let Some(ttl) = var("BUCKLER_BUILD_ID_TTL_SECS") {
            self.cache.build_id_ttl_secs = ttl
                .trim()
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid build id TTL: {}", e)))?;
        }
        if let Some(timeout) = var("BUCKLER_TIMEOUT_SECS") {
            self.network.timeout_secs = timeout
                .trim()
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid timeout: {}", e)))?;
        }

        Ok(self)
    }

    /// Validate the settings before a client is built from them
    pub fn validate(&self) -> crate::Result<()> {
        if self.credentials.email.is_empty() || self.credentials.password.is_empty() {
            return Err(crate::Error::config(
                "CAPCOM_EMAIL/CAPCOM_PASSWORD required",
            ));
        }
        for (name, raw) in [
            ("identity.base_url", &self.identity.base_url),
            ("portal.base_url", &self.portal.base_url),
        ] {
            let url = Url::parse(raw)
                .map_err(|e| crate::Error::config(format!("Invalid {}: {}", name, e)))?;
            if url.host_str().is_none() {
                return Err(crate::Error::config(format!("{} has no host", name)));
            }
        }
        if self.portal.lang.trim().is_empty() {
            return Err(crate::Error::config("portal.lang must not be empty"));
        }
        if self.network.timeout_secs == 0 {
            return Err(crate::Error::config("network.timeout_secs must be positive"));
        }
        if let Some(key) = &self.session.cookie_key {
            crate::session::EnvelopeKey::parse(key)?;
        }
        Ok(())
    }

    /// Build identifier TTL, falling back to 24h for non-positive values.
    /// Values beyond what a duration can hold saturate.
    pub fn build_id_ttl(&self) -> chrono::Duration {
        let secs = if self.cache.build_id_ttl_secs > 0 {
            self.cache.build_id_ttl_secs
        } else {
            DEFAULT_BUILD_ID_TTL_SECS
        };
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_secs.max(1))
    }

    /// Locale segment with the `ja-jp` fallback applied
    pub fn lang(&self) -> &str {
        match self.portal.lang.trim() {
            "" => "ja-jp",
            lang => lang,
        }
    }

    /// Primary language of the locale (`ja-jp` -> `ja`)
    pub fn base_lang(&self) -> &str {
        let lang = self.lang();
        match lang.find('-') {
            Some(idx) if idx > 0 => &lang[..idx],
            _ => lang,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
