//! # Session Management Module
//!
//! [`SessionManager`] owns the HTTP client and the cookie jar shared by every
//! request made on behalf of one portal session.
//!
//! ## Architecture
//!
//! - Redirects are never followed by the HTTP client; each hop is taken by
//!   hand (see [`SessionManager::follow_redirects`]).
//! - Browser-like headers are attached per request, depending on the target
//!   host, path and method.
//! - Cookies are kept per origin and can be exported to, and imported from,
//!   a [`CookieEnvelope`].
//! - Every exchange reads its body in full and is bounded by the caller's
//!   [`CallContext`].
//!
//! ## Examples
//!
//! ```rust
//! use buckler_client::config::Settings;
//! use buckler_client::session::{SessionManager, TracingSink};
//! use std::sync::Arc;
//!
//! let manager = SessionManager::new(Arc::new(Settings::default()), Arc::new(TracingSink))?;
//! assert!(!manager.has_portal_session());
//! # Ok::<(), buckler_client::Error>(())
//! ```

use super::diagnostics::{DiagnosticEvent, DiagnosticSink};
use super::redirect::{RedirectPatterns, is_redirect, same_site};
use super::CallContext;
use crate::{
    Error, Result,
    config::Settings,
    types::{CookieEnvelope, CookieRecord},
};
use cookie::Cookie;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, LOCATION, ORIGIN, REFERER,
    SET_COOKIE, UPGRADE_INSECURE_REQUESTS,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode, redirect};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::{Arc, MutexGuard, PoisonError};
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

const NAVIGATION_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Cookies whose joint presence on the portal marks a live session
pub const SESSION_COOKIES: [&str; 2] = ["buckler_id", "buckler_r_id"];

/// One completed HTTP exchange with its body fully read
#[derive(Debug, Clone)]
pub struct Exchange {
    pub status: StatusCode,
    /// URL the request was sent to
    pub url: Url,
    /// Raw `Location` header
    pub location: Option<String>,
    pub body: String,
}

impl Exchange {
    pub fn is_redirect(&self) -> bool {
        is_redirect(self.status)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// `Location` of a redirect response, if it has one
    pub fn redirect_location(&self) -> Option<&str> {
        self.location.as_deref().filter(|_| self.is_redirect())
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| Error::decode(context, e))
    }

    /// One-line description for step diagnostics
    pub fn summary(&self) -> String {
        match &self.location {
            Some(location) => format!("{} {} -> {}", self.status.as_u16(), self.url, location),
            None => format!("{} {}", self.status.as_u16(), self.url),
        }
    }
}

/// HTTP transport and cookie jar for one portal session
#[derive(Debug)]
pub struct SessionManager {
    /// Configuration settings
    settings: Arc<Settings>,
    /// HTTP client with redirects disabled
    http_client: Client,
    /// Jar shared with the HTTP client
    cookie_store: Arc<CookieStoreMutex>,
    identity_base: Url,
    portal_base: Url,
    patterns: RedirectPatterns,
    sink: Arc<dyn DiagnosticSink>,
}

impl SessionManager {
    /// Creates a session manager with an empty cookie jar.
    ///
    /// # Errors
    ///
    /// Fails when a configured base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(settings: Arc<Settings>, sink: Arc<dyn DiagnosticSink>) -> Result<Self> {
        let identity_base = parse_base(&settings.identity.base_url)?;
        let portal_base = parse_base(&settings.portal.base_url)?;
        let patterns = RedirectPatterns::new(&identity_base, &portal_base)?;

        let cookie_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let http_client = Client::builder()
            .user_agent(settings.network.user_agent.clone())
            .redirect(redirect::Policy::none())
            .cookie_provider(Arc::clone(&cookie_store))
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            settings,
            http_client,
            cookie_store,
            identity_base,
            portal_base,
            patterns,
            sink,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn identity_base(&self) -> &Url {
        &self.identity_base
    }

    pub fn portal_base(&self) -> &Url {
        &self.portal_base
    }

    pub fn redirect_patterns(&self) -> &RedirectPatterns {
        &self.patterns
    }

    /// `path` appended to the identity provider base URL
    pub fn identity_url(&self, path: &str) -> String {
        join_path(&self.settings.identity.base_url, path)
    }

    /// `path` appended to the portal base URL
    pub fn portal_url(&self, path: &str) -> String {
        join_path(&self.settings.portal.base_url, path)
    }

    /// Report a login or retrieval milestone
    pub fn report(&self, step: &'static str, detail: impl Into<String>) {
        self.sink.record(&DiagnosticEvent::Step {
            step,
            detail: detail.into(),
        });
    }

    pub async fn get(&self, ctx: &CallContext, url: &str) -> Result<Exchange> {
        self.get_with_headers(ctx, url, &[]).await
    }

    /// GET with extra headers layered over the standard set
    pub async fn get_with_headers(
        &self,
        ctx: &CallContext,
        url: &str,
        extra: &[(&'static str, &str)],
    ) -> Result<Exchange> {
        let target = parse_url(url)?;
        let mut request = self.request(Method::GET, &target);
        for (name, value) in extra {
            request = request.header(*name, *value);
        }
        self.execute(ctx, request, target).await
    }

    /// POST a JSON body
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        url: &str,
        payload: &T,
    ) -> Result<Exchange> {
        let target = parse_url(url)?;
        let request = self.request(Method::POST, &target).json(payload);
        self.execute(ctx, request, target).await
    }

    /// POST an `application/x-www-form-urlencoded` body
    pub async fn post_form(
        &self,
        ctx: &CallContext,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<Exchange> {
        let target = parse_url(url)?;
        let request = self.request(Method::POST, &target).form(fields);
        self.execute(ctx, request, target).await
    }

    fn request(&self, method: Method, url: &Url) -> RequestBuilder {
        let headers = self.headers_for(&method, url);
        self.http_client
            .request(method, url.clone())
            .headers(headers)
    }

    async fn execute(&self, ctx: &CallContext, request: RequestBuilder, url: Url) -> Result<Exchange> {
        let request = request.build()?;
        if self.settings.logging.debug {
            self.sink.record(&DiagnosticEvent::Request {
                method: request.method().to_string(),
                url: url.to_string(),
                cookies: self.cookie_summary(&url),
            });
        }

        let label = url.to_string();
        let timeout = self.settings.request_timeout();
        ctx.run(&label, timeout, async {
            let response = self.http_client.execute(request).await?;
            let status = response.status();
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            if self.settings.logging.debug {
                let set_cookies = response
                    .headers()
                    .get_all(SET_COOKIE)
                    .iter()
                    .filter_map(|value| value.to_str().ok())
                    .filter_map(|raw| raw.split_once('=').map(|(name, _)| name.trim().to_string()))
                    .collect();
                self.sink.record(&DiagnosticEvent::Response {
                    status: status.as_u16(),
                    location: location.clone(),
                    set_cookies,
                });
            }

            let body = response.text().await?;
            Ok(Exchange {
                status,
                url,
                location,
                body,
            })
        })
        .await
    }

    /// Browser-like headers for a request to `url`
    pub fn headers_for(&self, method: &Method, url: &Url) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let on_portal = self.is_portal_host(url);
        let is_login = url.path().contains("/auth/login");

        let portal_path = self.portal_base.path().trim_end_matches('/');
        let navigation = on_portal
            && url.path().starts_with(portal_path)
            && !url.path().contains("/_next/")
            && !url.path().contains("/api/");

        insert(
            &mut headers,
            ACCEPT,
            if navigation { NAVIGATION_ACCEPT } else { "*/*" },
        );
        insert(
            &mut headers,
            ACCEPT_LANGUAGE,
            &format!("{},en-US;q=0.9,en;q=0.8", self.settings.base_lang()),
        );

        if on_portal && !is_login {
            insert(
                &mut headers,
                REFERER,
                &format!("{}/", self.portal_url(self.settings.lang())),
            );
        }

        if navigation {
            insert(&mut headers, UPGRADE_INSECURE_REQUESTS, "1");
            insert(&mut headers, HeaderName::from_static("sec-fetch-dest"), "document");
            insert(&mut headers, HeaderName::from_static("sec-fetch-mode"), "navigate");
            insert(
                &mut headers,
                HeaderName::from_static("sec-fetch-site"),
                if is_login { "cross-site" } else { "same-origin" },
            );
            insert(&mut headers, HeaderName::from_static("sec-fetch-user"), "?1");
        }

        if *method != Method::GET {
            insert(&mut headers, ORIGIN, &url.origin().ascii_serialization());
        }

        headers
    }

    /// Whether `url` points at the portal host (with or without `www.`)
    pub fn is_portal_host(&self, url: &Url) -> bool {
        same_site(url, &self.portal_base) && url.port() == self.portal_base.port()
    }

    fn jar(&self) -> MutexGuard<'_, CookieStore> {
        self.cookie_store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn cookie_summary(&self, url: &Url) -> Vec<String> {
        self.jar()
            .matches(url)
            .into_iter()
            .map(|cookie| format!("{}(len={})", cookie.name(), cookie.value().len()))
            .collect()
    }

    /// Both session cookies are present on the portal base URL. Only the
    /// names count; values are never interpreted.
    pub fn has_portal_session(&self) -> bool {
        let jar = self.jar();
        let cookies = jar.matches(&self.portal_base);
        SESSION_COOKIES
            .iter()
            .all(|name| cookies.iter().any(|cookie| cookie.name() == *name))
    }

    /// Value of the cookie `name` the jar would send to `url`
    pub fn cookie_value(&self, url: &str, name: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        self.jar()
            .matches(&url)
            .into_iter()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }

    /// Store one cookie as if `url` had set it
    pub fn set_cookie(&self, url: &Url, record: &CookieRecord) -> Result<()> {
        self.jar()
            .insert_raw(&record.to_cookie(), url)
            .map(|_| ())
            .map_err(|e| Error::cookie(format!("{} for {}: {}", record.name, url, e)))
    }

    /// Snapshot of the cookies the jar would send to `url`
    pub fn export_envelope(&self, url: &str) -> Result<CookieEnvelope> {
        let target = parse_url(url)?;
        let now = OffsetDateTime::now_utc();
        let cookies = self
            .jar()
            .matches(&target)
            .into_iter()
            .map(|cookie| {
                let raw: &Cookie<'_> = cookie;
                CookieRecord::from_cookie(raw, now)
            })
            .collect();
        Ok(CookieEnvelope::new(url, cookies))
    }

    /// Load an envelope into the jar, skipping expired cookies.
    ///
    /// Returns the number of cookies stored.
    pub fn import_envelope(&self, envelope: &CookieEnvelope) -> Result<usize> {
        let target = parse_url(&envelope.url)?;
        let now = OffsetDateTime::now_utc();
        let mut jar = self.jar();
        let mut stored = 0;
        for record in envelope.cookies.iter().filter(|c| !c.is_expired_at(now)) {
            jar.insert_raw(&record.to_cookie(), &target)
                .map_err(|e| Error::cookie(format!("{} for {}: {}", record.name, target, e)))?;
            stored += 1;
        }
        Ok(stored)
    }

    /// Forget every cookie
    pub fn clear_cookies(&self) {
        self.jar().clear();
    }

    /// Seed locale cookies on the portal (and its bare host, when the base
    /// uses `www.`) so the portal answers in the configured language. A
    /// request id cookie is added where none exists yet.
    pub fn prime_locale_cookies(&self) -> Result<()> {
        let mut targets = vec![self.portal_base.clone()];
        if let Some(bare) = self
            .portal_base
            .host_str()
            .and_then(|host| host.strip_prefix("www."))
        {
            let mut alt = self.portal_base.clone();
            alt.set_host(Some(bare))
                .map_err(|e| Error::invalid_url(bare, e))?;
            targets.push(alt);
        }

        let lang = self.settings.lang();
        let request_id = Uuid::new_v4().to_string();
        for target in &targets {
            for (name, value) in [
                ("pll_language", lang),
                ("locale", self.settings.base_lang()),
                ("NEXT_LOCALE", lang),
            ] {
                self.set_cookie(target, &CookieRecord::new(name, value))?;
            }
            if self.cookie_value(target.as_str(), "buckler_r_id").is_none() {
                self.set_cookie(target, &CookieRecord::new("buckler_r_id", &request_id))?;
            }
        }
        Ok(())
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    let url = parse_url(raw)?;
    if url.host_str().is_none() {
        return Err(Error::config(format!("{} has no host", raw)));
    }
    Ok(url)
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::invalid_url(raw, e))
}

fn join_path(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
