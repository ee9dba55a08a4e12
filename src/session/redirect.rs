//! Redirect resolution
//!
//! The underlying HTTP client never follows redirects on its own. This module
//! walks redirect chains by hand so intermediate URLs can be rewritten and so
//! that redirects hidden in HTML bodies (meta refresh, inline script, plain
//! links) are followed too.

use super::{CallContext, Exchange, SessionManager};
use crate::{Error, Result};
use regex::Regex;
use reqwest::StatusCode;
use url::Url;

/// Maximum number of redirects followed in one walk
pub const MAX_REDIRECTS: usize = 20;

/// Redirect-class statuses (308 included)
pub fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Resolve `reference` against `base`; absolute references pass through.
pub fn resolve_url(base: &Url, reference: &str) -> Result<Url> {
    base.join(reference.trim())
        .map_err(|e| Error::invalid_url(reference, e))
}

/// Value of a query parameter, if present
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Insert the locale segment into the portal's bare login path:
/// `<base>/auth/login` becomes `<base>/<lang>/auth/login`.
pub fn rewrite_login_path(url: &Url, portal_base: &Url, lang: &str) -> Url {
    if !same_site(url, portal_base) {
        return url.clone();
    }
    let base_path = portal_base.path().trim_end_matches('/');
    if url.path() == format!("{}/auth/login", base_path) {
        let mut rewritten = url.clone();
        rewritten.set_path(&format!("{}/{}/auth/login", base_path, lang));
        return rewritten;
    }
    url.clone()
}

/// Hosts equal once a leading `www.` is ignored
pub fn same_site(url: &Url, other: &Url) -> bool {
    match (url.host_str(), other.host_str()) {
        (Some(a), Some(b)) => strip_www(a) == strip_www(b),
        _ => false,
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn host_and_port(url: &Url) -> String {
    let host = strip_www(url.host_str().unwrap_or_default());
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Patterns that betray a redirect target inside an HTML body
#[derive(Debug, Clone)]
pub struct RedirectPatterns {
    absolute: Vec<Regex>,
    relative: Vec<Regex>,
}

impl RedirectPatterns {
    /// Build the pattern set for one identity provider and portal.
    pub fn new(identity_base: &Url, portal_base: &Url) -> Result<Self> {
        const URL_TAIL: &str = r#"[^"'\s<>]*"#;
        let identity = regex::escape(&host_and_port(identity_base));
        let portal = regex::escape(&format!(
            "{}{}",
            host_and_port(portal_base),
            portal_base.path().trim_end_matches('/')
        ));

        let compile = |pattern: String| {
            Regex::new(&pattern)
                .map_err(|e| Error::internal(format!("redirect pattern {}: {}", pattern, e)))
        };

        Ok(Self {
            absolute: vec![
                compile(format!(r"https?://{tail}loginCallback{tail}", tail = URL_TAIL))?,
                compile(format!(
                    r"https?://{tail}{identity}/authorize{tail}",
                    tail = URL_TAIL,
                    identity = identity
                ))?,
                compile(format!(
                    r"https?://{tail}{portal}/auth/login{tail}",
                    tail = URL_TAIL,
                    portal = portal
                ))?,
            ],
            relative: vec![
                compile(r#""/authorize/[^"']+""#.to_string())?,
                compile(r#""/loginCallback[^"']+""#.to_string())?,
            ],
        })
    }

    /// First redirect-looking URL in `body`, absolute matches preferred.
    pub fn find(&self, body: &str) -> Option<String> {
        if body.is_empty() {
            return None;
        }
        let found = self
            .absolute
            .iter()
            .find_map(|re| re.find(body).map(|m| m.as_str().to_string()))
            .or_else(|| {
                self.relative.iter().find_map(|re| {
                    re.find(body)
                        .map(|m| m.as_str().trim_matches('"').to_string())
                })
            })?;
        Some(found.replace("&amp;", "&"))
    }
}

impl SessionManager {
    /// Where a response points next: its `Location`, else a redirect URL
    /// found in its body, resolved against the response URL.
    pub fn next_hop(&self, exchange: &Exchange) -> Result<Option<Url>> {
        exchange
            .location
            .clone()
            .or_else(|| self.redirect_patterns().find(&exchange.body))
            .map(|next| resolve_url(&exchange.url, &next))
            .transpose()
    }

    /// Walk redirects from `start` until the portal session appears.
    ///
    /// Relative starts resolve against the identity provider. Each hop is a
    /// GET; the next hop comes from the `Location` of a redirect response, or
    /// failing that from a redirect URL embedded in the body. The walk ends
    /// with `Ok` as soon as the portal cookies are present,
    /// [`Error::SessionNotEstablished`] at a page that leads nowhere, and
    /// [`Error::RedirectChainTooLong`] after [`MAX_REDIRECTS`] redirects.
    pub async fn follow_redirects(&self, ctx: &CallContext, start: &str) -> Result<()> {
        let mut current = resolve_url(self.identity_base(), start)?;
        let mut followed = 0usize;

        loop {
            current = rewrite_login_path(&current, self.portal_base(), self.settings().lang());
            let exchange = self.get(ctx, current.as_str()).await?;
            self.report(
                "follow",
                format!("hop {}: {}", followed + 1, exchange.summary()),
            );

            if self.has_portal_session() {
                return Ok(());
            }

            let next = exchange
                .location
                .clone()
                .filter(|_| exchange.is_redirect())
                .or_else(|| self.redirect_patterns().find(&exchange.body));
            let Some(next) = next else {
                return Err(Error::SessionNotEstablished);
            };

            if followed == MAX_REDIRECTS {
                return Err(Error::RedirectChainTooLong {
                    hops: MAX_REDIRECTS,
                });
            }
            followed += 1;
            current = resolve_url(&exchange.url, &next)?;
        }
    }
}
