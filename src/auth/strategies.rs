//! Portal-side authorization fallbacks
//!
//! Sometimes the identity-provider redirects stop at the account page instead
//! of returning to the portal. The portal can still be coaxed into issuing its
//! session by one of several entry points. Each strategy only discovers the
//! URL to walk from; the caller follows it and moves on to the next strategy
//! if the walk ends without a session.

use super::flow::with_params;
use crate::{
    BucklerClient, Error, Result,
    session::{CallContext, redirect::resolve_url},
    utils::random_state,
};
use serde::Deserialize;
use url::Url;

/// Portal entry points, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStrategy {
    /// The portal's top page, or an embedded redirect on it
    PortalTop,
    /// Redirect value from the login-entry data endpoint
    LoginEntryData,
    /// The portal's own login entry path
    PortalLoginEntry,
    /// A portal-scoped authorize request at the identity provider
    PortalAuthorize,
}

impl FallbackStrategy {
    pub const ORDER: [Self; 4] = [
        Self::PortalTop,
        Self::LoginEntryData,
        Self::PortalLoginEntry,
        Self::PortalAuthorize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::PortalTop => "portal_top",
            Self::LoginEntryData => "login_entry_data",
            Self::PortalLoginEntry => "portal_login_entry",
            Self::PortalAuthorize => "portal_authorize",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LoginEntryResponse {
    #[serde(rename = "pageProps", default)]
    page_props: LoginEntryProps,
}

#[derive(Debug, Default, Deserialize)]
struct LoginEntryProps {
    #[serde(rename = "__N_REDIRECT", default)]
    redirect: Option<String>,
}

impl BucklerClient {
    /// Try the fallback strategies until the portal session appears or they
    /// run out. Running out is not an error here; the caller checks the
    /// session afterwards.
    pub(crate) async fn authorize_portal(&self, ctx: &CallContext) -> Result<()> {
        let session = self.session();
        session.prime_locale_cookies()?;

        for strategy in FallbackStrategy::ORDER {
            if session.has_portal_session() {
                return Ok(());
            }
            let Some(next) = self.discover(ctx, strategy).await? else {
                tracing::debug!("Fallback {} found nothing", strategy.name());
                continue;
            };

            session.report(strategy.name(), next.to_string());
            match session.follow_redirects(ctx, next.as_str()).await {
                Ok(()) => return Ok(()),
                Err(Error::SessionNotEstablished) => {
                    tracing::debug!("Fallback {} ended without a session", strategy.name());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// URL a strategy leads to. Transport failures propagate; anything else
    /// counts as finding nothing.
    pub(crate) async fn discover(
        &self,
        ctx: &CallContext,
        strategy: FallbackStrategy,
    ) -> Result<Option<Url>> {
        let found = match strategy {
            FallbackStrategy::PortalTop => self.discover_portal_top(ctx).await,
            FallbackStrategy::LoginEntryData => self.discover_login_entry_data(ctx).await,
            FallbackStrategy::PortalLoginEntry => self.discover_portal_login_entry(ctx).await,
            FallbackStrategy::PortalAuthorize => self.discover_portal_authorize(ctx).await,
        };
        match found {
            Ok(next) => Ok(next),
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                tracing::warn!("Fallback {} failed: {}", strategy.name(), e);
                Ok(None)
            }
        }
    }

    async fn discover_portal_top(&self, ctx: &CallContext) -> Result<Option<Url>> {
        let session = self.session();
        let top = session.portal_url(&format!("{}/", self.settings().lang()));
        let mut response = session.get(ctx, &top).await?;
        if let Some(location) = response.redirect_location() {
            let next = resolve_url(&response.url, location)?;
            response = session.get(ctx, next.as_str()).await?;
        }
        session
            .redirect_patterns()
            .find(&response.body)
            .map(|next| resolve_url(&response.url, &next))
            .transpose()
    }

    async fn discover_login_entry_data(&self, ctx: &CallContext) -> Result<Option<Url>> {
        let session = self.session();
        let build_id = self.fetch_build_id(ctx, "").await?;
        let url = with_params(
            &session.portal_url(&format!(
                "_next/data/{}/{}/auth/loginep.json",
                build_id,
                self.settings().lang()
            )),
            &[("redirect_url", "/")],
        )?;

        let response = session
            .get_with_headers(ctx, url.as_str(), &[("x-nextjs-data", "1")])
            .await?;
        if response.status.as_u16() >= 400 {
            return Err(Error::upstream_status(response.status.as_u16(), url.as_str()));
        }
        let entry: LoginEntryResponse = response.json("login entry")?;
        entry
            .page_props
            .redirect
            .filter(|next| !next.trim().is_empty())
            .map(|next| resolve_url(&response.url, &next))
            .transpose()
    }

    async fn discover_portal_login_entry(&self, ctx: &CallContext) -> Result<Option<Url>> {
        let session = self.session();
        let entry = session.portal_url(&format!("{}/auth/login", self.settings().lang()));
        let response = session.get(ctx, &entry).await?;
        session.next_hop(&response)
    }

    async fn discover_portal_authorize(&self, ctx: &CallContext) -> Result<Option<Url>> {
        let settings = self.settings();
        let Some(client_id) = settings
            .portal
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
        else {
            tracing::warn!("BUCKLER_CLIENT_ID not set, skipping portal authorize");
            return Ok(None);
        };

        let session = self.session();
        let state = random_state(24)?;
        let portal = &settings.portal;
        let url = with_params(
            &session.identity_url("authorize"),
            &[
                ("client_id", client_id),
                ("redirect_uri", portal.redirect_uri.as_str()),
                ("response_type", portal.response_type.as_str()),
                ("scope", portal.scope.as_str()),
                ("audience", portal.audience.as_str()),
                ("ui_locales", settings.identity.ui_locales.as_str()),
                ("state", state.as_str()),
            ],
        )?;
        let response = session.get(ctx, url.as_str()).await?;
        session.next_hop(&response)
    }
}
