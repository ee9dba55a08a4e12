//! Login state machine
//!
//! One login attempt walks these states in order:
//!
//! 1. authorize at the identity provider, yielding the login URL and `state`
//! 2. fetch the login page (sets the CSRF cookie)
//! 3. send the challenge
//! 4. submit the credentials
//! 5. post the callback form, when the identity provider answers with one
//! 6. follow the redirects that lead back to the portal
//! 7. fall back to the portal-side authorization strategies
//!
//! The attempt ends as soon as the portal session cookies appear. Transport
//! and decode failures abort it; a redirect walk that simply ends without a
//! session only moves the machine on to the next state.

use super::form::find_callback_form;
use super::payload::{ChallengePayload, CredentialPayload};
use crate::{
    BucklerClient, Error, Result,
    session::{
        CallContext, Exchange,
        redirect::{query_param, resolve_url},
    },
};
use url::Url;

/// Where a login attempt stands
#[derive(Debug)]
pub(crate) enum LoginState {
    Start,
    AuthorizeRequested { login_url: Url, state: String },
    LoginPageFetched { state: String },
    ChallengeSent { state: String },
    CredentialsSubmitted { response: Exchange },
    RedirectFollowing { response: Exchange },
    PortalAuthorize,
    Authenticated,
}

impl LoginState {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AuthorizeRequested { .. } => "authorize_requested",
            Self::LoginPageFetched { .. } => "login_page_fetched",
            Self::ChallengeSent { .. } => "challenge_sent",
            Self::CredentialsSubmitted { .. } => "credentials_submitted",
            Self::RedirectFollowing { .. } => "redirect_following",
            Self::PortalAuthorize => "portal_authorize",
            Self::Authenticated => "authenticated",
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::AuthorizeRequested { login_url, .. } => login_url.to_string(),
            Self::CredentialsSubmitted { response } | Self::RedirectFollowing { response } => {
                response.summary()
            }
            _ => String::new(),
        }
    }
}

impl BucklerClient {
    /// Run one full login attempt, regardless of the current session.
    pub(crate) async fn login(&self, ctx: &CallContext) -> Result<()> {
        let session = self.session();
        let mut state = LoginState::Start;

        loop {
            state = match state {
                LoginState::Start => {
                    let (login_url, state) = self.start_authorize(ctx).await?;
                    LoginState::AuthorizeRequested { login_url, state }
                }

                LoginState::AuthorizeRequested { login_url, state } => {
                    session.get(ctx, login_url.as_str()).await?;
                    LoginState::LoginPageFetched { state }
                }

                LoginState::LoginPageFetched { state } => {
                    session
                        .post_json(
                            ctx,
                            &session.identity_url("usernamepassword/challenge"),
                            &ChallengePayload { state: &state },
                        )
                        .await?;
                    LoginState::ChallengeSent { state }
                }

                LoginState::ChallengeSent { state } => {
                    let settings = self.settings();
                    let csrf = session
                        .cookie_value(&settings.identity.base_url, "_csrf")
                        .unwrap_or_default();
                    if csrf.is_empty() {
                        tracing::warn!("No CSRF cookie from the identity provider");
                    }
                    let payload = CredentialPayload::new(
                        &settings.identity,
                        &settings.credentials,
                        &state,
                        &csrf,
                    );
                    let response = session
                        .post_json(ctx, &session.identity_url("usernamepassword/login"), &payload)
                        .await?;
                    LoginState::CredentialsSubmitted { response }
                }

                LoginState::CredentialsSubmitted { response } => {
                    if session.has_portal_session() {
                        LoginState::Authenticated
                    } else if let Some(form) = find_callback_form(&response.body) {
                        let base = Url::parse(&session.identity_url(""))
                            .map_err(|e| Error::invalid_url(session.identity_url(""), e))?;
                        let action = resolve_url(&base, &form.action)?;
                        session.report(
                            "callback_form",
                            format!("{} ({} fields)", action, form.fields.len()),
                        );
                        let response = session.post_form(ctx, action.as_str(), &form.fields).await?;
                        LoginState::RedirectFollowing { response }
                    } else {
                        LoginState::RedirectFollowing { response }
                    }
                }

                LoginState::RedirectFollowing { response } => {
                    if let Some(next) = session.next_hop(&response)? {
                        match session.follow_redirects(ctx, next.as_str()).await {
                            Ok(()) | Err(Error::SessionNotEstablished) => {}
                            Err(e) => return Err(e),
                        }
                    }
                    if session.has_portal_session() {
                        LoginState::Authenticated
                    } else {
                        LoginState::PortalAuthorize
                    }
                }

                LoginState::PortalAuthorize => {
                    self.authorize_portal(ctx).await?;
                    if !session.has_portal_session() {
                        session.report("failed", "no session cookies after all fallbacks");
                        return Err(Error::SessionNotEstablished);
                    }
                    LoginState::Authenticated
                }

                LoginState::Authenticated => return Ok(()),
            };
            session.report(state.name(), state.detail());
        }
    }

    /// Authorize at the identity provider. Returns the login URL and the
    /// `state` it carries; without a redirect the login URL is built from the
    /// same parameters.
    async fn start_authorize(&self, ctx: &CallContext) -> Result<(Url, String)> {
        let session = self.session();
        let identity = &self.settings().identity;
        let params = [
            ("client_id", identity.client_id.as_str()),
            ("redirect_uri", identity.redirect_uri.as_str()),
            ("response_type", identity.response_type.as_str()),
            ("scope", identity.scope.as_str()),
            ("ui_locales", identity.ui_locales.as_str()),
        ];

        let authorize = with_params(&session.identity_url("authorize"), &params)?;
        let response = session.get(ctx, authorize.as_str()).await?;
        let login_url = match response.location.as_deref() {
            Some(location) => resolve_url(&authorize, location)?,
            None => with_params(&session.identity_url("login"), &params)?,
        };
        let state = query_param(&login_url, "state").unwrap_or_default();
        Ok((login_url, state))
    }
}

pub(crate) fn with_params(base: &str, params: &[(&str, &str)]) -> Result<Url> {
    Url::parse_with_params(base, params).map_err(|e| Error::invalid_url(base, e))
}
