//! Request bodies sent to the identity provider

use crate::config::settings::{CredentialSettings, IdentitySettings};
use serde::Serialize;
use std::fmt;

/// Body of the challenge POST
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengePayload<'a> {
    pub state: &'a str,
}

/// Always serialized as `{}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PopupOptions {}

/// Body of the username/password submission
#[derive(Clone, Serialize)]
pub struct CredentialPayload<'a> {
    pub client_id: &'a str,
    pub connection: &'a str,
    pub password: &'a str,
    pub popup_options: PopupOptions,
    pub protocol: &'a str,
    pub redirect_uri: &'a str,
    pub response_type: &'a str,
    pub scope: &'a str,
    /// The identity provider spells this key without the second "n"
    #[serde(rename = "show_sing_up")]
    pub show_sign_up: &'a str,
    pub sso: bool,
    pub state: &'a str,
    pub tenant: &'a str,
    pub ui_locales: &'a str,
    pub username: &'a str,
    #[serde(rename = "_csrf")]
    pub csrf: &'a str,
    #[serde(rename = "_intstate")]
    pub intstate: &'a str,
}

impl<'a> CredentialPayload<'a> {
    pub fn new(
        identity: &'a IdentitySettings,
        credentials: &'a CredentialSettings,
        state: &'a str,
        csrf: &'a str,
    ) -> Self {
        Self {
            client_id: &identity.client_id,
            connection: &identity.connection,
            password: &credentials.password,
            popup_options: PopupOptions::default(),
            protocol: &identity.protocol,
            redirect_uri: &identity.redirect_uri,
            response_type: &identity.response_type,
            scope: &identity.scope,
            show_sign_up: &identity.show_sign_up,
            sso: true,
            state,
            tenant: &identity.tenant,
            ui_locales: &identity.ui_locales,
            username: &credentials.email,
            csrf,
            intstate: "deprecated",
        }
    }
}

impl fmt::Debug for CredentialPayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPayload")
            .field("client_id", &self.client_id)
            .field("connection", &self.connection)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
