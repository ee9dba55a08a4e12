//! Common test utilities and helpers
//!
//! Integration tests run the client against two local mock servers: one
//! standing in for the identity provider, one for the portal.

#![allow(dead_code)]

/// Test helper functions
pub mod helpers {
    use buckler_client::{
        BucklerClient, CookieEnvelope,
        config::Settings,
        session::{MemorySink, SessionManager},
        types::CookieRecord,
    };
    use std::sync::Arc;
    use wiremock::MockServer;

    pub const TEST_EMAIL: &str = "fighter@example.com";
    pub const TEST_PASSWORD: &str = "hunter2";
    pub const TEST_KEY: &str = "0123456789abcdef0123456789abcdef";
    pub const PORTAL_PATH: &str = "/6/buckler";

    /// Identity provider and portal mocks
    pub struct Upstream {
        pub identity: MockServer,
        pub portal: MockServer,
    }

    impl Upstream {
        pub async fn start() -> Self {
            Self {
                identity: MockServer::start().await,
                portal: MockServer::start().await,
            }
        }

        /// Absolute URL of a portal path such as `/6/buckler/auth/login`
        pub fn portal_url(&self, path: &str) -> String {
            format!("{}{}", self.portal.uri(), path)
        }

        pub fn identity_url(&self, path: &str) -> String {
            format!("{}{}", self.identity.uri(), path)
        }

        pub fn settings(&self) -> Settings {
            create_test_settings(&self.identity.uri(), &self.portal.uri())
        }
    }

    /// Settings pointing at the given identity provider and portal origins
    pub fn create_test_settings(identity: &str, portal: &str) -> Settings {
        let mut settings = Settings::default();
        settings.credentials.email = TEST_EMAIL.to_string();
        settings.credentials.password = TEST_PASSWORD.to_string();
        settings.identity.base_url = identity.to_string();
        settings.portal.base_url = format!("{}{}", portal, PORTAL_PATH);
        settings.portal.redirect_uri = format!("{}{}/auth/login", portal, PORTAL_PATH);
        settings.network.timeout_secs = 5;
        settings.session.cookie_key = Some(TEST_KEY.to_string());
        settings
    }

    /// Client that records its diagnostics in memory
    pub fn create_test_client(settings: Settings) -> (BucklerClient, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let client = BucklerClient::with_sink(settings, sink.clone()).unwrap();
        (client, sink)
    }

    pub fn create_test_session_manager(settings: Settings) -> (SessionManager, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let manager = SessionManager::new(Arc::new(settings), sink.clone()).unwrap();
        (manager, sink)
    }

    /// Put portal session cookies into the client's jar
    pub fn seed_portal_session(client: &BucklerClient) {
        let base = client.settings().portal.base_url.clone();
        client
            .import_session(&CookieEnvelope::new(
                base,
                vec![
                    CookieRecord::new("buckler_id", "seeded-id"),
                    CookieRecord::new("buckler_r_id", "seeded-rid"),
                ],
            ))
            .unwrap();
    }

    /// `Set-Cookie` values that establish the portal session
    pub fn session_cookies() -> [&'static str; 2] {
        ["buckler_id=bid-1; Path=/", "buckler_r_id=rid-1; Path=/"]
    }
}
