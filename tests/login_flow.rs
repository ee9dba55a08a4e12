//! End-to-end login against mocked identity provider and portal

mod common;

use buckler_client::{CallContext, Error, session::DiagnosticEvent};
use common::helpers::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{body_json, body_partial_json, body_string_contains, header, method, path, query_param},
};

/// Authorize, login page and challenge: the part every login shares
async fn mount_login_start(upstream: &Upstream) {
    Mock::given(method("GET"))
        .and(path("/authorize"))
        .and(query_param("response_type", "code"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/login?state=st-123&client=cid"),
        )
        .expect(1)
        .mount(&upstream.identity)
        .await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .and(query_param("state", "st-123"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "_csrf=csrf-token; Path=/")
                .set_body_string("<html>login</html>"),
        )
        .expect(1)
        .mount(&upstream.identity)
        .await;

    Mock::given(method("POST"))
        .and(path("/usernamepassword/challenge"))
        .and(body_json(json!({ "state": "st-123" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&upstream.identity)
        .await;
}

/// Portal login callback that hands out the session cookies
async fn mount_portal_callback(upstream: &Upstream) {
    let [id, rid] = session_cookies();
    Mock::given(method("GET"))
        .and(path("/6/buckler/ja-jp/auth/login"))
        .and(header("sec-fetch-mode", "navigate"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/6/buckler/ja-jp/")
                .append_header("Set-Cookie", id)
                .append_header("Set-Cookie", rid),
        )
        .expect(1)
        .mount(&upstream.portal)
        .await;
}

#[tokio::test]
async fn test_login_follows_redirect_back_to_portal() {
    let upstream = Upstream::start().await;
    mount_login_start(&upstream).await;
    mount_portal_callback(&upstream).await;

    Mock::given(method("POST"))
        .and(path("/usernamepassword/login"))
        .and(body_partial_json(json!({
            "username": TEST_EMAIL,
            "password": TEST_PASSWORD,
            "state": "st-123",
            "_csrf": "csrf-token",
            "show_sing_up": "0",
            "sso": true
        })))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            upstream.portal_url("/6/buckler/auth/login?code=xyz").as_str(),
        ))
        .expect(1)
        .mount(&upstream.identity)
        .await;

    let (client, sink) = create_test_client(upstream.settings());
    assert!(!client.has_portal_session());

    client
        .ensure_login(&CallContext::background())
        .await
        .unwrap();

    assert!(client.has_portal_session());
    let steps = sink.steps();
    assert_eq!(
        steps.iter().filter(|s| **s != "follow").copied().collect::<Vec<_>>(),
        vec![
            "authorize_requested",
            "login_page_fetched",
            "challenge_sent",
            "credentials_submitted",
            "redirect_following",
            "authenticated"
        ]
    );
    assert!(steps.contains(&"follow"));

    // A second call finds the session and stays off the network
    client
        .ensure_login(&CallContext::background())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_login_posts_callback_form() {
    let upstream = Upstream::start().await;
    mount_login_start(&upstream).await;
    mount_portal_callback(&upstream).await;

    let form = r#"<html><body>
        <form method="post" name="hiddenform" action="/login/callback">
            <input type="hidden" name="wa" value="wsignin1.0">
            <input type="hidden" name="wresult" value="token-value">
            <input type="hidden" name="wctx" value="{&#34;state&#34;:&#34;st-123&#34;}">
        </form>
    </body></html>"#;
    Mock::given(method("POST"))
        .and(path("/usernamepassword/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(form))
        .expect(1)
        .mount(&upstream.identity)
        .await;

    Mock::given(method("POST"))
        .and(path("/login/callback"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("wresult=token-value"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            upstream.portal_url("/6/buckler/auth/login?code=form").as_str(),
        ))
        .expect(1)
        .mount(&upstream.identity)
        .await;

    let (client, sink) = create_test_client(upstream.settings());
    client
        .ensure_login(&CallContext::background())
        .await
        .unwrap();

    assert!(client.has_portal_session());
    assert!(sink.steps().contains(&"callback_form"));
}

#[tokio::test]
async fn test_login_recovers_through_portal_top_fallback() {
    let upstream = Upstream::start().await;
    mount_login_start(&upstream).await;
    mount_portal_callback(&upstream).await;

    // Credentials accepted, but nothing leads back to the portal
    Mock::given(method("POST"))
        .and(path("/usernamepassword/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&upstream.identity)
        .await;

    let embedded = format!(
        r#"<html><script>location.href="{}";</script></html>"#,
        upstream.identity_url("/authorize?client_id=portal&state=p1")
    );
    Mock::given(method("GET"))
        .and(path("/6/buckler/ja-jp/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(embedded))
        .expect(1)
        .mount(&upstream.portal)
        .await;

    Mock::given(method("GET"))
        .and(path("/authorize"))
        .and(query_param("client_id", "portal"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            upstream.portal_url("/6/buckler/auth/login?code=fallback").as_str(),
        ))
        .expect(1)
        .mount(&upstream.identity)
        .await;

    let (client, sink) = create_test_client(upstream.settings());
    client
        .ensure_login(&CallContext::background())
        .await
        .unwrap();

    assert!(client.has_portal_session());
    let steps = sink.steps();
    assert!(steps.contains(&"portal_authorize"));
    assert!(steps.contains(&"portal_top"));
    assert_eq!(steps.last(), Some(&"authenticated"));

    // Locale cookies were primed before the fallbacks ran
    let portal = client.settings().portal.base_url.clone();
    assert_eq!(
        client.session().cookie_value(&portal, "pll_language").as_deref(),
        Some("ja-jp")
    );
}

/// Credentials accepted, but nothing leads back to the portal
async fn mount_dead_end_credentials(upstream: &Upstream) {
    Mock::given(method("POST"))
        .and(path("/usernamepassword/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&upstream.identity)
        .await;
}

/// Paths the portal was asked for, in order
async fn portal_paths(upstream: &Upstream) -> Vec<String> {
    upstream
        .portal
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_login_recovers_through_login_entry_data() {
    let upstream = Upstream::start().await;
    mount_login_start(&upstream).await;
    mount_portal_callback(&upstream).await;
    mount_dead_end_credentials(&upstream).await;

    Mock::given(method("GET"))
        .and(path("/6/buckler/ja-jp/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path("/6/buckler/ja-jp"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<script>{"buildId":"bid9"}</script>"#),
        )
        .expect(1)
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path("/6/buckler/_next/data/bid9/ja-jp/auth/loginep.json"))
        .and(header("x-nextjs-data", "1"))
        .and(query_param("redirect_url", "/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pageProps": {
                "__N_REDIRECT": upstream.identity_url("/authorize?client_id=loginep"),
                "__N_REDIRECT_STATUS": 307
            }
        })))
        .expect(1)
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path("/authorize"))
        .and(query_param("client_id", "loginep"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            upstream.portal_url("/6/buckler/auth/login?code=b").as_str(),
        ))
        .expect(1)
        .mount(&upstream.identity)
        .await;

    let (client, sink) = create_test_client(upstream.settings());
    client
        .ensure_login(&CallContext::background())
        .await
        .unwrap();

    assert!(client.has_portal_session());
    let steps = sink.steps();
    assert!(steps.contains(&"login_entry_data"));
    assert!(!steps.contains(&"portal_top"));
    assert!(!steps.contains(&"portal_login_entry"));
    assert_eq!(steps.last(), Some(&"authenticated"));
}

#[tokio::test]
async fn test_login_recovers_through_portal_login_entry() {
    let upstream = Upstream::start().await;
    mount_login_start(&upstream).await;
    mount_dead_end_credentials(&upstream).await;

    // The top page and build page are unmounted and answer 404
    Mock::given(method("GET"))
        .and(path("/6/buckler/ja-jp/auth/login"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            upstream.identity_url("/authorize?client_id=entry").as_str(),
        ))
        .with_priority(1)
        .up_to_n_times(1)
        .expect(1)
        .mount(&upstream.portal)
        .await;
    mount_portal_callback(&upstream).await;
    Mock::given(method("GET"))
        .and(path("/authorize"))
        .and(query_param("client_id", "entry"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            upstream.portal_url("/6/buckler/auth/login?code=c").as_str(),
        ))
        .expect(1)
        .mount(&upstream.identity)
        .await;

    let (client, sink) = create_test_client(upstream.settings());
    client
        .ensure_login(&CallContext::background())
        .await
        .unwrap();

    assert!(client.has_portal_session());
    let steps = sink.steps();
    assert!(steps.contains(&"portal_login_entry"));
    assert!(!steps.contains(&"portal_top"));
    assert!(!steps.contains(&"login_entry_data"));
    assert_eq!(steps.last(), Some(&"authenticated"));

    // Earlier strategies were tried first
    let paths = portal_paths(&upstream).await;
    assert_eq!(
        paths,
        vec![
            "/6/buckler/ja-jp/",
            "/6/buckler/ja-jp",
            "/6/buckler/ja-jp/auth/login",
            "/6/buckler/ja-jp/auth/login",
        ]
    );
}

#[tokio::test]
async fn test_login_recovers_through_portal_authorize() {
    let upstream = Upstream::start().await;
    mount_login_start(&upstream).await;
    mount_dead_end_credentials(&upstream).await;

    // The portal's own login entry leads nowhere the first time
    Mock::given(method("GET"))
        .and(path("/6/buckler/ja-jp/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .with_priority(1)
        .up_to_n_times(1)
        .expect(1)
        .mount(&upstream.portal)
        .await;
    mount_portal_callback(&upstream).await;
    Mock::given(method("GET"))
        .and(path("/authorize"))
        .and(query_param("client_id", "portal-cid"))
        .and(query_param(
            "redirect_uri",
            upstream.portal_url("/6/buckler/auth/login").as_str(),
        ))
        .and(query_param("response_type", "code"))
        .and(query_param("scope", "openid"))
        .and(query_param("audience", "urn:rebe:capcom:apis"))
        .and(query_param("ui_locales", "ja"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            upstream.portal_url("/6/buckler/auth/login?code=d").as_str(),
        ))
        .with_priority(1)
        .expect(1)
        .mount(&upstream.identity)
        .await;

    let mut settings = upstream.settings();
    settings.portal.client_id = Some("portal-cid".to_string());
    let (client, sink) = create_test_client(settings);
    client
        .ensure_login(&CallContext::background())
        .await
        .unwrap();

    assert!(client.has_portal_session());
    let steps = sink.steps();
    // Once for the login state, once for the strategy that found a URL
    assert_eq!(steps.iter().filter(|s| **s == "portal_authorize").count(), 2);
    assert!(!steps.contains(&"portal_top"));
    assert!(!steps.contains(&"login_entry_data"));
    assert!(!steps.contains(&"portal_login_entry"));

    let requests = upstream.identity.received_requests().await.unwrap();
    let state = requests
        .iter()
        .filter(|r| r.url.path() == "/authorize")
        .find(|r| r.url.query_pairs().any(|(k, v)| k == "client_id" && v == "portal-cid"))
        .and_then(|r| r.url.query_pairs().find(|(k, _)| k == "state"))
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(state.len(), 24);
    assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[tokio::test]
async fn test_login_ends_when_credentials_set_session() {
    let upstream = Upstream::start().await;
    mount_login_start(&upstream).await;

    // Both mock servers share a host, so these cookies reach the portal too
    let [id, rid] = session_cookies();
    Mock::given(method("POST"))
        .and(path("/usernamepassword/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("Set-Cookie", id)
                .append_header("Set-Cookie", rid)
                .set_body_string("{}"),
        )
        .expect(1)
        .mount(&upstream.identity)
        .await;

    let (client, sink) = create_test_client(upstream.settings());
    client
        .ensure_login(&CallContext::background())
        .await
        .unwrap();

    assert!(client.has_portal_session());
    assert_eq!(
        sink.steps(),
        vec![
            "authorize_requested",
            "login_page_fetched",
            "challenge_sent",
            "credentials_submitted",
            "authenticated"
        ]
    );
    assert!(portal_paths(&upstream).await.is_empty());
}

#[tokio::test]
async fn test_login_fails_when_every_fallback_comes_up_empty() {
    let upstream = Upstream::start().await;
    mount_login_start(&upstream).await;

    Mock::given(method("POST"))
        .and(path("/usernamepassword/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&upstream.identity)
        .await;
    // The portal answers nothing but 404s

    let (client, sink) = create_test_client(upstream.settings());
    let err = client
        .ensure_login(&CallContext::background())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Login(_)));
    assert!(matches!(err.root_cause(), Error::SessionNotEstablished));
    assert!(!client.has_portal_session());
    assert_eq!(sink.steps().last(), Some(&"failed"));
}

#[tokio::test]
async fn test_login_aborts_on_transport_error() {
    // Nothing listens on port 9 locally
    let mut settings = create_test_settings("http://127.0.0.1:9", "http://127.0.0.1:9");
    settings.network.timeout_secs = 2;
    let (client, sink) = create_test_client(settings);

    let err = client
        .ensure_login(&CallContext::background())
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert!(sink.steps().is_empty());
}

#[tokio::test]
async fn test_debug_events_never_carry_cookie_values() {
    let upstream = Upstream::start().await;
    mount_login_start(&upstream).await;
    mount_portal_callback(&upstream).await;
    Mock::given(method("POST"))
        .and(path("/usernamepassword/login"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "Location",
            upstream.portal_url("/6/buckler/auth/login?code=xyz").as_str(),
        ))
        .mount(&upstream.identity)
        .await;

    let mut settings = upstream.settings();
    settings.logging.debug = true;
    let (client, sink) = create_test_client(settings);
    client
        .ensure_login(&CallContext::background())
        .await
        .unwrap();

    let events = sink.events();
    assert!(events.iter().any(|e| matches!(
        e,
        DiagnosticEvent::Response { set_cookies, .. } if set_cookies.iter().any(|c| c == "buckler_id")
    )));
    let rendered = format!("{:?}", events);
    assert!(!rendered.contains("csrf-token"));
    assert!(!rendered.contains("bid-1"));
    assert!(!rendered.contains(TEST_PASSWORD));
}
