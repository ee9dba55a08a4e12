//! Battlelog and profile card retrieval against a mocked portal

mod common;

use buckler_client::{BucklerClient, CallContext, Error, session::MemorySink, types::MatchOutcome};
use common::helpers::*;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

const SID: &str = "3012345678";
const BATTLELOG_PAGE: &str = "/6/buckler/ja-jp/profile/3012345678/battlelog";

fn build_page(build_id: &str) -> String {
    format!(
        r#"<html><script id="__NEXT_DATA__" type="application/json">{{"props":{{}},"page":"/[locale]/profile/[sid]/battlelog","buildId":"{}","isFallback":false}}</script></html>"#,
        build_id
    )
}

fn data_path(build_id: &str) -> String {
    format!(
        "/6/buckler/_next/data/{}/ja-jp/profile/3012345678/battlelog/custom.json",
        build_id
    )
}

fn player(short_id: i64, name: &str, character: &str, rounds: Vec<i32>) -> Value {
    json!({
        "player": {
            "fighter_id": name,
            "short_id": short_id,
            "platform_name": "Steam"
        },
        "playing_character_id": 1,
        "playing_character_name": character,
        "character_name": character,
        "round_results": rounds
    })
}

fn battlelog_body(page: u32) -> Value {
    json!({
        "pageProps": {
            "current_page": page,
            "total_page": 5,
            "sid": 3012345678_i64,
            "replay_list": [
                {
                    "replay_id": "ABCDEF123",
                    "uploaded_at": 1700000000,
                    "replay_battle_type": 3,
                    "replay_battle_type_name": "Custom Room",
                    "player1_info": player(3012345678, "Alpha", "Ryu", vec![1, 1]),
                    "player2_info": player(3087654321, "Beta", "Ken", vec![0, 0])
                },
                {
                    "replay_id": "ABCDEF124",
                    "uploaded_at": 1700000100,
                    "player1_info": player(3087654321, "Beta", "Ken", vec![1, 0, 1]),
                    "player2_info": player(3012345678, "Alpha", "Ryu", vec![0, 1, 0])
                }
            ]
        },
        "__N_SSP": true
    })
}

async fn logged_in(upstream: &Upstream) -> (BucklerClient, Arc<MemorySink>) {
    let (client, sink) = create_test_client(upstream.settings());
    seed_portal_session(&client);
    (client, sink)
}

#[tokio::test]
async fn test_fetch_match_page() {
    let upstream = Upstream::start().await;
    Mock::given(method("GET"))
        .and(path(BATTLELOG_PAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string(build_page("abc123")))
        .expect(1)
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path(data_path("abc123")))
        .and(query_param("sid", SID))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(battlelog_body(2)))
        .expect(1)
        .mount(&upstream.portal)
        .await;

    let (client, sink) = logged_in(&upstream).await;
    let page = client
        .fetch_match_page(&CallContext::background(), SID, 2)
        .await
        .unwrap();

    assert_eq!(page.current_page, 2);
    assert_eq!(page.total_page, 5);
    assert_eq!(page.sid, 3012345678);
    assert_eq!(page.replay_list.len(), 2);
    assert_eq!(page.replay_list[1].uploaded_at, 1700000100);
    assert_eq!(
        page.replay_list[0].outcome_for(3012345678),
        Some(MatchOutcome::Win)
    );
    assert_eq!(
        page.replay_list[1].outcome_for(3012345678),
        Some(MatchOutcome::Loss)
    );
    assert!(sink.steps().contains(&"build_id"));
}

#[tokio::test]
async fn test_build_id_is_cached_between_pages() {
    let upstream = Upstream::start().await;
    Mock::given(method("GET"))
        .and(path(BATTLELOG_PAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string(build_page("abc123")))
        .expect(1)
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path(data_path("abc123")))
        .respond_with(ResponseTemplate::new(200).set_body_json(battlelog_body(1)))
        .expect(2)
        .mount(&upstream.portal)
        .await;

    let (client, _) = logged_in(&upstream).await;
    let ctx = CallContext::background();
    client.fetch_match_page(&ctx, SID, 1).await.unwrap();
    client.fetch_match_page(&ctx, SID, 2).await.unwrap();
}

#[tokio::test]
async fn test_page_below_one_requests_first_page() {
    let upstream = Upstream::start().await;
    Mock::given(method("GET"))
        .and(path(BATTLELOG_PAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string(build_page("abc123")))
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path(data_path("abc123")))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(battlelog_body(1)))
        .expect(1)
        .mount(&upstream.portal)
        .await;

    let (client, _) = logged_in(&upstream).await;
    let page = client
        .fetch_match_page(&CallContext::background(), SID, -3)
        .await
        .unwrap();
    assert_eq!(page.current_page, 1);
}

#[tokio::test]
async fn test_stale_build_id_is_refreshed_once() {
    let upstream = Upstream::start().await;
    Mock::given(method("GET"))
        .and(path(BATTLELOG_PAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string(build_page("old1")))
        .up_to_n_times(1)
        .expect(1)
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path(BATTLELOG_PAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string(build_page("new2")))
        .expect(1)
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path(data_path("old1")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path(data_path("new2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(battlelog_body(1)))
        .expect(1)
        .mount(&upstream.portal)
        .await;

    let (client, sink) = logged_in(&upstream).await;
    let page = client
        .fetch_match_page(&CallContext::background(), SID, 1)
        .await
        .unwrap();

    assert_eq!(page.replay_list.len(), 2);
    let steps = sink.steps();
    assert!(steps.contains(&"build_id_stale"));
    assert_eq!(steps.iter().filter(|s| **s == "build_id").count(), 2);
}

#[tokio::test]
async fn test_second_stale_response_is_an_error() {
    let upstream = Upstream::start().await;
    Mock::given(method("GET"))
        .and(path(BATTLELOG_PAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string(build_page("abc123")))
        .expect(2)
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path(data_path("abc123")))
        .respond_with(ResponseTemplate::new(410))
        .expect(2)
        .mount(&upstream.portal)
        .await;

    let (client, _) = logged_in(&upstream).await;
    let err = client
        .fetch_match_page(&CallContext::background(), SID, 1)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UpstreamStatus { code: 410, .. }));
    assert_eq!(err.status_code(), Some(410));
}

#[tokio::test]
async fn test_other_error_status_is_not_retried() {
    let upstream = Upstream::start().await;
    Mock::given(method("GET"))
        .and(path(BATTLELOG_PAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string(build_page("abc123")))
        .expect(1)
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path(data_path("abc123")))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&upstream.portal)
        .await;

    let (client, _) = logged_in(&upstream).await;
    let err = client
        .fetch_match_page(&CallContext::background(), SID, 1)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn test_malformed_battlelog_is_a_decode_error() {
    let upstream = Upstream::start().await;
    Mock::given(method("GET"))
        .and(path(BATTLELOG_PAGE))
        .respond_with(ResponseTemplate::new(200).set_body_string(build_page("abc123")))
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path(data_path("abc123")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&upstream.portal)
        .await;

    let (client, _) = logged_in(&upstream).await;
    let err = client
        .fetch_match_page(&CallContext::background(), SID, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}

#[tokio::test]
async fn test_build_id_found_after_redirect() {
    let upstream = Upstream::start().await;
    Mock::given(method("GET"))
        .and(path("/6/buckler/ja-jp"))
        .respond_with(ResponseTemplate::new(307).insert_header("Location", "/6/buckler/ja-jp/top"))
        .expect(1)
        .mount(&upstream.portal)
        .await;
    Mock::given(method("GET"))
        .and(path("/6/buckler/ja-jp/top"))
        .respond_with(ResponseTemplate::new(200).set_body_string(build_page("via-redirect")))
        .expect(1)
        .mount(&upstream.portal)
        .await;

    let (client, _) = logged_in(&upstream).await;
    let ctx = CallContext::background();
    assert_eq!(client.fetch_build_id(&ctx, "").await.unwrap(), "via-redirect");
    // Served from the cache now
    assert_eq!(client.fetch_build_id(&ctx, "").await.unwrap(), "via-redirect");
}

#[tokio::test]
async fn test_build_id_missing() {
    let upstream = Upstream::start().await;
    Mock::given(method("GET"))
        .and(path("/6/buckler/ja-jp"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>no data</html>"))
        .mount(&upstream.portal)
        .await;

    let (client, _) = logged_in(&upstream).await;
    let err = client
        .fetch_build_id(&CallContext::background(), "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BuildIdNotFound { .. }));
}

#[tokio::test]
async fn test_fetch_profile_card() {
    let upstream = Upstream::start().await;
    Mock::given(method("GET"))
        .and(path("/6/buckler/api/ja-jp/card/3012345678"))
        .and(header("accept", "*/*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sid": "3012345678",
            "fighter_name": "Alpha",
            "favorite_character_tool_name": "ryu",
            "platform_tool_name": "steam",
            "home_name": "Japan"
        })))
        .expect(1)
        .mount(&upstream.portal)
        .await;

    let (client, _) = logged_in(&upstream).await;
    let card = client
        .fetch_profile_card(&CallContext::background(), SID)
        .await
        .unwrap();
    assert_eq!(card.sid, 3012345678);
    assert_eq!(card.fighter_name, "Alpha");
    assert_eq!(card.favorite_character_tool, "ryu");
}

#[tokio::test]
async fn test_profile_card_requires_ok_status() {
    let upstream = Upstream::start().await;
    Mock::given(method("GET"))
        .and(path("/6/buckler/api/ja-jp/card/3012345678"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&upstream.portal)
        .await;

    let (client, _) = logged_in(&upstream).await;
    let err = client
        .fetch_profile_card(&CallContext::background(), SID)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamStatus { code: 204, .. }));
}

#[tokio::test]
async fn test_fetch_without_session_logs_in_first() {
    let upstream = Upstream::start().await;
    // Identity provider is silent, so the login cannot succeed
    let (client, _) = create_test_client(upstream.settings());
    let err = client
        .fetch_profile_card(&CallContext::background(), SID)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Login(_)));
    let card_requests = upstream
        .portal
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path().contains("/card/"))
        .count();
    assert_eq!(card_requests, 0);
}
