//! JSON documents printed by the `buckler` tool

use crate::{
    BucklerClient,
    session::SESSION_COOKIES,
    types::{BattlelogPage, MatchOutcome, MatchRecord},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of `buckler login`
#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    /// Session cookies present on the portal
    pub cookies: Vec<String>,
}

impl SessionStatus {
    pub fn from_client(client: &BucklerClient) -> Self {
        let portal = &client.settings().portal.base_url;
        Self {
            authenticated: client.has_portal_session(),
            cookies: SESSION_COOKIES
                .iter()
                .filter(|name| client.session().cookie_value(portal, name).is_some())
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

/// Result of `buckler fetch`
#[derive(Debug, Serialize)]
pub struct MatchPageSummary {
    pub sid: i64,
    pub current_page: u32,
    pub total_page: u32,
    pub matches: Vec<MatchSummary>,
}

/// One match as seen from the requested player
#[derive(Debug, Serialize)]
pub struct MatchSummary {
    pub key: String,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub battle_type: String,
    pub character: Option<String>,
    pub opponent: Option<String>,
    pub opponent_character: Option<String>,
    pub outcome: Option<MatchOutcome>,
}

impl MatchPageSummary {
    pub fn new(requested_sid: &str, page: &BattlelogPage) -> Self {
        let sid = requested_sid.trim().parse().unwrap_or(page.sid);
        Self {
            sid,
            current_page: page.current_page,
            total_page: page.total_page,
            matches: page
                .replay_list
                .iter()
                .map(|record| MatchSummary::new(sid, record))
                .collect(),
        }
    }
}

impl MatchSummary {
    fn new(sid: i64, record: &MatchRecord) -> Self {
        let sides = record.sides_for(sid);
        Self {
            key: record.source_key(),
            uploaded_at: record.uploaded_at_utc(),
            battle_type: record.replay_battle_type_name.clone(),
            character: sides.map(|(me, _)| me.character_name.clone()),
            opponent: sides.map(|(_, them)| them.player.fighter_id.clone()),
            opponent_character: sides.map(|(_, them)| them.character_name.clone()),
            outcome: record.outcome_for(sid),
        }
    }
}
