//! Battlelog page data
//!
//! Shapes of the portal's build-identifier-qualified battlelog JSON. Only the
//! fields consumers read are modelled; unknown fields are ignored.

use super::serde_helpers::deserialize_flexible_i64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw response of the battlelog data endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattlelogResponse {
    #[serde(rename = "pageProps")]
    pub page_props: BattlelogPage,
}

/// One page of a subject's match history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattlelogPage {
    /// 1-based page number
    pub current_page: u32,
    /// Number of pages available
    pub total_page: u32,
    /// Subject the page belongs to
    #[serde(deserialize_with = "deserialize_flexible_i64")]
    pub sid: i64,
    /// Matches, newest first as served
    #[serde(default)]
    pub replay_list: Vec<MatchRecord>,
}

/// A single replay entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(default)]
    pub replay_id: String,
    /// Unix timestamp (seconds)
    pub uploaded_at: i64,
    #[serde(default)]
    pub replay_battle_type: i32,
    #[serde(default)]
    pub replay_battle_type_name: String,
    #[serde(default)]
    pub replay_battle_sub_type: i32,
    #[serde(default)]
    pub replay_battle_sub_type_name: String,
    pub player1_info: PlayerInfo,
    pub player2_info: PlayerInfo,
}

/// One side of a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player: Player,
    #[serde(default)]
    pub playing_character_id: i32,
    #[serde(default)]
    pub playing_character_name: String,
    #[serde(default)]
    pub character_name: String,
    #[serde(default)]
    pub character_tool_name: String,
    /// Per-round outcome codes; values above zero are won rounds
    #[serde(default)]
    pub round_results: Vec<i32>,
}

/// Player identity within a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub fighter_id: String,
    #[serde(deserialize_with = "deserialize_flexible_i64")]
    pub short_id: i64,
    #[serde(default)]
    pub platform_name: String,
    #[serde(default)]
    pub platform_tool_name: String,
}

/// Result of a match from the subject's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
}

impl PlayerInfo {
    /// Number of rounds this side won.
    pub fn round_wins(&self) -> usize {
        self.round_results.iter().filter(|&&r| r > 0).count()
    }
}

impl MatchRecord {
    /// Upload time as a UTC timestamp
    pub fn uploaded_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.uploaded_at, 0)
    }

    /// Split the two sides into `(subject, opponent)`.
    pub fn sides_for(&self, short_id: i64) -> Option<(&PlayerInfo, &PlayerInfo)> {
        if self.player1_info.player.short_id == short_id {
            Some((&self.player1_info, &self.player2_info))
        } else if self.player2_info.player.short_id == short_id {
            Some((&self.player2_info, &self.player1_info))
        } else {
            None
        }
    }

    /// Compare round wins for the subject against the opponent.
    ///
    /// Returns `None` when the subject played neither side.
    pub fn outcome_for(&self, short_id: i64) -> Option<MatchOutcome> {
        let (me, them) = self.sides_for(short_id)?;
        Some(match me.round_wins().cmp(&them.round_wins()) {
            std::cmp::Ordering::Greater => MatchOutcome::Win,
            std::cmp::Ordering::Less => MatchOutcome::Loss,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        })
    }

    /// Stable deduplication key: the replay id, or a composite when the
    /// portal leaves it empty.
    pub fn source_key(&self) -> String {
        if !self.replay_id.is_empty() {
            return self.replay_id.clone();
        }
        format!(
            "{}:{}:{}:{}:{}",
            self.uploaded_at,
            self.player1_info.player.short_id,
            self.player2_info.player.short_id,
            self.player1_info.character_tool_name,
            self.player2_info.character_tool_name,
        )
    }
}
