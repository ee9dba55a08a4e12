//! Profile card data

use super::serde_helpers::deserialize_flexible_i64;
use serde::{Deserialize, Serialize};

/// Profile card returned by the portal's card REST endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCard {
    #[serde(deserialize_with = "deserialize_flexible_i64")]
    pub sid: i64,
    #[serde(default)]
    pub fighter_name: String,
    #[serde(default, rename = "favorite_character_tool_name")]
    pub favorite_character_tool: String,
    #[serde(default)]
    pub platform_tool_name: String,
    #[serde(default)]
    pub home_name: String,
    #[serde(default)]
    pub title_file_name: String,
    #[serde(default)]
    pub circle_name: String,
    #[serde(default)]
    pub icon_file_name: String,
}
