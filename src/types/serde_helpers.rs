//! Custom serde deserializers for flexible type handling
//!
//! The portal is inconsistent about numeric identifiers: the same `sid` or
//! `short_id` shows up as a JSON number on one page and as a string on another.

use serde::{Deserialize, Deserializer, de};

/// Deserialize an identifier that can be:
/// - JSON integer: `3012345678`
/// - String of digits: `"3012345678"` (surrounding whitespace ignored)
///
/// Anything else (floats, non-numeric strings, booleans) is rejected so that
/// a changed payload shape surfaces as a decode error instead of a zero id.
pub fn deserialize_flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleId {
        Int(i64),
        String(String),
    }

    match FlexibleId::deserialize(deserializer)? {
        FlexibleId::Int(i) => Ok(i),
        FlexibleId::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("invalid numeric identifier: {}", s))),
    }
}
