//! Auto-submitting callback form
//!
//! After credentials are accepted the identity provider may answer with an
//! HTML form that a browser would post on load. Its action targets
//! `/login/callback` and its hidden inputs carry the authorization result.

use scraper::{Html, Selector};
use std::sync::LazyLock;

static FORM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("form[action]").expect("form selector is valid"));
static INPUT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input").expect("input selector is valid"));

/// Action and hidden fields of a callback form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackForm {
    /// Raw action attribute, possibly relative
    pub action: String,
    pub fields: Vec<(String, String)>,
}

/// First form posting to `/login/callback` that carries at least one named
/// hidden input.
pub fn find_callback_form(body: &str) -> Option<CallbackForm> {
    if body.trim().is_empty() {
        return None;
    }
    let document = Html::parse_document(body);
    let form = document.select(&FORM_SEL).find(|form| {
        form.value()
            .attr("action")
            .is_some_and(|action| action.contains("/login/callback"))
    })?;

    let fields: Vec<(String, String)> = form
        .select(&INPUT_SEL)
        .filter(|input| {
            input
                .value()
                .attr("type")
                .is_some_and(|kind| kind.eq_ignore_ascii_case("hidden"))
        })
        .filter_map(|input| {
            let name = input.value().attr("name").filter(|name| !name.is_empty())?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    if fields.is_empty() {
        return None;
    }
    Some(CallbackForm {
        action: form.value().attr("action").unwrap_or_default().to_string(),
        fields,
    })
}
