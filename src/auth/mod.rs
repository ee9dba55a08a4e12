//! Login against the identity provider and the portal
//!
//! The login itself is an explicit state machine ([`flow`]); the portal-side
//! fallbacks it ends with are an ordered list of strategies
//! ([`strategies`]).

pub mod flow;
pub mod form;
pub mod payload;
pub mod strategies;

pub use form::{CallbackForm, find_callback_form};
pub use payload::{ChallengePayload, CredentialPayload};
pub use strategies::FallbackStrategy;
