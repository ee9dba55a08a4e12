//! Session management for the portal client
//!
//! This module holds the pieces a logged-in portal session is made of: the
//! HTTP transport with its cookie jar, the manual redirect walker, the build
//! identifier cache, encrypted cookie envelopes, per-call deadlines, the
//! diagnostic port and the persistence port.

pub mod build_id;
pub mod context;
pub mod diagnostics;
pub mod envelope;
pub mod manager;
pub mod redirect;
pub mod store;

pub use build_id::{BuildIdCache, extract_build_id};
pub use context::CallContext;
pub use diagnostics::{DiagnosticEvent, DiagnosticSink, MemorySink, TracingSink};
pub use envelope::{EnvelopeKey, decrypt_envelope, encrypt_envelope};
pub use manager::{Exchange, SESSION_COOKIES, SessionManager};
pub use redirect::{MAX_REDIRECTS, RedirectPatterns};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
