//! Diagnostic event port
//!
//! The client reports what it does through a [`DiagnosticSink`] chosen at
//! construction time. Per-request events are only produced when
//! `logging.debug` is set; login steps are always reported. Cookie values
//! never leave the jar: events carry names and lengths only.

use std::fmt;
use std::sync::Mutex;

/// Something worth reporting about a login or fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// Outbound request with the cookies the jar will attach
    Request {
        method: String,
        url: String,
        cookies: Vec<String>,
    },
    /// Response status, redirect target and the names of cookies it set
    Response {
        status: u16,
        location: Option<String>,
        set_cookies: Vec<String>,
    },
    /// Login state-machine transition or data-retrieval milestone
    Step { step: &'static str, detail: String },
}

/// Receiver of diagnostic events
pub trait DiagnosticSink: Send + Sync + fmt::Debug {
    fn record(&self, event: &DiagnosticEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::Request {
                method,
                url,
                cookies,
            } => tracing::debug!(%method, %url, cookies = %summarize(cookies), "request"),
            DiagnosticEvent::Response {
                status,
                location,
                set_cookies,
            } => tracing::debug!(
                status,
                location = location.as_deref().unwrap_or(""),
                set_cookies = %summarize(set_cookies),
                "response"
            ),
            DiagnosticEvent::Step { step, detail } => tracing::info!(step, "{}", detail),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Names of the recorded steps, in order
    pub fn steps(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DiagnosticEvent::Step { step, .. } => Some(step),
                _ => None,
            })
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, event: &DiagnosticEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

fn summarize(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(" ")
    }
}
