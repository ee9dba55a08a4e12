//! Portal client facade
//!
//! [`BucklerClient`] is the one object the rest of an application holds. It is
//! meant to be shared (behind an `Arc`) by every caller: one cookie jar, one
//! build identifier cache and at most one login in flight at a time.

use crate::{
    Error, Result,
    config::Settings,
    session::{
        BuildIdCache, CallContext, DiagnosticSink, EnvelopeKey, SessionManager, SessionStore,
        TracingSink, envelope,
    },
    types::CookieEnvelope,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{RwLock, watch};

/// Outcome of one login attempt as seen by every waiting caller
type LoginOutcome = Option<std::result::Result<(), Arc<Error>>>;
type LoginSlot = Mutex<Option<watch::Receiver<LoginOutcome>>>;

/// Authenticated client for the portal
#[derive(Debug)]
pub struct BucklerClient {
    session: SessionManager,
    pub(crate) build_ids: RwLock<BuildIdCache>,
    login_slot: LoginSlot,
}

enum LoginRole {
    Leader(watch::Sender<LoginOutcome>),
    Follower(watch::Receiver<LoginOutcome>),
}

/// Empties the login slot once the leading attempt ends, however it ends
struct SlotGuard<'a>(&'a LoginSlot);

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl BucklerClient {
    /// Client reporting diagnostics through `tracing`
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_sink(settings, Arc::new(TracingSink))
    }

    /// Client reporting diagnostics to `sink`
    pub fn with_sink(settings: Settings, sink: Arc<dyn DiagnosticSink>) -> Result<Self> {
        let build_ids = BuildIdCache::new(settings.build_id_ttl());
        let session = SessionManager::new(Arc::new(settings), sink)?;
        Ok(Self {
            session,
            build_ids: RwLock::new(build_ids),
            login_slot: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &Settings {
        self.session.settings()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn has_portal_session(&self) -> bool {
        self.session.has_portal_session()
    }

    /// Log in unless the portal session already exists.
    ///
    /// Concurrent callers share a single attempt: the first one runs the
    /// login, the others wait for it and receive the same outcome. When the
    /// leading caller is dropped before finishing, a waiting caller takes
    /// over. Failures are reported as [`Error::Login`]; use
    /// [`Error::root_cause`] to inspect them.
    pub async fn ensure_login(&self, ctx: &CallContext) -> Result<()> {
        loop {
            match self.claim_login() {
                None => return Ok(()),
                Some(LoginRole::Leader(tx)) => {
                    // Dropped before `tx`, so followers never see a closed
                    // channel while the slot still names it
                    let _guard = SlotGuard(&self.login_slot);
                    tracing::info!("Portal session missing, logging in");
                    let outcome = self.login(ctx).await.map_err(Arc::new);
                    match &outcome {
                        Ok(()) => tracing::info!("Portal session established"),
                        Err(e) => tracing::warn!("Login failed: {}", e),
                    }
                    tx.send_replace(Some(outcome.clone()));
                    return outcome.map_err(Error::Login);
                }
                Some(LoginRole::Follower(mut rx)) => {
                    tracing::debug!("Login already in progress, waiting for its outcome");
                    let wait = rx.wait_for(Option::is_some);
                    let seen = match ctx.remaining() {
                        Some(left) => tokio::time::timeout(left, wait)
                            .await
                            .map_err(|_| Error::timeout("login"))?,
                        None => wait.await,
                    };
                    let outcome = match seen {
                        Ok(seen) => (*seen).clone(),
                        Err(_) => None,
                    };
                    match outcome {
                        Some(Ok(())) => return Ok(()),
                        Some(Err(e)) => return Err(Error::Login(e)),
                        None => tracing::debug!("Leading login abandoned, taking over"),
                    }
                }
            }
        }
    }

    /// Join the attempt in flight or start one. `None` means the session
    /// already exists.
    fn claim_login(&self) -> Option<LoginRole> {
        if self.session.has_portal_session() {
            return None;
        }

        let mut slot = self.login_slot.lock().unwrap_or_else(PoisonError::into_inner);
        // A receiver whose sender is gone belongs to an abandoned attempt
        if let Some(rx) = slot.as_ref().filter(|rx| rx.has_changed().is_ok()) {
            return Some(LoginRole::Follower(rx.clone()));
        }
        // A login may have finished since the check above
        if self.session.has_portal_session() {
            return None;
        }
        let (tx, rx) = watch::channel(None);
        *slot = Some(rx);
        Some(LoginRole::Leader(tx))
    }

    /// Cookies the jar holds for `url`
    pub fn export_session(&self, url: &str) -> Result<CookieEnvelope> {
        self.session.export_envelope(url)
    }

    /// Load cookies into the jar; returns how many were stored
    pub fn import_session(&self, envelope: &CookieEnvelope) -> Result<usize> {
        self.session.import_envelope(envelope)
    }

    fn envelope_key(&self) -> Result<EnvelopeKey> {
        match self.settings().session.cookie_key.as_deref() {
            Some(raw) => EnvelopeKey::parse(raw),
            None => Err(Error::invalid_key("cookie encryption key missing")),
        }
    }

    /// Encrypt the portal and identity-provider cookies and hand them to
    /// `store`.
    pub async fn persist_session(&self, store: &dyn SessionStore) -> Result<()> {
        let key = self.envelope_key()?;
        let settings = self.settings();
        let bundle = vec![
            self.export_session(&settings.portal.base_url)?,
            self.export_session(&settings.identity.base_url)?,
        ];
        let blob = envelope::seal(&key, &bundle)?;
        store.save(&blob).await?;
        tracing::info!(
            "Session persisted ({} cookies)",
            bundle.iter().map(|e| e.cookies.len()).sum::<usize>()
        );
        Ok(())
    }

    /// Rehydrate cookies saved by [`persist_session`](Self::persist_session).
    ///
    /// Returns `false` when the store is empty.
    pub async fn restore_session(&self, store: &dyn SessionStore) -> Result<bool> {
        let key = self.envelope_key()?;
        let Some(blob) = store.load().await? else {
            tracing::debug!("No stored session");
            return Ok(false);
        };
        let bundle: Vec<CookieEnvelope> = envelope::open(&key, &blob)?;
        let mut restored = 0;
        for env in &bundle {
            restored += self.import_session(env)?;
        }
        tracing::info!("Session restored ({} cookies)", restored);
        Ok(true)
    }
}
