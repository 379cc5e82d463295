//! The session store: sole owner of the signed-in identity.
//!
//! `SessionStore` keeps one in-memory `Session` (or none), mirrors it to
//! persisted storage, and keeps the server-mirrored fields fresh with a
//! background reconciliation task.
//!
//! Writes are serialized through a single writer lock that also guards the
//! persisted copy, so readers always see either the whole old session or the
//! whole new one. Every network call records the session epoch it started
//! under; a response that arrives after the session was replaced or
//! destroyed is dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{self, ApiClient};
use crate::config::Config;
use crate::storage::{CachedData, FileStore, Storage};

use super::{IdentityPayload, ProfileUpdate, SentinelRule, Session, SignupRequest};

/// Storage key holding the serialized session record
pub const SESSION_KEY: &str = "user";

/// Default interval between background balance syncs
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Failure of a user-initiated auth operation. `Display` is the message to
/// show the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Not signed in")]
    NoSession,

    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,

    #[error("The session changed while the request was in flight")]
    SessionChanged,

    #[error("{0}")]
    Rejected(String),
}

/// Tunables for a `SessionStore`.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub sync_interval: Duration,
    pub sentinel: SentinelRule,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            sentinel: SentinelRule::default(),
        }
    }
}

/// Cloneable handle to the shared session state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    api: ApiClient,
    sentinel: SentinelRule,
    sync_interval: Duration,
    session_tx: watch::Sender<Option<Arc<Session>>>,
    loading_tx: watch::Sender<bool>,
    writer: Mutex<Writer>,
    sync_task: Mutex<Option<JoinHandle<()>>>,
    sync_seq: AtomicU64,
    initialized: AtomicBool,
}

/// State that only changes under the writer lock.
struct Writer {
    storage: Box<dyn Storage>,
    /// Bumped on every session replacement or destruction
    epoch: u64,
    /// Sequence number of the newest sync response applied in this epoch
    last_applied_sync: u64,
}

impl Writer {
    fn persist(&self, session: &Session) {
        let record = CachedData::new(session);
        match serde_json::to_string(&record) {
            Ok(json) => {
                if let Err(e) = self.storage.set(SESSION_KEY, &json) {
                    warn!(error = %e, "Failed to persist session");
                }
            }
            Err(e) => error!(error = %e, "Failed to serialize session"),
        }
    }

    fn purge(&self) {
        if let Err(e) = self.storage.remove(SESSION_KEY) {
            warn!(error = %e, "Failed to purge persisted session");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionStore {
    pub fn new(api: ApiClient, storage: impl Storage + 'static, options: StoreOptions) -> Self {
        let (session_tx, _) = watch::channel(None);
        let (loading_tx, _) = watch::channel(true);

        Self {
            inner: Arc::new(Inner {
                api,
                sentinel: options.sentinel,
                sync_interval: options.sync_interval,
                session_tx,
                loading_tx,
                writer: Mutex::new(Writer {
                    storage: Box::new(storage),
                    epoch: 0,
                    last_applied_sync: 0,
                }),
                sync_task: Mutex::new(None),
                sync_seq: AtomicU64::new(0),
                initialized: AtomicBool::new(false),
            }),
        }
    }

    /// Build a store backed by the on-disk cache directory from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api = ApiClient::with_timeout(&config.api_base_url(), config.request_timeout())?;
        let storage = FileStore::new(config.cache_dir()?)?;
        let options = StoreOptions {
            sync_interval: config.sync_interval(),
            ..Default::default()
        };
        Ok(Self::new(api, storage, options))
    }

    // =========================================================================
    // Read side
    // =========================================================================

    /// Snapshot of the current session.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.inner.session_tx.borrow().clone()
    }

    /// Subscribe to session changes. Receivers only ever see whole sessions.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Session>>> {
        self.inner.session_tx.subscribe()
    }

    /// Subscribe to the startup loading flag.
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.inner.loading_tx.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.inner.loading_tx.borrow()
    }

    pub fn is_admin(&self) -> bool {
        self.current().map(|s| s.is_admin()).unwrap_or(false)
    }

    /// Balance as cached right now.
    pub fn balance(&self) -> Option<f64> {
        self.current().map(|s| s.balance)
    }

    /// An API client carrying the current bearer token, if signed in.
    pub fn authorized_client(&self) -> Option<ApiClient> {
        self.current().map(|s| self.inner.api.with_token(s.token.clone()))
    }

    /// Unauthenticated client for public endpoints.
    pub fn public_client(&self) -> ApiClient {
        self.inner.api.clone()
    }

    /// Whether the background reconciliation task is running.
    pub fn is_sync_armed(&self) -> bool {
        lock(&self.inner.sync_task)
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restore the persisted session and verify it with the server.
    ///
    /// Runs once; later calls return immediately. Never fails: corrupt or
    /// ghost records are purged, an unreachable server keeps the cached
    /// session, and only an explicit credential rejection signs out.
    pub async fn initialize(&self) {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            debug!("Session store already initialized");
            return;
        }

        if let Some((epoch, token)) = self.inner.restore() {
            let seq = self.inner.next_seq();
            match self.inner.api.with_token(token).fetch_me().await {
                Ok(identity) => self.inner.apply_sync(epoch, seq, &identity),
                Err(e) if api::is_invalid_credential(&e) => {
                    info!("Stored credential rejected by server, signing out");
                    self.inner.destroy_if_epoch(epoch);
                }
                Err(e) => {
                    warn!(error = %e, "Could not verify stored session, keeping cached copy");
                }
            }
        }

        self.inner.loading_tx.send_replace(false);
        debug!(signed_in = self.current().is_some(), "Session store initialized");
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Arc<Session>, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput("Email and password are required".to_string()));
        }

        match self.inner.api.login(email, password).await {
            Ok(payload) => self.inner.establish(payload, "Login failed"),
            Err(e) => {
                warn!(error = %e, "Login failed");
                Err(AuthError::Rejected(api::failure_message(&e, "Login failed")))
            }
        }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<Arc<Session>, AuthError> {
        let request = SignupRequest {
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            phone: request.phone.trim().to_string(),
            password: request.password,
        };
        if request.name.is_empty() {
            return Err(AuthError::InvalidInput("Name is required".to_string()));
        }
        if request.email.is_empty() || request.password.is_empty() {
            return Err(AuthError::InvalidInput("Email and password are required".to_string()));
        }

        match self.inner.api.signup(&request).await {
            Ok(payload) => self.inner.establish(payload, "Signup failed"),
            Err(e) => {
                warn!(error = %e, "Signup failed");
                Err(AuthError::Rejected(api::failure_message(&e, "Signup failed")))
            }
        }
    }

    /// Sign out. The sync task is stopped before this returns.
    pub fn logout(&self) {
        if self.current().is_none() && !self.is_sync_armed() {
            return;
        }
        info!("Signing out");
        self.inner.destroy();
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Arc<Session>, AuthError> {
        let (epoch, token) = self.inner.credentials().ok_or(AuthError::NoSession)?;
        if update.is_empty() {
            return self.current().ok_or(AuthError::NoSession);
        }

        match self.inner.api.with_token(token).update_profile(&update).await {
            Ok(payload) => self.inner.apply_profile_update(epoch, &payload),
            Err(e) if api::is_invalid_credential(&e) => {
                info!("Credential rejected during profile update, signing out");
                self.inner.destroy_if_epoch(epoch);
                Err(AuthError::SessionExpired)
            }
            Err(e) => {
                warn!(error = %e, "Profile update failed");
                Err(AuthError::Rejected(api::failure_message(&e, "Update failed")))
            }
        }
    }

    /// Refresh balance and profile from the server. Best-effort: failures
    /// other than an explicit credential rejection are logged and ignored.
    pub async fn sync_balance(&self) {
        self.inner.sync_balance().await;
    }
}

impl Inner {
    /// (epoch, token) of the active session, read under the writer lock.
    fn credentials(&self) -> Option<(u64, String)> {
        let writer = lock(&self.writer);
        let current = self.session_tx.borrow();
        current.as_ref().map(|s| (writer.epoch, s.token.clone()))
    }

    /// Load the persisted record and publish it optimistically.
    fn restore(self: &Arc<Self>) -> Option<(u64, String)> {
        let mut writer = lock(&self.writer);

        let raw = match writer.storage.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted session");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        let record: CachedData<Session> = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Persisted session is corrupt, purging");
                writer.purge();
                return None;
            }
        };

        if self.sentinel.is_sentinel(&record.data) {
            warn!(user_id = %record.data.user_id, "Persisted session is a placeholder identity, purging");
            writer.purge();
            return None;
        }

        debug!(user_id = %record.data.user_id, age = %record.age_display(), "Restored persisted session");
        writer.epoch += 1;
        writer.last_applied_sync = self.sync_seq.load(Ordering::SeqCst);
        let epoch = writer.epoch;
        let token = record.data.token.clone();
        self.session_tx.send_replace(Some(Arc::new(record.data)));
        drop(writer);

        self.arm_sync();
        Some((epoch, token))
    }

    /// Turn a login/signup response into the new session, replacing any prior one.
    fn establish(self: &Arc<Self>, payload: IdentityPayload, fallback: &str) -> Result<Arc<Session>, AuthError> {
        let session = match Session::from_payload(payload) {
            Ok(session) => session,
            Err(reason) => {
                error!(?reason, "Auth response missing required fields");
                return Err(AuthError::Rejected(fallback.to_string()));
            }
        };

        if self.sentinel.is_sentinel(&session) {
            warn!(user_id = %session.user_id, "Server returned a placeholder identity, refusing it");
            return Err(AuthError::Rejected(fallback.to_string()));
        }

        info!(user_id = %session.user_id, role = %session.role, "Signed in");
        Ok(self.replace(session))
    }

    /// Swap in a new session. The old sync task is cancelled before a new one is armed.
    fn replace(self: &Arc<Self>, session: Session) -> Arc<Session> {
        self.disarm_sync();

        let session = Arc::new(session);
        {
            let mut writer = lock(&self.writer);
            writer.epoch += 1;
            writer.last_applied_sync = self.sync_seq.load(Ordering::SeqCst);
            writer.persist(&session);
            self.session_tx.send_replace(Some(session.clone()));
        }

        self.arm_sync();
        session
    }

    fn destroy(&self) {
        self.disarm_sync();

        let mut writer = lock(&self.writer);
        writer.epoch += 1;
        writer.purge();
        self.session_tx.send_replace(None);
    }

    /// Destroy the session only if it is still the one a request started under.
    fn destroy_if_epoch(&self, epoch: u64) {
        let current_epoch = lock(&self.writer).epoch;
        if current_epoch == epoch {
            self.destroy();
        } else {
            debug!(epoch, current_epoch, "Ignoring rejection for a replaced session");
        }
    }

    fn next_seq(&self) -> u64 {
        self.sync_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn sync_balance(&self) {
        let Some((epoch, token)) = self.credentials() else {
            return;
        };
        let seq = self.next_seq();

        match self.api.with_token(token).fetch_me().await {
            Ok(identity) => self.apply_sync(epoch, seq, &identity),
            Err(e) if api::is_invalid_credential(&e) => {
                info!("Credential rejected during balance sync, signing out");
                self.destroy_if_epoch(epoch);
            }
            Err(e) => {
                debug!(error = %e, "Balance sync failed, keeping cached session");
            }
        }
    }

    /// Merge a `/auth/me` response. Persists only when a field changed.
    fn apply_sync(&self, epoch: u64, seq: u64, identity: &IdentityPayload) {
        let mut writer = lock(&self.writer);
        if writer.epoch != epoch {
            debug!(epoch, current = writer.epoch, "Dropping sync response for a replaced session");
            return;
        }
        if seq <= writer.last_applied_sync {
            debug!(seq, last = writer.last_applied_sync, "Dropping out-of-order sync response");
            return;
        }
        writer.last_applied_sync = seq;

        let Some(current) = self.session_tx.borrow().clone() else {
            return;
        };
        let mut next = Session::clone(&current);
        if !next.reconcile(identity) {
            return;
        }

        // Checked before publishing so readers never observe a placeholder
        if self.sentinel.is_sentinel(&next) {
            warn!(user_id = %next.user_id, "Reconciled identity is a placeholder, signing out");
            drop(writer);
            self.destroy_if_epoch(epoch);
            return;
        }

        let session = Arc::new(next);
        self.session_tx.send_replace(Some(session.clone()));
        debug!(balance = session.balance, "Session reconciled with server");
        writer.persist(&session);
    }

    fn apply_profile_update(&self, epoch: u64, payload: &IdentityPayload) -> Result<Arc<Session>, AuthError> {
        let writer = lock(&self.writer);
        if writer.epoch != epoch {
            warn!("Session replaced during profile update, discarding response");
            return Err(AuthError::SessionChanged);
        }

        let current = self.session_tx.borrow().clone().ok_or(AuthError::NoSession)?;
        let mut next = Session::clone(&current);
        if !next.apply_profile_update(payload) {
            return Ok(current);
        }

        let next = Arc::new(next);
        writer.persist(&next);
        self.session_tx.send_replace(Some(next.clone()));
        info!(user_id = %next.user_id, "Profile updated");
        Ok(next)
    }

    // =========================================================================
    // Background reconciliation
    // =========================================================================

    fn arm_sync(self: &Arc<Self>) {
        let mut slot = lock(&self.sync_task);
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let weak = Arc::downgrade(self);
        let period = self.sync_interval;
        *slot = Some(tokio::spawn(sync_loop(weak, period)));
        debug!(interval_secs = period.as_secs_f64(), "Balance sync armed");
    }

    fn disarm_sync(&self) {
        if let Some(handle) = lock(&self.sync_task).take() {
            handle.abort();
            debug!("Balance sync disarmed");
        }
    }
}

async fn sync_loop(inner: Weak<Inner>, period: Duration) {
    let start = tokio::time::Instant::now() + period;
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.sync_balance().await;
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self
            .sync_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}
