use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{error::AccessError, models::Role};

/// Identity
///
/// Opaque handle for a signed-in account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Session
///
/// Authentication state at one point in time. Created as `loading` on start
/// and replaced wholesale on every change the Session Source reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Option<Identity>,
    pub email_verified: bool,
    pub loading: bool,
}

impl Session {
    pub fn loading() -> Self {
        Self {
            identity: None,
            email_verified: false,
            loading: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            identity: None,
            email_verified: false,
            loading: false,
        }
    }

    pub fn signed_in(identity: Identity, email_verified: bool) -> Self {
        Self {
            identity: Some(identity),
            email_verified,
            loading: false,
        }
    }

    pub fn identity_id(&self) -> Option<Uuid> {
        self.identity.as_ref().map(|i| i.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Changed(Session),
    Failed(String),
}

// --- Collaborator Contracts ---

/// SessionSource
///
/// The external identity provider as seen by this crate. Dropping the receiver
/// returned by `subscribe` unsubscribes.
#[async_trait]
pub trait SessionSource: Send + Sync {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent>;

    async fn sign_out(&self) -> Result<(), AccessError>;
}

/// RoleSource
///
/// Side-channel profile lookup. `Ok(None)` means the identity has no usable role.
#[async_trait]
pub trait RoleSource: Send + Sync {
    async fn fetch_role(&self, identity_id: Uuid) -> Result<Option<Role>, AccessError>;
}

/// ChannelSessionSource
///
/// In-process Session Source fed by whoever observes the identity provider
/// (a token refresher, a websocket bridge, a test). New subscribers are
/// replayed the latest event first.
#[derive(Default)]
pub struct ChannelSessionSource {
    inner: Mutex<ChannelInner>,
}

// One lock for both: replay-then-register and record-then-broadcast must not interleave.
#[derive(Default)]
struct ChannelInner {
    subscribers: Vec<mpsc::UnboundedSender<SessionEvent>>,
    latest: Option<SessionEvent>,
}

impl ChannelSessionSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ChannelInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Broadcasts an event, pruning subscribers that have gone away.
    pub fn publish(&self, event: SessionEvent) {
        let mut inner = self.lock();
        inner.latest = Some(event.clone());
        inner
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }
}

#[async_trait]
impl SessionSource for ChannelSessionSource {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if let Some(event) = inner.latest.clone() {
            let _ = tx.send(event);
        }
        inner.subscribers.push(tx);
        rx
    }

    async fn sign_out(&self) -> Result<(), AccessError> {
        self.publish(SessionEvent::Changed(Session::anonymous()));
        Ok(())
    }
}

// --- Snapshot ---

/// AuthSnapshot
///
/// The (session, role) pair consumed by the guard and the redirector.
/// `epoch` counts session changes; a role result is only applied to the epoch
/// it was requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub session: Arc<Session>,
    pub role: Option<Role>,
    pub role_pending: bool,
    pub epoch: u64,
    pub error: Option<AccessError>,
}

impl AuthSnapshot {
    pub fn initial() -> Self {
        Self {
            session: Arc::new(Session::loading()),
            role: None,
            role_pending: false,
            epoch: 0,
            error: None,
        }
    }

    /// A settled snapshot, as produced for a single HTTP request.
    pub fn settled(session: Session, role: Option<Role>) -> Self {
        Self {
            session: Arc::new(session),
            role,
            role_pending: false,
            epoch: 0,
            error: None,
        }
    }

    /// The session as decision functions should see it: still loading while
    /// the role for the current identity is unresolved.
    pub fn effective_session(&self) -> Session {
        Session {
            loading: self.session.loading || self.role_pending,
            ..(*self.session).clone()
        }
    }
}

// --- Role Resolver ---

struct RoleResult {
    epoch: u64,
    identity_id: Uuid,
    outcome: Result<Option<Role>, AccessError>,
}

/// SessionContext
///
/// Owns the authoritative `AuthSnapshot` for one subscriber of a Session Source,
/// resolves the role for each new identity through a `RoleSource` and
/// republishes the snapshot on a watch channel. Snapshots are only replaced.
/// The driver task exits when the source drops its sender or the context is dropped.
pub struct SessionContext {
    source: Arc<dyn SessionSource>,
    snapshots: watch::Receiver<AuthSnapshot>,
    driver: JoinHandle<()>,
}

impl SessionContext {
    pub fn start(source: Arc<dyn SessionSource>, roles: Arc<dyn RoleSource>) -> Self {
        let events = source.subscribe();
        let (tx, snapshots) = watch::channel(AuthSnapshot::initial());
        let driver = tokio::spawn(drive(events, roles, tx));
        Self {
            source,
            snapshots,
            driver,
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshots.clone()
    }

    pub async fn sign_out(&self) -> Result<(), AccessError> {
        self.source.sign_out().await
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    roles: Arc<dyn RoleSource>,
    tx: watch::Sender<AuthSnapshot>,
) {
    let (role_tx, mut role_rx) = mpsc::unbounded_channel::<RoleResult>();
    let mut epoch = 0u64;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::debug!("session source closed, stopping role resolver");
                    break;
                };
                epoch += 1;
                match event {
                    SessionEvent::Changed(session) => {
                        let identity_id = session.identity_id();
                        tracing::debug!(epoch, ?identity_id, verified = session.email_verified, "session changed");
                        tx.send_replace(AuthSnapshot {
                            session: Arc::new(session),
                            role: None,
                            role_pending: identity_id.is_some(),
                            epoch,
                            error: None,
                        });

                        if let Some(identity_id) = identity_id {
                            let roles = roles.clone();
                            let role_tx = role_tx.clone();
                            tokio::spawn(async move {
                                let outcome = roles.fetch_role(identity_id).await;
                                let _ = role_tx.send(RoleResult { epoch, identity_id, outcome });
                            });
                        }
                    }
                    SessionEvent::Failed(reason) => {
                        tracing::error!(epoch, %reason, "session source failed");
                        tx.send_replace(AuthSnapshot {
                            session: Arc::new(Session::anonymous()),
                            role: None,
                            role_pending: false,
                            epoch,
                            error: Some(AccessError::SessionInit(reason)),
                        });
                    }
                }
            }
            Some(result) = role_rx.recv() => {
                let current = tx.borrow().clone();
                if result.epoch != current.epoch
                    || current.session.identity_id() != Some(result.identity_id)
                {
                    let race = AccessError::NavigationRace {
                        epoch: result.epoch,
                        current: current.epoch,
                    };
                    tracing::debug!(error = %race, "discarding role result");
                    continue;
                }

                let role = match result.outcome {
                    Ok(role) => role,
                    Err(e) => {
                        tracing::warn!(error = %e, identity_id = %result.identity_id, "role unresolved, denying by default");
                        None
                    }
                };
                tx.send_replace(AuthSnapshot {
                    role,
                    role_pending: false,
                    ..current
                });
            }
        }
    }
}
