//! Session controller state machine.
//!
//! State lives in a `watch` channel owned by the controller; every
//! transition goes through [`SessionController::apply`], which compares the
//! event generation inside the channel's modify closure. A verification
//! that resolves after a newer session event has arrived is discarded
//! rather than cancelled, so the latest event always wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::auth::VerifiedUser;

use super::backend::SessionBackend;
use super::gateway::{AuthGateway, GatewayError, ListenerGuard};

/// Application session state. Exactly one writer: the controller itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<VerifiedUser>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SessionState {
    fn initial() -> Self {
        Self {
            user: None,
            loading: true,
            error: None,
        }
    }
}

pub struct SessionController {
    gateway: Arc<dyn AuthGateway>,
    backend: Arc<dyn SessionBackend>,
    state_tx: watch::Sender<SessionState>,
    generation: AtomicU64,
    listener: Mutex<Option<ListenerGuard>>,
}

impl SessionController {
    pub fn new(gateway: Arc<dyn AuthGateway>, backend: Arc<dyn SessionBackend>) -> Arc<Self> {
        let (state_tx, _) = watch::channel(SessionState::initial());
        Arc::new(Self {
            gateway,
            backend,
            state_tx,
            generation: AtomicU64::new(0),
            listener: Mutex::new(None),
        })
    }

    /// Snapshot of the current session state.
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Receiver observing every state transition, for consuming views.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Wire the controller to the provider's session-change events. Each
    /// event verifies on its own task so a later event can supersede one
    /// still in flight. Takes a clone of the controller handle; the event
    /// pump keeps it alive until the listener is dropped.
    pub fn attach(self: Arc<Self>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Option<String>>();

        let guard = self.gateway.on_session_change(Box::new(move |credential| {
            // Forward only; verification happens on the controller's tasks.
            let _ = tx.send(credential);
        }));

        {
            let mut slot = self
                .listener
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *slot = Some(guard);
        }

        tokio::spawn(async move {
            while let Some(credential) = rx.recv().await {
                // The generation is claimed here, at event arrival, not on
                // the verification task: two in-flight verifications must
                // settle in emission order no matter how their tasks are
                // scheduled.
                let generation = self.next_generation();
                let controller = Arc::clone(&self);
                tokio::spawn(async move {
                    controller.process_session_event(generation, credential).await;
                });
            }
        });
    }

    /// Unsubscribe from provider session events.
    pub fn detach(&self) {
        let mut slot = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// React to one session-change event from the provider.
    ///
    /// A present credential triggers the verification round-trip; `None`
    /// collapses the session immediately with no network call. Failure
    /// nulls the user and records the error, never leaving a partial view.
    pub async fn handle_session_event(&self, credential: Option<String>) {
        let generation = self.next_generation();
        self.process_session_event(generation, credential).await;
    }

    async fn process_session_event(&self, generation: u64, credential: Option<String>) {
        let id_token = match credential {
            Some(token) => token,
            None => {
                debug!("Session event: signed out upstream");
                self.apply(generation, |state| {
                    state.user = None;
                    state.loading = false;
                });
                return;
            }
        };

        self.apply(generation, |state| {
            state.loading = true;
        });

        match self.backend.verify(&id_token).await {
            Ok(user) => {
                info!(uid = %user.uid, "Credential verified; session established");
                self.apply(generation, move |state| {
                    state.user = Some(user.with_token(id_token));
                    state.loading = false;
                    state.error = None;
                });
            }
            Err(e) => {
                warn!(error = %e, "Credential verification failed");
                let message = e.to_string();
                self.apply(generation, move |state| {
                    state.user = None;
                    state.loading = false;
                    state.error = Some(message);
                });
            }
        }
    }

    /// Start interactive sign-in. The user only becomes visible through
    /// the session-change listener, never through this call resolving.
    pub async fn login(&self) -> Result<(), GatewayError> {
        let generation = self.next_generation();
        self.apply(generation, |state| {
            state.loading = true;
            state.error = None;
        });

        match self.gateway.sign_in().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Interactive sign-in failed");
                let message = e.to_string();
                self.apply(generation, move |state| {
                    state.user = None;
                    state.loading = false;
                    state.error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Terminate the session: best-effort server-side revocation, provider
    /// local sign-out, then unconditional local reset.
    pub async fn logout(&self) {
        let current_token = self
            .state_tx
            .borrow()
            .user
            .as_ref()
            .and_then(|u| u.id_token.clone());

        if let Some(token) = current_token {
            if let Err(e) = self.backend.logout(&token).await {
                warn!(error = %e, "Server-side session revocation failed; continuing local sign-out");
            }
        }

        if let Err(e) = self.gateway.sign_out().await {
            warn!(error = %e, "Provider sign-out failed; clearing local session anyway");
        }

        let generation = self.next_generation();
        self.apply(generation, |state| {
            *state = SessionState {
                user: None,
                loading: false,
                error: None,
            };
        });
        info!("Signed out");
    }

    /// Install a rotated credential on the current user without a full
    /// re-verification, so later privileged calls never carry a stale
    /// token. No-op when unauthenticated.
    pub fn refresh_credential(&self, id_token: impl Into<String>) {
        let id_token = id_token.into();
        self.state_tx.send_if_modified(|state| match state.user.as_mut() {
            Some(user) => {
                debug!(uid = %user.uid, "Rotated session credential installed");
                user.id_token = Some(id_token);
                true
            }
            None => false,
        });
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply a transition only if `generation` is still the latest event.
    /// The check runs inside the watch channel's modify closure, so a stale
    /// verification result can never overwrite a newer state.
    fn apply(&self, generation: u64, f: impl FnOnce(&mut SessionState)) {
        self.state_tx.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!(generation, "Discarding superseded session transition");
                return false;
            }
            f(state);
            true
        });
    }
}
