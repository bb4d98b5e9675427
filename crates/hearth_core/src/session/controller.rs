//! Session controller: identity, profile and family resolution.
//!
//! # Responsibility
//! - Mirror the identity notifier into an explicit session phase.
//! - Run sign-in/up/out and family create/join actions.
//!
//! # Invariants
//! - `identity`/`profile` change only through the identity notifier, except
//!   for family create/join (no identity event fires for those) and
//!   sign-out (which always clears everything).
//! - Every async resolution is tagged with the epoch it started in; a
//!   completion from an older epoch is discarded, so sign-out always wins.
//! - Failed actions set `error`, end `loading` and return the error to the
//!   caller. Nothing is retried automatically.
//! - Re-fetching the family the session already holds keeps it in
//!   `WithFamily`; the family id only changes on a real switch or loss.

use crate::error::{CoreError, CoreResult};
use crate::model::identity::{Family, Identity, Profile};
use crate::remote::{
    FamilyDirectory, IdentityCallback, IdentityProvider, ProfileDirectory, Subscription,
};
use crate::session::invite::normalize_invite_code;
use crate::session::state::{SessionPhase, SessionState};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Owns the session state machine.
pub struct SessionController {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileDirectory>,
    families: Arc<dyn FamilyDirectory>,
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
    notifier: Mutex<Option<Subscription>>,
}

impl SessionController {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileDirectory>,
        families: Arc<dyn FamilyDirectory>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            identity,
            profiles,
            families,
            state,
            epoch: AtomicU64::new(0),
            notifier: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every session transition.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Attaches to the identity notifier. Calling it again is a no-op.
    ///
    /// Must run inside a tokio runtime; profile and family fetches are
    /// spawned on it.
    pub async fn initialize(self: &Arc<Self>) {
        let mut notifier = lock(&self.notifier);
        if notifier.is_some() {
            debug!("event=session_init module=session status=skip reason=already_initialized");
            return;
        }

        let runtime = Handle::current();
        let controller = Arc::downgrade(self);
        let callback: IdentityCallback = Arc::new(move |identity: Option<Identity>| {
            let Some(controller) = controller.upgrade() else {
                return;
            };
            let epoch = controller.on_identity_event(identity.clone());
            if let Some(identity) = identity {
                runtime.spawn(async move {
                    let _ = controller.resolve_identity(identity, epoch).await;
                });
            }
        });

        *notifier = Some(self.identity.on_identity_change(callback));
        info!("event=session_init module=session status=ok");
    }

    /// Detaches from the identity notifier.
    pub fn shutdown(&self) {
        if let Some(handle) = lock(&self.notifier).take() {
            handle.cancel();
            info!("event=session_shutdown module=session status=ok");
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> CoreResult<()> {
        require_credentials(email, password).map_err(|err| self.reject("sign_in", err))?;
        self.begin_action();
        match self.identity.sign_in(email.trim(), password).await {
            Ok(()) => {
                info!("event=session_sign_in module=session status=ok");
                Ok(())
            }
            Err(err) => Err(self.fail_action("sign_in", err.into())),
        }
    }

    /// Creates the account; the profile document is written by the identity
    /// collaborator.
    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> CoreResult<()> {
        require_credentials(email, password).map_err(|err| self.reject("sign_up", err))?;
        if name.trim().is_empty() {
            return Err(self.reject("sign_up", CoreError::invalid_argument("name is required")));
        }
        self.begin_action();
        match self
            .identity
            .sign_up(email.trim(), password, name.trim())
            .await
        {
            Ok(()) => {
                info!("event=session_sign_up module=session status=ok");
                Ok(())
            }
            Err(err) => Err(self.fail_action("sign_up", err.into())),
        }
    }

    pub async fn sign_in_with_google(&self, id_token: &str) -> CoreResult<()> {
        if id_token.trim().is_empty() {
            return Err(self.reject(
                "sign_in_google",
                CoreError::invalid_argument("google token is required"),
            ));
        }
        self.begin_action();
        match self.identity.sign_in_with_google(id_token).await {
            Ok(()) => {
                info!("event=session_sign_in_google module=session status=ok");
                Ok(())
            }
            Err(err) => Err(self.fail_action("sign_in_google", err.into())),
        }
    }

    /// Signs out and clears identity, profile and family even when the
    /// collaborator call fails.
    pub async fn sign_out(&self) -> CoreResult<()> {
        self.begin_action();
        let result = self.identity.sign_out().await;
        let error = result.as_ref().err().map(|err| err.message.clone());
        self.state.send_modify(|state| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            state.phase = SessionPhase::SignedOut;
            state.loading = false;
            state.error = error;
        });

        match result {
            Ok(()) => {
                info!("event=session_sign_out module=session status=ok");
                Ok(())
            }
            Err(err) => {
                let err = CoreError::from(err);
                warn!(
                    "event=session_sign_out module=session status=error error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Creates a family owned by the signed-in user and adopts it.
    pub async fn create_family(&self, name: &str) -> CoreResult<Family> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.reject(
                "create_family",
                CoreError::invalid_argument("family name is required"),
            ));
        }
        let identity = self.require_unassigned_identity("create_family")?;

        let epoch = self.epoch.load(Ordering::SeqCst);
        self.begin_action();
        let family = match self.families.create_family(name, &identity.id).await {
            Ok(family) => family,
            Err(err) => return Err(self.fail_action("create_family", err.into())),
        };
        self.adopt_family(epoch, "create_family", identity, family)
            .await
    }

    /// Joins the family behind `code` and adopts it.
    pub async fn join_family(&self, code: &str) -> CoreResult<Family> {
        let Some(code) = normalize_invite_code(code) else {
            return Err(self.reject("join_family", CoreError::InvalidInviteCode));
        };
        let identity = self.require_unassigned_identity("join_family")?;

        let epoch = self.epoch.load(Ordering::SeqCst);
        self.begin_action();
        match self
            .families
            .join_family_by_invite_code(&code, &identity.id)
            .await
        {
            Ok(Some(family)) => {
                self.adopt_family(epoch, "join_family", identity, family)
                    .await
            }
            Ok(None) => Err(self.fail_action("join_family", CoreError::InvalidInviteCode)),
            Err(err) => Err(self.fail_action("join_family", err.into())),
        }
    }

    /// Re-reads the family of the signed-in profile.
    ///
    /// A no-op when the profile has no family.
    pub async fn load_family_data(&self) -> CoreResult<()> {
        let snapshot = self.state();
        let Some(identity) = snapshot.identity().cloned() else {
            return Err(self.reject("load_family", CoreError::Unauthenticated));
        };
        let Some(profile) = snapshot.profile().filter(|p| p.has_family()).cloned() else {
            debug!("event=session_load_family module=session status=skip reason=no_family");
            return Ok(());
        };

        let epoch = self.epoch.load(Ordering::SeqCst);
        let started = self.commit(epoch, |state| {
            state.phase = refetch_phase(&state.phase, identity.clone(), profile.clone());
            state.loading = true;
            state.error = None;
        });
        if !started {
            return Ok(());
        }
        self.fetch_family(epoch, identity, profile).await
    }

    /// Re-reads the profile (and family) of the signed-in identity.
    pub async fn refresh_profile(&self) -> CoreResult<()> {
        let Some(identity) = self.state().identity().cloned() else {
            return Err(self.reject("refresh_profile", CoreError::Unauthenticated));
        };
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.begin_action();
        self.resolve_identity(identity, epoch).await
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    fn on_identity_event(&self, identity: Option<Identity>) -> u64 {
        let mut epoch = 0;
        self.state.send_modify(|state| {
            epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            match identity {
                Some(identity) => {
                    let same_identity = state
                        .identity()
                        .is_some_and(|current| current.id == identity.id);
                    if !same_identity {
                        state.phase = SessionPhase::Authenticating {
                            identity: Some(identity),
                        };
                    }
                    state.loading = true;
                    state.error = None;
                }
                None => {
                    state.phase = SessionPhase::SignedOut;
                    state.loading = false;
                }
            }
        });
        info!(
            "event=session_identity module=session status=ok epoch={} phase={}",
            epoch,
            self.state.borrow().phase.name()
        );
        epoch
    }

    async fn resolve_identity(&self, identity: Identity, epoch: u64) -> CoreResult<()> {
        let profile = match self.profiles.get_profile(&identity.id).await {
            Ok(profile) => profile,
            Err(err) => {
                let err = CoreError::from(err);
                let message = err.to_string();
                self.commit(epoch, |state| {
                    state.loading = false;
                    state.error = Some(message);
                });
                warn!(
                    "event=session_profile module=session status=error error_code={}",
                    err.code()
                );
                return Err(err);
            }
        };

        match profile {
            Some(profile) if profile.has_family() => {
                let started = self.commit(epoch, |state| {
                    state.phase = refetch_phase(&state.phase, identity.clone(), profile.clone());
                    state.loading = true;
                });
                if !started {
                    return Ok(());
                }
                self.fetch_family(epoch, identity, profile).await
            }
            profile => {
                self.commit(epoch, |state| {
                    state.phase = SessionPhase::NoFamily { identity, profile };
                    state.loading = false;
                });
                Ok(())
            }
        }
    }

    async fn fetch_family(&self, epoch: u64, identity: Identity, profile: Profile) -> CoreResult<()> {
        let family_id = profile.family_id.clone().unwrap_or_default();
        match self.families.get_family(&family_id).await {
            Ok(family) => {
                self.commit(epoch, |state| {
                    state.phase = SessionPhase::WithFamily {
                        identity,
                        profile,
                        family,
                    };
                    state.loading = false;
                    state.error = None;
                });
                Ok(())
            }
            Err(err) => {
                let err = CoreError::from(err);
                let message = err.to_string();
                self.commit(epoch, |state| {
                    state.loading = false;
                    state.error = Some(message);
                });
                warn!(
                    "event=session_load_family module=session status=error error_code={}",
                    err.code()
                );
                Err(err)
            }
        }
    }

    async fn adopt_family(
        &self,
        epoch: u64,
        op: &'static str,
        identity: Identity,
        family: Family,
    ) -> CoreResult<Family> {
        let profile = match self.profiles.get_profile(&identity.id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                return Err(self.fail_action(
                    op,
                    CoreError::CollaboratorFailure("profile not found".to_string()),
                ))
            }
            Err(err) => return Err(self.fail_action(op, err.into())),
        };

        let adopted = family.clone();
        let committed = self.commit(epoch, |state| {
            state.phase = SessionPhase::WithFamily {
                identity,
                profile,
                family: adopted,
            };
            state.loading = false;
            state.error = None;
        });
        if committed {
            info!(
                "event=session_{} module=session status=ok family_id={}",
                op, family.id
            );
        }
        Ok(family)
    }

    fn require_unassigned_identity(&self, op: &'static str) -> CoreResult<Identity> {
        let snapshot = self.state();
        let Some(identity) = snapshot.identity().cloned() else {
            return Err(self.reject(op, CoreError::Unauthenticated));
        };
        if snapshot.has_family() {
            return Err(self.reject(op, CoreError::FamilyAlreadyAssigned));
        }
        Ok(identity)
    }

    /// Applies `update` only while `epoch` is still current.
    fn commit(&self, epoch: u64, update: impl FnOnce(&mut SessionState)) -> bool {
        let committed = self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            update(state);
            true
        });
        if committed {
            debug!(
                "event=session_phase module=session status=ok epoch={} phase={}",
                epoch,
                self.state.borrow().phase.name()
            );
        } else {
            debug!(
                "event=session_phase module=session status=skip epoch={} reason=stale_epoch",
                epoch
            );
        }
        committed
    }

    fn begin_action(&self) {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    fn fail_action(&self, op: &'static str, err: CoreError) -> CoreError {
        let message = err.to_string();
        self.state.send_modify(|state| {
            state.loading = false;
            state.error = Some(message);
        });
        warn!(
            "event=session_{} module=session status=error error_code={}",
            op,
            err.code()
        );
        err
    }

    /// Records a failure detected before any collaborator call.
    fn reject(&self, op: &'static str, err: CoreError) -> CoreError {
        let message = err.to_string();
        self.state.send_modify(|state| state.error = Some(message));
        warn!(
            "event=session_{} module=session status=error error_code={}",
            op,
            err.code()
        );
        err
    }
}

/// Phase shown while the family of `profile` is fetched. A family already
/// loaded under the same id stays in place until the fetch replaces it.
fn refetch_phase(current: &SessionPhase, identity: Identity, profile: Profile) -> SessionPhase {
    match current {
        SessionPhase::WithFamily { family, .. }
            if profile.family_id.as_deref() == Some(family.id.as_str()) =>
        {
            SessionPhase::WithFamily {
                identity,
                profile,
                family: family.clone(),
            }
        }
        _ => SessionPhase::LoadingFamily { identity, profile },
    }
}

fn require_credentials(email: &str, password: &str) -> CoreResult<()> {
    if email.trim().is_empty() {
        return Err(CoreError::invalid_argument("email is required"));
    }
    if password.is_empty() {
        return Err(CoreError::invalid_argument("password is required"));
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
