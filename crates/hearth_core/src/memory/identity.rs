use crate::memory::{generate_id, lock, FailurePlan, MemoryDirectory, MemoryOp};
use crate::model::identity::{Identity, Profile, Role};
use crate::remote::{IdentityCallback, IdentityProvider, RemoteError, RemoteResult, Subscription};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct Account {
    identity: Identity,
    /// `None` for accounts created through Google sign-in.
    password: Option<String>,
}

#[derive(Default)]
struct Inner {
    /// Keyed by lowercase email.
    accounts: HashMap<String, Account>,
    /// Google id token -> (email, display name).
    google_tokens: HashMap<String, (String, String)>,
    current: Option<Identity>,
    listeners: HashMap<u64, IdentityCallback>,
    next_listener: u64,
}

/// Email/password and Google sign-in held in memory.
///
/// Sign-up and first Google sign-in also write the profile document into
/// the shared [`MemoryDirectory`].
pub struct MemoryIdentityProvider {
    directory: Arc<MemoryDirectory>,
    inner: Arc<Mutex<Inner>>,
    failures: FailurePlan,
}

impl MemoryIdentityProvider {
    pub fn new(directory: Arc<MemoryDirectory>) -> Self {
        Self {
            directory,
            inner: Arc::new(Mutex::new(Inner::default())),
            failures: FailurePlan::default(),
        }
    }

    pub fn fail_next(&self, op: MemoryOp, message: impl Into<String>) {
        self.failures.arm(op, message);
    }

    /// Accepts `id_token` as a Google credential for `email`.
    pub fn register_google_token(&self, id_token: &str, email: &str, name: &str) {
        lock(&self.inner).google_tokens.insert(
            id_token.to_string(),
            (email.trim().to_ascii_lowercase(), name.to_string()),
        );
    }

    pub fn current(&self) -> Option<Identity> {
        lock(&self.inner).current.clone()
    }

    fn register(&self, email: &str, password: Option<&str>, name: &str) -> Identity {
        let identity = Identity::new(generate_id(), email);
        lock(&self.inner).accounts.insert(
            email.to_string(),
            Account {
                identity: identity.clone(),
                password: password.map(str::to_string),
            },
        );
        self.directory.put_profile(Profile {
            id: identity.id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            family_id: None,
            role: Role::Member,
        });
        identity
    }

    fn set_current(&self, identity: Option<Identity>) {
        let listeners: Vec<IdentityCallback> = {
            let mut inner = lock(&self.inner);
            inner.current = identity.clone();
            inner.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener(identity.clone());
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    fn on_identity_change(&self, callback: IdentityCallback) -> Subscription {
        let (id, current) = {
            let mut inner = lock(&self.inner);
            let id = inner.next_listener;
            inner.next_listener += 1;
            inner.listeners.insert(id, callback.clone());
            (id, inner.current.clone())
        };
        callback(current);

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                lock(&inner).listeners.remove(&id);
            }
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> RemoteResult<()> {
        self.failures.check(MemoryOp::SignIn)?;
        let email = email.trim().to_ascii_lowercase();
        let identity = {
            let inner = lock(&self.inner);
            match inner.accounts.get(&email) {
                Some(account) if account.password.as_deref() == Some(password) => {
                    account.identity.clone()
                }
                _ => return Err(RemoteError::new("invalid email or password")),
            }
        };
        self.set_current(Some(identity));
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str, name: &str) -> RemoteResult<()> {
        self.failures.check(MemoryOp::SignUp)?;
        let email = email.trim().to_ascii_lowercase();
        if password.len() < 6 {
            return Err(RemoteError::new("password must be at least 6 characters"));
        }
        if lock(&self.inner).accounts.contains_key(&email) {
            return Err(RemoteError::new("email already in use"));
        }
        let identity = self.register(&email, Some(password), name);
        self.set_current(Some(identity));
        Ok(())
    }

    async fn sign_in_with_google(&self, id_token: &str) -> RemoteResult<()> {
        self.failures.check(MemoryOp::SignInWithGoogle)?;
        let (email, name) = lock(&self.inner)
            .google_tokens
            .get(id_token)
            .cloned()
            .ok_or_else(|| RemoteError::new("google sign-in was rejected"))?;

        let existing = lock(&self.inner)
            .accounts
            .get(&email)
            .map(|account| account.identity.clone());
        let identity = match existing {
            Some(identity) => identity,
            None => self.register(&email, None, &name),
        };
        self.set_current(Some(identity));
        Ok(())
    }

    async fn sign_out(&self) -> RemoteResult<()> {
        self.failures.check(MemoryOp::SignOut)?;
        self.set_current(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryIdentityProvider;
    use crate::memory::MemoryDirectory;
    use crate::model::identity::Identity;
    use crate::remote::{IdentityCallback, IdentityProvider};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn notifier_fires_on_attach_and_every_change() {
        let directory = Arc::new(MemoryDirectory::new());
        let provider = MemoryIdentityProvider::new(directory.clone());
        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: IdentityCallback = Arc::new(move |identity: Option<Identity>| {
            sink.lock()
                .expect("sink lock")
                .push(identity.map(|identity| identity.email));
        });
        let _handle = provider.on_identity_change(callback);

        provider
            .sign_up("Ada@Example.com", "secret1", "Ada")
            .await
            .expect("sign up should succeed");
        provider.sign_out().await.expect("sign out should succeed");
        provider
            .sign_in("ada@example.com", "wrong")
            .await
            .expect_err("wrong password must fail");

        let seen = seen.lock().expect("seen lock");
        assert_eq!(
            seen.as_slice(),
            &[None, Some("ada@example.com".to_string()), None]
        );
        let identity_id = provider.current().map(|identity| identity.id);
        assert!(identity_id.is_none());
    }

    #[tokio::test]
    async fn google_sign_in_creates_profile_once() {
        let directory = Arc::new(MemoryDirectory::new());
        let provider = MemoryIdentityProvider::new(directory.clone());
        provider.register_google_token("token-1", "bea@example.com", "Bea");

        provider
            .sign_in_with_google("token-1")
            .await
            .expect("google sign-in should succeed");
        let first = provider.current().expect("identity should be set");
        provider.sign_out().await.expect("sign out should succeed");
        provider
            .sign_in_with_google("token-1")
            .await
            .expect("second google sign-in should succeed");

        assert_eq!(provider.current().map(|identity| identity.id), Some(first.id.clone()));
        assert_eq!(
            directory.profile(&first.id).map(|profile| profile.name),
            Some("Bea".to_string())
        );
        assert!(provider.sign_in_with_google("unknown").await.is_err());
    }
}
