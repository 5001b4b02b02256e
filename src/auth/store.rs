//! Credential persistence boundary.
//!
//! The host application owns the real store (typically a SQL table); the
//! core only calls through this narrow interface. Every mutating operation
//! is a single atomic read-modify-write with respect to one credential
//! record, so two concurrent failed logins can never both observe the same
//! pre-increment attempt counter. A SQL implementation must perform each
//! mutation as one transaction or one guarded `UPDATE`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::models::Credential;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential not found")]
    NotFound,
    #[error("credential store backend failure: {0}")]
    Backend(String),
}

/// Lookup and atomic-update interface supplied by the host.
#[allow(async_fn_in_trait)]
pub trait CredentialStore: Send + Sync {
    /// Look up a credential by its unique login name.
    async fn find_by_login(&self, login_name: &str) -> Result<Option<Credential>, StoreError>;

    /// Look up a credential by identity.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, StoreError>;

    /// Atomically increment the failed-attempt counter; when it reaches
    /// `threshold`, set the lock expiry to `lock_until` in the same update.
    /// Returns the credential as it stands after the update.
    async fn record_failed_attempt(
        &self,
        id: Uuid,
        threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<Credential, StoreError>;

    /// Atomically reset the failed-attempt counter, clear the lock expiry,
    /// and record the successful login time.
    async fn record_successful_login(&self, id: Uuid, at: DateTime<Utc>)
        -> Result<(), StoreError>;

    /// Store an unconfirmed MFA secret without enabling MFA.
    async fn set_pending_mfa_secret(&self, id: Uuid, secret: &str) -> Result<(), StoreError>;

    /// Flip the MFA-enabled flag after a successful verification against the
    /// pending secret.
    async fn activate_mfa(&self, id: Uuid) -> Result<(), StoreError>;

    /// Replace the password hash and stamp the change time.
    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

impl<S: CredentialStore> CredentialStore for Arc<S> {
    async fn find_by_login(&self, login_name: &str) -> Result<Option<Credential>, StoreError> {
        (**self).find_by_login(login_name).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn record_failed_attempt(
        &self,
        id: Uuid,
        threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<Credential, StoreError> {
        (**self).record_failed_attempt(id, threshold, lock_until).await
    }

    async fn record_successful_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        (**self).record_successful_login(id, at).await
    }

    async fn set_pending_mfa_secret(&self, id: Uuid, secret: &str) -> Result<(), StoreError> {
        (**self).set_pending_mfa_secret(id, secret).await
    }

    async fn activate_mfa(&self, id: Uuid) -> Result<(), StoreError> {
        (**self).activate_mfa(id).await
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        (**self).set_password_hash(id, password_hash, changed_at).await
    }
}

/// Mutex-guarded in-memory store. The default collaborator for tests and
/// single-node deployments; every trait operation holds the lock for its
/// whole read-modify-write.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    inner: Mutex<HashMap<Uuid, Credential>>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a credential.
    pub async fn insert(&self, credential: Credential) {
        self.inner.lock().await.insert(credential.id, credential);
    }

    /// Apply an arbitrary mutation under the store lock. Useful for host
    /// administration flows (deactivation, role changes) and tests.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id.
    pub async fn modify(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut Credential),
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let credential = inner.get_mut(&id).ok_or(StoreError::NotFound)?;
        apply(credential);
        Ok(())
    }
}

impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_login(&self, login_name: &str) -> Result<Option<Credential>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .values()
            .find(|credential| credential.login_name == login_name)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, StoreError> {
        Ok(self.inner.lock().await.get(&id).cloned())
    }

    async fn record_failed_attempt(
        &self,
        id: Uuid,
        threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<Credential, StoreError> {
        let mut inner = self.inner.lock().await;
        let credential = inner.get_mut(&id).ok_or(StoreError::NotFound)?;
        credential.failed_login_attempts += 1;
        if credential.failed_login_attempts >= threshold {
            credential.locked_until = Some(lock_until);
        }
        Ok(credential.clone())
    }

    async fn record_successful_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let credential = inner.get_mut(&id).ok_or(StoreError::NotFound)?;
        credential.failed_login_attempts = 0;
        credential.locked_until = None;
        credential.last_login = Some(at);
        Ok(())
    }

    async fn set_pending_mfa_secret(&self, id: Uuid, secret: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let credential = inner.get_mut(&id).ok_or(StoreError::NotFound)?;
        credential.mfa_secret = Some(secret.to_string());
        Ok(())
    }

    async fn activate_mfa(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let credential = inner.get_mut(&id).ok_or(StoreError::NotFound)?;
        if credential.mfa_secret.is_none() {
            return Err(StoreError::Backend(
                "cannot activate mfa without a stored secret".to_string(),
            ));
        }
        credential.mfa_enabled = true;
        Ok(())
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let credential = inner.get_mut(&id).ok_or(StoreError::NotFound)?;
        credential.password_hash = password_hash.to_string();
        credential.password_changed_at = changed_at;
        Ok(())
    }
}
