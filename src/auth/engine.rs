//! Login state machine: credential check, lockout accounting, MFA gate,
//! token issuance, and audit emission.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::audit::{AuditAction, AuditEvent, AuditLog};
use crate::auth::guard;
use crate::auth::models::{Credential, Role};
use crate::auth::store::CredentialStore;
use crate::auth::AuthError;
use crate::config::SecurityPolicy;
use crate::crypto::PasswordHasher;
use crate::mfa::MfaProvider;
use crate::token::{SessionClaims, TokenKind, TokenService};

const AUTH_RESOURCE: &str = "authentication";

/// Access and refresh token issued for one full session.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Outcome of a successful credential check.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Password verified, MFA not enabled: full session granted.
    Granted(TokenPair),
    /// Password verified, MFA enabled: the caller must present a TOTP code
    /// bound to this pending token before a session is granted.
    MfaRequired { pending_token: String },
}

/// Material handed to the user when MFA enrollment begins.
#[derive(Debug, Clone)]
pub struct MfaEnrollment {
    /// Base32 secret for manual entry.
    pub secret: String,
    /// `otpauth://` payload for QR rendering by the caller.
    pub provisioning_uri: String,
}

/// Orchestrates authentication against the credential store.
///
/// Construct one per process with its collaborators injected; the engine
/// holds no global state and is safe to share behind an `Arc`.
pub struct AuthenticationEngine<S> {
    store: S,
    passwords: PasswordHasher,
    mfa: MfaProvider,
    tokens: TokenService,
    audit: Arc<AuditLog>,
    policy: SecurityPolicy,
}

impl<S: CredentialStore> AuthenticationEngine<S> {
    pub fn new(
        store: S,
        passwords: PasswordHasher,
        mfa: MfaProvider,
        tokens: TokenService,
        audit: Arc<AuditLog>,
        policy: SecurityPolicy,
    ) -> Self {
        Self {
            store,
            passwords,
            mfa,
            tokens,
            audit,
            policy,
        }
    }

    /// Authenticate a login name and password.
    ///
    /// Unknown user, locked account, inactive account, and wrong password
    /// all surface as [`AuthError::InvalidCredentials`]; the audit trail
    /// records the precise reason. A wrong password increments the
    /// failed-attempt counter atomically and locks the account for the
    /// configured duration once the threshold is reached.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] on any rejection, or a store error.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        login_name: &str,
        password: &str,
        origin: Option<IpAddr>,
    ) -> Result<LoginOutcome, AuthError> {
        let Some(credential) = self.store.find_by_login(login_name).await? else {
            self.audit_login_failure(login_name, origin, "unknown login name", None)
                .await;
            return Err(AuthError::InvalidCredentials);
        };

        let now = Utc::now();
        if credential.is_locked(now) {
            // Independent of password correctness while the lock holds.
            self.audit_login_failure(login_name, origin, "account locked", Some(credential.id))
                .await;
            return Err(AuthError::InvalidCredentials);
        }
        if !credential.active {
            self.audit_login_failure(
                login_name,
                origin,
                "account deactivated",
                Some(credential.id),
            )
            .await;
            return Err(AuthError::InvalidCredentials);
        }

        if !self.passwords.verify(password, &credential.password_hash) {
            let updated = self
                .store
                .record_failed_attempt(
                    credential.id,
                    self.policy.max_login_attempts,
                    now + self.policy.lockout_duration,
                )
                .await?;
            self.audit
                .record(
                    &AuditEvent::new(AuditAction::LoginFailed)
                        .resource(AUTH_RESOURCE, login_name)
                        .actor(credential.id)
                        .origin(origin)
                        .failure("wrong password")
                        .extra(json!({
                            "failed_attempts": updated.failed_login_attempts,
                            "locked": updated.locked_until.is_some(),
                        })),
                )
                .await;
            return Err(AuthError::InvalidCredentials);
        }

        self.store
            .record_successful_login(credential.id, now)
            .await?;

        if credential.mfa_enabled {
            // Login step completed, session not yet granted: the pending
            // token carries only the subject and the pending kind.
            let pending_token = self.tokens.issue_mfa_pending(credential.id)?;
            self.audit
                .record(
                    &AuditEvent::new(AuditAction::Login)
                        .resource(AUTH_RESOURCE, login_name)
                        .actor(credential.id)
                        .origin(origin)
                        .extra(json!({ "mfa_required": true })),
                )
                .await;
            debug!("password verified, awaiting second factor");
            return Ok(LoginOutcome::MfaRequired { pending_token });
        }

        let pair = self.issue_pair(credential.id)?;
        self.audit
            .record(
                &AuditEvent::new(AuditAction::Login)
                    .resource(AUTH_RESOURCE, login_name)
                    .actor(credential.id)
                    .origin(origin),
            )
            .await;
        Ok(LoginOutcome::Granted(pair))
    }

    /// Exchange an MFA-pending token plus a valid TOTP code for a full
    /// session.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`] unless handed a live pending token,
    /// [`AuthError::InvalidMfaCode`] on a code outside the accepted window.
    #[instrument(skip_all)]
    pub async fn complete_mfa(
        &self,
        pending_token: &str,
        code: &str,
        origin: Option<IpAddr>,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.tokens.verify(pending_token)?;
        if claims.kind != TokenKind::MfaPending {
            return Err(AuthError::InvalidToken);
        }

        let credential = self
            .store
            .find_by_id(claims.subject)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !credential.active {
            return Err(AuthError::InvalidCredentials);
        }
        if !credential.mfa_enabled {
            return Err(AuthError::MfaNotConfigured);
        }
        let secret = credential
            .mfa_secret
            .as_deref()
            .ok_or(AuthError::MfaNotConfigured)?;

        if !self.mfa.verify(secret, code, self.policy.totp_window)? {
            self.audit
                .record(
                    &AuditEvent::new(AuditAction::LoginFailed)
                        .resource(AUTH_RESOURCE, &credential.login_name)
                        .actor(credential.id)
                        .origin(origin)
                        .failure("invalid mfa code"),
                )
                .await;
            return Err(AuthError::InvalidMfaCode);
        }

        let pair = self.issue_pair(credential.id)?;
        self.audit
            .record(
                &AuditEvent::new(AuditAction::Login)
                    .resource(AUTH_RESOURCE, &credential.login_name)
                    .actor(credential.id)
                    .origin(origin)
                    .extra(json!({ "mfa_verified": true })),
            )
            .await;
        Ok(pair)
    }

    /// Verify any session token and return its claims.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`] if expired, malformed, or mis-signed.
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, AuthError> {
        Ok(self.tokens.verify(token)?)
    }

    /// Resolve verified claims to the live credential behind them.
    ///
    /// Requires a full access token; an MFA-pending or refresh token is
    /// rejected here, which is what keeps a partially-authenticated caller
    /// away from protected resources.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`] for the wrong token kind,
    /// [`AuthError::InvalidCredentials`] if the subject is gone or inactive.
    pub async fn current_credential(
        &self,
        claims: &SessionClaims,
    ) -> Result<Credential, AuthError> {
        if claims.kind != TokenKind::Access {
            return Err(AuthError::InvalidToken);
        }
        let credential = self
            .store
            .find_by_id(claims.subject)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !credential.active {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(credential)
    }

    /// Whether the caller behind `claims` may perform an action requiring
    /// `required`.
    ///
    /// # Errors
    ///
    /// Propagates the resolution errors of [`Self::current_credential`].
    pub async fn authorize(
        &self,
        claims: &SessionClaims,
        required: Role,
    ) -> Result<bool, AuthError> {
        let credential = self.current_credential(claims).await?;
        Ok(guard::authorize(&credential, required))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidToken`] unless handed a live refresh token whose
    /// subject still exists and is active.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.tokens.verify(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::InvalidToken);
        }
        let credential = self
            .store
            .find_by_id(claims.subject)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !credential.active {
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.tokens.issue_access(credential.id)?;
        self.audit
            .record(
                &AuditEvent::new(AuditAction::TokenRefreshed)
                    .resource(AUTH_RESOURCE, &credential.login_name)
                    .actor(credential.id),
            )
            .await;
        Ok(access_token)
    }

    /// Begin MFA enrollment: generate a secret, store it unconfirmed, and
    /// return it with its provisioning URI.
    ///
    /// The pending secret grants no authentication capability until
    /// [`Self::confirm_mfa_enrollment`] succeeds.
    ///
    /// # Errors
    ///
    /// [`AuthError::MfaAlreadyEnabled`] if MFA is already active.
    #[instrument(skip(self))]
    pub async fn begin_mfa_enrollment(&self, subject: Uuid) -> Result<MfaEnrollment, AuthError> {
        let credential = self
            .store
            .find_by_id(subject)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !credential.active {
            return Err(AuthError::InvalidCredentials);
        }
        if credential.mfa_enabled {
            return Err(AuthError::MfaAlreadyEnabled);
        }

        let secret = self.mfa.generate_secret()?;
        self.store
            .set_pending_mfa_secret(credential.id, &secret)
            .await?;
        let provisioning_uri = self.mfa.provisioning_uri(&credential.login_name, &secret)?;
        Ok(MfaEnrollment {
            secret,
            provisioning_uri,
        })
    }

    /// Confirm enrollment by verifying a code against the pending secret;
    /// only then does MFA become enabled.
    ///
    /// # Errors
    ///
    /// [`AuthError::MfaNotConfigured`] without a pending secret,
    /// [`AuthError::InvalidMfaCode`] on a bad code.
    #[instrument(skip(self, code))]
    pub async fn confirm_mfa_enrollment(
        &self,
        subject: Uuid,
        code: &str,
        origin: Option<IpAddr>,
    ) -> Result<(), AuthError> {
        let credential = self
            .store
            .find_by_id(subject)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !credential.active {
            return Err(AuthError::InvalidCredentials);
        }
        if credential.mfa_enabled {
            return Err(AuthError::MfaAlreadyEnabled);
        }
        let secret = credential
            .mfa_secret
            .as_deref()
            .ok_or(AuthError::MfaNotConfigured)?;

        if !self.mfa.verify(secret, code, self.policy.totp_window)? {
            return Err(AuthError::InvalidMfaCode);
        }

        self.store.activate_mfa(credential.id).await?;
        self.audit
            .record(
                &AuditEvent::new(AuditAction::MfaEnabled)
                    .resource(AUTH_RESOURCE, &credential.login_name)
                    .actor(credential.id)
                    .origin(origin),
            )
            .await;
        Ok(())
    }

    /// Change the subject's password after verifying the old one.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] if the old password does not
    /// verify.
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        subject: Uuid,
        old_password: &str,
        new_password: &str,
        origin: Option<IpAddr>,
    ) -> Result<(), AuthError> {
        let credential = self
            .store
            .find_by_id(subject)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !credential.active {
            return Err(AuthError::InvalidCredentials);
        }

        if !self.passwords.verify(old_password, &credential.password_hash) {
            self.audit
                .record(
                    &AuditEvent::new(AuditAction::PasswordChanged)
                        .resource(AUTH_RESOURCE, &credential.login_name)
                        .actor(credential.id)
                        .origin(origin)
                        .failure("old password mismatch"),
                )
                .await;
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = self.passwords.hash(new_password)?;
        self.store
            .set_password_hash(credential.id, &new_hash, Utc::now())
            .await?;
        self.audit
            .record(
                &AuditEvent::new(AuditAction::PasswordChanged)
                    .resource(AUTH_RESOURCE, &credential.login_name)
                    .actor(credential.id)
                    .origin(origin),
            )
            .await;
        Ok(())
    }

    fn issue_pair(&self, subject: Uuid) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.tokens.issue_access(subject)?,
            refresh_token: self.tokens.issue_refresh(subject)?,
        })
    }

    async fn audit_login_failure(
        &self,
        login_name: &str,
        origin: Option<IpAddr>,
        reason: &str,
        actor: Option<Uuid>,
    ) {
        let mut event = AuditEvent::new(AuditAction::LoginFailed)
            .resource(AUTH_RESOURCE, login_name)
            .origin(origin)
            .failure(reason);
        if let Some(actor) = actor {
            event = event.actor(actor);
        }
        self.audit.record(&event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::InMemoryCredentialStore;
    use crate::crypto::KeyMaterial;
    use chrono::Duration;
    use pasetors::keys::{AsymmetricKeyPair, Generate};
    use pasetors::version4::V4;

    struct Harness {
        engine: AuthenticationEngine<Arc<InMemoryCredentialStore>>,
        store: Arc<InMemoryCredentialStore>,
        _dir: tempfile::TempDir,
    }

    async fn harness() -> Harness {
        let pair = AsymmetricKeyPair::<V4>::generate().unwrap();
        let keys = KeyMaterial::from_bytes(
            vec![1u8; 32],
            vec![2u8; 32],
            pair.secret.as_bytes().to_vec(),
        )
        .unwrap();
        let policy = SecurityPolicy::default();
        let tokens = TokenService::new(&keys, "custodia", &policy).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let audit = Arc::new(AuditLog::open(dir.path().join("audit.log")).await.unwrap());
        let store = Arc::new(InMemoryCredentialStore::new());
        let engine = AuthenticationEngine::new(
            store.clone(),
            PasswordHasher,
            MfaProvider::new("Custodia Test"),
            tokens,
            audit,
            policy,
        );
        Harness {
            engine,
            store,
            _dir: dir,
        }
    }

    async fn add_user(harness: &Harness, password: &str) -> Credential {
        let hash = PasswordHasher.hash(password).unwrap();
        let credential = Credential::new(
            "m.muster",
            "m.muster@example.org",
            "Max Muster",
            hash,
            Role::Practitioner,
        );
        harness.store.insert(credential.clone()).await;
        credential
    }

    #[tokio::test]
    async fn unknown_user_fails_uniformly() {
        let harness = harness().await;
        let err = harness
            .engine
            .authenticate("nobody", "whatever", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn wrong_password_counts_towards_lockout() {
        let harness = harness().await;
        let credential = add_user(&harness, "correct-passphrase").await;

        for _ in 0..4 {
            let err = harness
                .engine
                .authenticate("m.muster", "wrong", None)
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
        let before = harness.store.find_by_id(credential.id).await.unwrap().unwrap();
        assert_eq!(before.failed_login_attempts, 4);
        assert!(before.locked_until.is_none());

        // Fifth failure trips the lock.
        harness
            .engine
            .authenticate("m.muster", "wrong", None)
            .await
            .unwrap_err();
        let locked = harness.store.find_by_id(credential.id).await.unwrap().unwrap();
        assert_eq!(locked.failed_login_attempts, 5);
        assert!(locked.locked_until.is_some());

        // Correct password is still rejected while the lock holds.
        let err = harness
            .engine
            .authenticate("m.muster", "correct-passphrase", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn lock_expiry_unlocks_implicitly_and_resets_counter() {
        let harness = harness().await;
        let credential = add_user(&harness, "correct-passphrase").await;

        for _ in 0..5 {
            harness
                .engine
                .authenticate("m.muster", "wrong", None)
                .await
                .unwrap_err();
        }
        // Rewind the lock expiry instead of waiting out the lockout.
        harness
            .store
            .modify(credential.id, |c| {
                c.locked_until = Some(Utc::now() - Duration::seconds(1));
            })
            .await
            .unwrap();

        let outcome = harness
            .engine
            .authenticate("m.muster", "correct-passphrase", None)
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::Granted(_)));

        let after = harness.store.find_by_id(credential.id).await.unwrap().unwrap();
        assert_eq!(after.failed_login_attempts, 0);
        assert!(after.locked_until.is_none());
        assert!(after.last_login.is_some());
    }

    #[tokio::test]
    async fn inactive_account_is_rejected() {
        let harness = harness().await;
        let credential = add_user(&harness, "correct-passphrase").await;
        harness
            .store
            .modify(credential.id, |c| c.active = false)
            .await
            .unwrap();

        let err = harness
            .engine
            .authenticate("m.muster", "correct-passphrase", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn granted_session_verifies_and_authorizes() {
        let harness = harness().await;
        add_user(&harness, "correct-passphrase").await;

        let LoginOutcome::Granted(pair) = harness
            .engine
            .authenticate("m.muster", "correct-passphrase", None)
            .await
            .unwrap()
        else {
            panic!("expected a full session");
        };

        let claims = harness.engine.verify_token(&pair.access_token).unwrap();
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(harness.engine.authorize(&claims, Role::Assistant).await.unwrap());
        assert!(!harness
            .engine
            .authorize(&claims, Role::Administrator)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn unconfirmed_mfa_secret_grants_nothing() {
        let harness = harness().await;
        let credential = add_user(&harness, "correct-passphrase").await;

        let enrollment = harness
            .engine
            .begin_mfa_enrollment(credential.id)
            .await
            .unwrap();
        assert!(enrollment.provisioning_uri.starts_with("otpauth://totp/"));

        // Secret stored but unconfirmed: login stays a single-factor grant.
        let outcome = harness
            .engine
            .authenticate("m.muster", "correct-passphrase", None)
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::Granted(_)));

        let stored = harness.store.find_by_id(credential.id).await.unwrap().unwrap();
        assert!(!stored.mfa_enabled);
        assert!(stored.mfa_secret.is_some());
    }

    #[tokio::test]
    async fn deactivated_account_cannot_confirm_mfa_enrollment() {
        let harness = harness().await;
        let credential = add_user(&harness, "correct-passphrase").await;

        let enrollment = harness
            .engine
            .begin_mfa_enrollment(credential.id)
            .await
            .unwrap();
        harness
            .store
            .modify(credential.id, |c| c.active = false)
            .await
            .unwrap();

        let now = u64::try_from(Utc::now().timestamp()).unwrap();
        let code = harness
            .engine
            .mfa
            .code_at(&enrollment.secret, now)
            .unwrap();
        let err = harness
            .engine
            .confirm_mfa_enrollment(credential.id, &code, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let stored = harness.store.find_by_id(credential.id).await.unwrap().unwrap();
        assert!(!stored.mfa_enabled);
    }

    #[tokio::test]
    async fn confirmed_mfa_gates_login_until_code_is_presented() {
        let harness = harness().await;
        let credential = add_user(&harness, "correct-passphrase").await;

        let enrollment = harness
            .engine
            .begin_mfa_enrollment(credential.id)
            .await
            .unwrap();
        let now = u64::try_from(Utc::now().timestamp()).unwrap();
        let code = harness
            .engine
            .mfa
            .code_at(&enrollment.secret, now)
            .unwrap();
        harness
            .engine
            .confirm_mfa_enrollment(credential.id, &code, None)
            .await
            .unwrap();

        let LoginOutcome::MfaRequired { pending_token } = harness
            .engine
            .authenticate("m.muster", "correct-passphrase", None)
            .await
            .unwrap()
        else {
            panic!("expected the MFA gate");
        };

        // The pending token is not a session.
        let pending_claims = harness.engine.verify_token(&pending_token).unwrap();
        assert_eq!(pending_claims.kind, TokenKind::MfaPending);
        assert!(matches!(
            harness.engine.current_credential(&pending_claims).await,
            Err(AuthError::InvalidToken)
        ));

        // A wrong code is rejected, the right one completes the login. Pick
        // the wrong code outside the currently accepted window to dodge a
        // chance collision.
        let now = u64::try_from(Utc::now().timestamp()).unwrap();
        let accepted: Vec<String> = [now - 30, now, now + 30]
            .iter()
            .map(|t| harness.engine.mfa.code_at(&enrollment.secret, *t).unwrap())
            .collect();
        let wrong = ["000000", "111111", "222222", "333333"]
            .iter()
            .find(|c| !accepted.contains(&(*c).to_string()))
            .unwrap();
        assert!(matches!(
            harness.engine.complete_mfa(&pending_token, wrong, None).await,
            Err(AuthError::InvalidMfaCode)
        ));
        let now = u64::try_from(Utc::now().timestamp()).unwrap();
        let code = harness
            .engine
            .mfa
            .code_at(&enrollment.secret, now)
            .unwrap();
        let pair = harness
            .engine
            .complete_mfa(&pending_token, &code, None)
            .await
            .unwrap();
        let claims = harness.engine.verify_token(&pair.access_token).unwrap();
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[tokio::test]
    async fn access_token_cannot_complete_mfa() {
        let harness = harness().await;
        add_user(&harness, "correct-passphrase").await;
        let LoginOutcome::Granted(pair) = harness
            .engine
            .authenticate("m.muster", "correct-passphrase", None)
            .await
            .unwrap()
        else {
            panic!("expected a full session");
        };
        assert!(matches!(
            harness.engine.complete_mfa(&pair.access_token, "123456", None).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn refresh_exchanges_for_a_new_access_token() {
        let harness = harness().await;
        add_user(&harness, "correct-passphrase").await;
        let LoginOutcome::Granted(pair) = harness
            .engine
            .authenticate("m.muster", "correct-passphrase", None)
            .await
            .unwrap()
        else {
            panic!("expected a full session");
        };

        let access = harness
            .engine
            .refresh_session(&pair.refresh_token)
            .await
            .unwrap();
        let claims = harness.engine.verify_token(&access).unwrap();
        assert_eq!(claims.kind, TokenKind::Access);

        // An access token is not exchangeable.
        assert!(matches!(
            harness.engine.refresh_session(&pair.access_token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn change_password_requires_the_old_one() {
        let harness = harness().await;
        let credential = add_user(&harness, "old-passphrase").await;

        let err = harness
            .engine
            .change_password(credential.id, "not the old one", "new-passphrase", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        harness
            .engine
            .change_password(credential.id, "old-passphrase", "new-passphrase", None)
            .await
            .unwrap();
        let outcome = harness
            .engine
            .authenticate("m.muster", "new-passphrase", None)
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::Granted(_)));
    }
}
