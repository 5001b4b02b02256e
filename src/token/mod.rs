//! Signed, time-bounded session tokens (PASETO v4.public).
//!
//! Tokens are stateless: verification reconstructs the claims from the token
//! alone, and natural expiry is the only built-in invalidation. The token
//! kind is a tagged claim so an MFA-pending token can never be accepted where
//! a full session is required.

use chrono::{DateTime, SecondsFormat, Utc};
use pasetors::errors::Error as PasetorsError;
use pasetors::keys::{AsymmetricPublicKey, AsymmetricSecretKey};
use pasetors::token::UntrustedToken;
use pasetors::version4::{PublicToken, V4};
use pasetors::Public;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{ConfigError, SecurityPolicy};
use crate::crypto::KeyMaterial;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("token issued in the future")]
    InvalidIssuedAt,
    #[error("unexpected token kind")]
    WrongKind,
    #[error("token signing failed")]
    Signing,
}

/// Discriminates what a verified token grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Full session, short-lived.
    Access,
    /// Long-lived bearer credential exchangeable for a new access token.
    Refresh,
    /// Password verified, second factor still outstanding. Grants nothing
    /// but the right to present a TOTP code.
    MfaPending,
}

/// Claims reconstructed from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub subject: Uuid,
    pub kind: TokenKind,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    iss: String,
    sub: String,
    iat: String,
    exp: String,
    kind: TokenKind,
}

/// Issues and verifies session tokens under a server-held Ed25519 key.
pub struct TokenService {
    secret: AsymmetricSecretKey<V4>,
    public: AsymmetricPublicKey<V4>,
    issuer: String,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
    mfa_pending_ttl: chrono::Duration,
}

impl TokenService {
    /// Build the service from provisioned key material.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKey`] if the signing key is not a valid
    /// Ed25519 secret key.
    pub fn new(
        keys: &KeyMaterial,
        issuer: impl Into<String>,
        policy: &SecurityPolicy,
    ) -> Result<Self, ConfigError> {
        let raw = keys.signing_key();
        let secret =
            AsymmetricSecretKey::<V4>::from(raw).map_err(|_| ConfigError::InvalidKey {
                name: "signing key",
                reason: "not a valid Ed25519 secret key".to_string(),
            })?;
        let public =
            AsymmetricPublicKey::<V4>::from(&raw[32..]).map_err(|_| ConfigError::InvalidKey {
                name: "signing key",
                reason: "embedded public key is invalid".to_string(),
            })?;
        Ok(Self {
            secret,
            public,
            issuer: issuer.into(),
            access_ttl: policy.access_token_ttl,
            refresh_ttl: policy.refresh_token_ttl,
            mfa_pending_ttl: policy.mfa_pending_ttl,
        })
    }

    /// Issue a full access token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if signing fails.
    pub fn issue_access(&self, subject: Uuid) -> Result<String, TokenError> {
        self.issue(subject, TokenKind::Access, self.access_ttl)
    }

    /// Issue a refresh token. Materially longer-lived than an access token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if signing fails.
    pub fn issue_refresh(&self, subject: Uuid) -> Result<String, TokenError> {
        self.issue(subject, TokenKind::Refresh, self.refresh_ttl)
    }

    /// Issue the short-lived token handed out between password verification
    /// and MFA completion.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if signing fails.
    pub fn issue_mfa_pending(&self, subject: Uuid) -> Result<String, TokenError> {
        self.issue(subject, TokenKind::MfaPending, self.mfa_pending_ttl)
    }

    /// Issue a token with an explicit expiry instant. Useful for tests and
    /// for hosts with non-standard session windows.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if signing fails.
    pub fn issue_expiring_at(
        &self,
        subject: Uuid,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(subject, kind, Utc::now(), expires_at)
    }

    /// Verify a token against the wall clock and return its claims.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] if the signature does not verify, the token
    /// is structurally malformed, or the expiry has passed.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token at an explicit instant.
    ///
    /// # Errors
    ///
    /// Same as [`Self::verify`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let untrusted =
            UntrustedToken::<Public, V4>::try_from(token).map_err(|err| map_paseto_error(&err))?;
        let trusted = PublicToken::verify(&self.public, &untrusted, None, None)
            .map_err(|err| map_paseto_error(&err))?;
        let wire: WireClaims =
            serde_json::from_str(trusted.payload()).map_err(|_| TokenError::Malformed)?;

        if wire.iss != self.issuer {
            return Err(TokenError::InvalidIssuer);
        }
        let subject = Uuid::parse_str(&wire.sub).map_err(|_| TokenError::Malformed)?;
        let issued_at = parse_rfc3339(&wire.iat)?;
        let expires_at = parse_rfc3339(&wire.exp)?;
        if issued_at > now {
            return Err(TokenError::InvalidIssuedAt);
        }
        if expires_at <= now {
            return Err(TokenError::Expired);
        }

        Ok(SessionClaims {
            subject,
            kind: wire.kind,
            issued_at,
            expires_at,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::WrongKind`] when handed anything but a refresh
    /// token, and the usual verification errors otherwise.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, TokenError> {
        let claims = self.verify(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(TokenError::WrongKind);
        }
        self.issue_access(claims.subject)
    }

    fn issue(
        &self,
        subject: Uuid,
        kind: TokenKind,
        ttl: chrono::Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        self.sign(subject, kind, now, now + ttl)
    }

    fn sign(
        &self,
        subject: Uuid,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let wire = WireClaims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            iat: format_rfc3339(issued_at),
            exp: format_rfc3339(expires_at),
            kind,
        };
        let payload = serde_json::to_vec(&wire).map_err(|_| TokenError::Signing)?;
        PublicToken::sign(&self.secret, &payload, None, None).map_err(|_| TokenError::Signing)
    }
}

fn format_rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, TokenError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TokenError::Malformed)
}

fn map_paseto_error(err: &PasetorsError) -> TokenError {
    match err {
        PasetorsError::TokenValidation => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pasetors::keys::{AsymmetricKeyPair, Generate};

    fn service() -> TokenService {
        let pair = AsymmetricKeyPair::<V4>::generate().unwrap();
        let keys = KeyMaterial::from_bytes(
            vec![1u8; 32],
            vec![2u8; 32],
            pair.secret.as_bytes().to_vec(),
        )
        .unwrap();
        TokenService::new(&keys, "custodia", &SecurityPolicy::default()).unwrap()
    }

    #[test]
    fn issues_and_verifies_access_token() {
        let service = service();
        let subject = Uuid::new_v4();
        let token = service.issue_access(subject).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.subject, subject);
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.expires_at > claims.issued_at);
    }

    #[test]
    fn token_expires_after_its_ttl() {
        let service = service();
        let subject = Uuid::new_v4();
        let token = service.issue_access(subject).unwrap();

        // 30-minute TTL: valid now, dead 31 minutes later.
        assert!(service.verify(&token).is_ok());
        let later = Utc::now() + Duration::minutes(31);
        assert!(matches!(
            service.verify_at(&token, later),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = service();
        let token = service
            .issue_expiring_at(
                Uuid::new_v4(),
                TokenKind::Access,
                Utc::now() - Duration::seconds(1),
            )
            .unwrap();
        assert!(matches!(service.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn tampered_token_fails_signature_check() {
        let service = service();
        let token = service.issue_access(Uuid::new_v4()).unwrap();
        let mut tampered = token.clone();
        // Flip a character in the body.
        let idx = token.len() / 2;
        let original = tampered.remove(idx);
        let replacement = if original == 'A' { 'B' } else { 'A' };
        tampered.insert(idx, replacement);
        assert!(service.verify(&tampered).is_err());
    }

    #[test]
    fn foreign_key_fails_verification() {
        let issuer = service();
        let verifier = service();
        let token = issuer.issue_access(Uuid::new_v4()).unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn structurally_malformed_tokens_are_rejected() {
        let service = service();
        for bad in ["", "v4.public.", "garbage", "v2.local.abcdef"] {
            assert!(service.verify(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn refresh_exchanges_only_refresh_tokens() {
        let service = service();
        let subject = Uuid::new_v4();
        let refresh = service.issue_refresh(subject).unwrap();
        let access = service.refresh(&refresh).unwrap();
        let claims = service.verify(&access).unwrap();
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.subject, subject);

        let not_refresh = service.issue_access(subject).unwrap();
        assert!(matches!(
            service.refresh(&not_refresh),
            Err(TokenError::WrongKind)
        ));
    }

    #[test]
    fn pending_kind_is_preserved() {
        let service = service();
        let token = service.issue_mfa_pending(Uuid::new_v4()).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.kind, TokenKind::MfaPending);
    }
}
