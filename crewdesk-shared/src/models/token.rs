/// Single-use token model
///
/// Tokens back the password-reset and email-verification flows. The
/// plaintext secret is returned to the caller exactly once at generation;
/// only its SHA-256 digest is stored. A successful consume deletes the
/// token (single use); an expiry sweep reclaims the rest.
///
/// # Lifecycle
///
/// ```text
/// issued ──consume──▶ consumed (deleted)
///    │
///    └───expiry sweep──▶ expired (deleted)
/// ```
use crate::store::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// What a token is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Password reset flow
    PasswordReset,

    /// Email verification flow
    EmailVerification,
}

impl TokenKind {
    /// Converts kind to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::PasswordReset => "password_reset",
            TokenKind::EmailVerification => "email_verification",
        }
    }
}

/// Issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Unique token ID
    pub id: Uuid,

    /// What this token is for
    pub kind: TokenKind,

    /// Owning user
    pub owner: Uuid,

    /// SHA-256 digest of the secret (hex); the plaintext is never stored
    pub secret_hash: String,

    /// When the token stops being valid
    pub expires_at: DateTime<Utc>,

    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// Whether the token has passed its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl Entity for Token {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Hashes a token secret for storage or lookup
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
