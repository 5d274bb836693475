/// Single-use token service
///
/// Backs the user service's password-reset and email-verification flows.
/// A token is issued with a kind, an owner, and an expiry; the plaintext
/// secret leaves this service exactly once, at generation. Consuming a
/// token deletes it, so a secret can never be replayed; everything the
/// sweep finds past its expiry is deleted unconsumed.
///
/// # Example
///
/// ```no_run
/// use crewdesk_services::tokens::TokenService;
/// use crewdesk_shared::models::token::TokenKind;
/// use uuid::Uuid;
///
/// # async fn example(tokens: &TokenService) -> crewdesk_shared::error::ServiceResult<()> {
/// let (_, secret) = tokens
///     .generate(TokenKind::PasswordReset, Uuid::new_v4(), None)
///     .await?;
/// let token = tokens.consume(TokenKind::PasswordReset, &secret).await?;
/// println!("reset password for {}", token.owner);
/// # Ok(())
/// # }
/// ```
use chrono::{Duration, Utc};
use crewdesk_shared::config::TokenConfig;
use crewdesk_shared::error::{ServiceError, ServiceResult};
use crewdesk_shared::models::token::{hash_secret, Token, TokenKind};
use crewdesk_shared::store::Collection;
use rand::RngCore;
use std::sync::Arc;
use uuid::Uuid;

/// Token service
pub struct TokenService {
    tokens: Arc<Collection<Token>>,
    config: TokenConfig,
}

impl TokenService {
    /// Creates the service over its collection
    pub fn new(tokens: Arc<Collection<Token>>, config: TokenConfig) -> Self {
        TokenService { tokens, config }
    }

    /// Issues a token and returns it with the plaintext secret
    ///
    /// The secret is 32 random bytes, hex encoded; only its SHA-256 digest
    /// is stored. `ttl` falls back to the configured default when `None`.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error for a nil owner — required fields are
    /// never silently defaulted.
    pub async fn generate(
        &self,
        kind: TokenKind,
        owner: Uuid,
        ttl: Option<Duration>,
    ) -> ServiceResult<(Token, String)> {
        if owner.is_nil() {
            return Err(ServiceError::invalid("owner", "owner is required"));
        }

        let ttl = match ttl {
            Some(ttl) => ttl,
            None => Duration::from_std(self.config.default_ttl)
                .map_err(|e| ServiceError::Internal(format!("default ttl out of range: {}", e)))?,
        };

        let mut secret_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret_bytes);
        let secret = hex::encode(secret_bytes);

        let now = Utc::now();
        let token = Token {
            id: Uuid::new_v4(),
            kind,
            owner,
            secret_hash: hash_secret(&secret),
            expires_at: now + ttl,
            created_at: now,
        };

        let token = self.tokens.insert(token).await;
        tracing::debug!(kind = kind.as_str(), owner = %owner, "token issued");
        Ok((token, secret))
    }

    /// Consumes a token by kind and plaintext secret
    ///
    /// Success deletes the token — a secret works at most once. Unknown and
    /// expired secrets both come back as `NotFound`; the caller cannot tell
    /// the two apart.
    pub async fn consume(&self, kind: TokenKind, secret: &str) -> ServiceResult<Token> {
        let digest = hash_secret(secret);
        let token = self
            .tokens
            .find_one(|t| t.kind == kind && t.secret_hash == digest)
            .await
            .ok_or_else(|| ServiceError::not_found("token", "invalid or expired token"))?;

        if token.is_expired(Utc::now()) {
            // Reclaim eagerly; the sweep would get it anyway.
            self.tokens.remove_by_id(token.id).await;
            return Err(ServiceError::not_found("token", "invalid or expired token"));
        }

        // Two racing consumers both reach this point with the same token;
        // only the one whose remove actually deleted the document wins.
        if !self.tokens.remove_by_id(token.id).await {
            return Err(ServiceError::not_found("token", "invalid or expired token"));
        }

        Ok(token)
    }

    /// Deletes every token past its expiry and returns the count removed
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let expired = self.tokens.find(|t| t.is_expired(now)).await;

        let mut removed = 0;
        for token in expired {
            if self.tokens.remove_by_id(token.id).await {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, "expired tokens swept");
        }
        removed
    }

    /// Number of stored tokens (expired ones included until swept)
    pub async fn count(&self) -> usize {
        self.tokens.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(Arc::new(Collection::new("tokens")), TokenConfig::default())
    }

    #[tokio::test]
    async fn test_generate_stores_digest_not_secret() {
        let tokens = service();
        let (token, secret) = tokens
            .generate(TokenKind::PasswordReset, Uuid::new_v4(), None)
            .await
            .unwrap();

        assert_ne!(token.secret_hash, secret);
        assert_eq!(token.secret_hash, hash_secret(&secret));
    }

    #[tokio::test]
    async fn test_nil_owner_is_a_validation_failure() {
        let tokens = service();
        let err = tokens
            .generate(TokenKind::PasswordReset, Uuid::nil(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let tokens = service();
        let owner = Uuid::new_v4();
        let (_, secret) = tokens
            .generate(TokenKind::PasswordReset, owner, None)
            .await
            .unwrap();

        let consumed = tokens
            .consume(TokenKind::PasswordReset, &secret)
            .await
            .unwrap();
        assert_eq!(consumed.owner, owner);

        let err = tokens
            .consume(TokenKind::PasswordReset, &secret)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_consume_checks_kind() {
        let tokens = service();
        let (_, secret) = tokens
            .generate(TokenKind::PasswordReset, Uuid::new_v4(), None)
            .await
            .unwrap();

        let err = tokens
            .consume(TokenKind::EmailVerification, &secret)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_expired_token_cannot_be_consumed() {
        let tokens = service();
        let (_, secret) = tokens
            .generate(
                TokenKind::PasswordReset,
                Uuid::new_v4(),
                Some(Duration::seconds(-1)),
            )
            .await
            .unwrap();

        let err = tokens
            .consume(TokenKind::PasswordReset, &secret)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(tokens.count().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let tokens = service();
        let owner = Uuid::new_v4();

        tokens
            .generate(TokenKind::PasswordReset, owner, Some(Duration::seconds(-5)))
            .await
            .unwrap();
        tokens
            .generate(
                TokenKind::EmailVerification,
                owner,
                Some(Duration::seconds(-5)),
            )
            .await
            .unwrap();
        tokens
            .generate(TokenKind::PasswordReset, owner, None)
            .await
            .unwrap();

        let removed = tokens.sweep_expired().await;
        assert_eq!(removed, 2);
        assert_eq!(tokens.count().await, 1);

        // Nothing left for a second sweep.
        assert_eq!(tokens.sweep_expired().await, 0);
    }
}
