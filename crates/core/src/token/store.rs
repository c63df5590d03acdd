//! Token persistence seam and the in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::token::error::TokenError;
use crate::token::types::{Token, TokenStatus, TokenType};

/// Storage for tokens.
///
/// Writes after creation go through [`TokenStore::compare_and_swap`], which
/// only commits if the stored status still equals the status the caller
/// read. That is the per-token exclusivity guarantee.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persists a new token.
    async fn insert(&self, token: &Token) -> Result<(), TokenError>;

    /// Loads a token by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Token>, TokenError>;

    /// Loads a token by its opaque code.
    async fn find_by_code(&self, token_code: &str) -> Result<Option<Token>, TokenError>;

    /// Replaces the stored token with `token` if its status is still `expected`.
    ///
    /// Returns `Ok(false)` when another writer committed first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the token does not exist.
    async fn compare_and_swap(&self, expected: TokenStatus, token: &Token)
    -> Result<bool, TokenError>;

    /// Tokens in any of `statuses`, optionally restricted to `types`,
    /// newest first.
    async fn list_by_status(
        &self,
        statuses: &[TokenStatus],
        types: Option<&[TokenType]>,
    ) -> Result<Vec<Token>, TokenError>;

    /// Non-terminal tokens whose validity window ended before `now`.
    async fn list_expirable(&self, now: DateTime<Utc>) -> Result<Vec<Token>, TokenError>;

    /// Next value of the per-year display sequence, starting at 1.
    async fn next_display_sequence(&self, year: i32) -> Result<u64, TokenError>;
}

/// Token store backed by concurrent maps. Used in tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: DashMap<Uuid, Token>,
    codes: DashMap<String, Uuid>,
    sequences: DashMap<i32, u64>,
}

impl InMemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if no token is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn collect(&self, keep: impl Fn(&Token) -> bool) -> Vec<Token> {
        let mut tokens: Vec<Token> = self
            .tokens
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tokens
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert(&self, token: &Token) -> Result<(), TokenError> {
        match self.codes.entry(token.token_code.clone()) {
            Entry::Occupied(_) => {
                return Err(TokenError::Storage(format!(
                    "token code {} already exists",
                    token.token_code
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(token.id);
            }
        }
        self.tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Token>, TokenError> {
        Ok(self.tokens.get(&id).map(|t| t.value().clone()))
    }

    async fn find_by_code(&self, token_code: &str) -> Result<Option<Token>, TokenError> {
        let Some(id) = self.codes.get(token_code).map(|id| *id.value()) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn compare_and_swap(
        &self,
        expected: TokenStatus,
        token: &Token,
    ) -> Result<bool, TokenError> {
        let mut stored = self
            .tokens
            .get_mut(&token.id)
            .ok_or_else(|| TokenError::NotFound(token.id.to_string()))?;
        if stored.status != expected {
            return Ok(false);
        }
        *stored = token.clone();
        Ok(true)
    }

    async fn list_by_status(
        &self,
        statuses: &[TokenStatus],
        types: Option<&[TokenType]>,
    ) -> Result<Vec<Token>, TokenError> {
        Ok(self.collect(|t| {
            statuses.contains(&t.status) && types.is_none_or(|types| types.contains(&t.token_type()))
        }))
    }

    async fn list_expirable(&self, now: DateTime<Utc>) -> Result<Vec<Token>, TokenError> {
        Ok(self.collect(|t| TokenStatus::EXPIRABLE.contains(&t.status) && t.valid_until < now))
    }

    async fn next_display_sequence(&self, year: i32) -> Result<u64, TokenError> {
        let mut value = self.sequences.entry(year).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}
