use serde::{Deserialize, Serialize};

use crate::storage::{Storage, StorageTier, keys};

/// Token pair issued by `/auth/login` and `/auth/refresh-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: None,
            expires_in: None,
        }
    }
}

/// Holds the access/refresh tokens in exactly one storage tier.
///
/// The remember-me flag lives in the durable tier and picks the tier tokens
/// are read from and written to. At most one tier holds tokens at a time.
#[derive(Clone)]
pub struct TokenStore {
    storage: Storage,
}

impl TokenStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn remember_me(&self) -> bool {
        self.storage.durable().get(keys::REMEMBER_ME).as_deref() == Some("true")
    }

    /// Tier currently selected by the remember-me flag.
    pub fn active_tier(&self) -> StorageTier {
        StorageTier::for_remember_me(self.remember_me())
    }

    pub fn is_logged_in(&self) -> bool {
        !self.access_token().is_empty()
    }

    /// Current access token, or an empty string when absent.
    pub fn access_token(&self) -> String {
        self.read(keys::ACCESS_TOKEN)
    }

    /// Current refresh token, or an empty string when absent.
    pub fn refresh_token(&self) -> String {
        self.read(keys::REFRESH_TOKEN)
    }

    /// Persists the remember-me flag, writes both tokens to the selected tier
    /// and removes any copy left in the other tier.
    pub fn set_tokens(&self, tokens: &TokenPair, remember_me: bool) {
        self.storage
            .durable()
            .set(keys::REMEMBER_ME, remember_me.to_string());

        let tier = StorageTier::for_remember_me(remember_me);
        let target = self.storage.tier(tier);
        target.set(keys::ACCESS_TOKEN, tokens.access_token.clone());
        target.set(keys::REFRESH_TOKEN, tokens.refresh_token.clone());

        let stale = self.storage.tier(tier.other());
        stale.remove(keys::ACCESS_TOKEN);
        stale.remove(keys::REFRESH_TOKEN);

        tracing::debug!(?tier, expires_in = ?tokens.expires_in, "Stored token pair");
    }

    /// Removes tokens from both tiers. The remember-me preference is kept.
    pub fn clear_auth(&self) {
        self.storage.remove_everywhere(keys::ACCESS_TOKEN);
        self.storage.remove_everywhere(keys::REFRESH_TOKEN);
    }

    fn read(&self, key: &str) -> String {
        self.storage
            .tier(self.active_tier())
            .get(key)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_me_uses_durable_tier() {
        let store = TokenStore::new(Storage::in_memory());
        store.set_tokens(&TokenPair::new("a", "r"), true);

        assert!(store.remember_me());
        assert!(store.is_logged_in());
        assert_eq!(store.access_token(), "a");
        assert_eq!(store.refresh_token(), "r");
        assert_eq!(store.storage().ephemeral().get(keys::ACCESS_TOKEN), None);
        assert_eq!(store.storage().ephemeral().get(keys::REFRESH_TOKEN), None);
    }

    #[test]
    fn test_toggling_remember_me_moves_tokens() {
        let store = TokenStore::new(Storage::in_memory());
        store.set_tokens(&TokenPair::new("a", "r"), true);
        store.set_tokens(&TokenPair::new("a2", "r2"), false);

        assert!(!store.remember_me());
        assert_eq!(store.active_tier(), StorageTier::Ephemeral);
        assert_eq!(store.access_token(), "a2");
        assert_eq!(store.refresh_token(), "r2");
        assert_eq!(store.storage().durable().get(keys::ACCESS_TOKEN), None);
        assert_eq!(store.storage().durable().get(keys::REFRESH_TOKEN), None);
        assert_eq!(
            store.storage().ephemeral().get(keys::ACCESS_TOKEN).as_deref(),
            Some("a2")
        );
    }

    #[test]
    fn test_clear_auth_keeps_preference() {
        let store = TokenStore::new(Storage::in_memory());
        store.set_tokens(&TokenPair::new("a", "r"), true);
        store.clear_auth();

        assert!(!store.is_logged_in());
        assert_eq!(store.access_token(), "");
        assert_eq!(store.refresh_token(), "");
        assert!(store.remember_me());
    }

    #[test]
    fn test_detached_storage_reads_empty() {
        let store = TokenStore::new(Storage::detached());
        store.set_tokens(&TokenPair::new("a", "r"), true);
        assert!(!store.is_logged_in());
        assert_eq!(store.access_token(), "");
        assert!(!store.remember_me());
    }

    #[test]
    fn test_token_pair_wire_format() {
        let pair: TokenPair = serde_json::from_str(
            r#"{"accessToken":"A1","refreshToken":"R1","tokenType":"Bearer","expiresIn":3600}"#,
        )
        .unwrap();
        assert_eq!(pair.access_token, "A1");
        assert_eq!(pair.refresh_token, "R1");
        assert_eq!(pair.expires_in, Some(3600));
    }
}
