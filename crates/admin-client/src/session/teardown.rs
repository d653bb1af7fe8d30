use std::sync::{Arc, RwLock, Weak};

use super::SessionState;
use crate::config::TeardownTarget;
use crate::storage::{Storage, keys};
use crate::token::TokenStore;

/// State that must not outlive the signed-in user.
pub trait SessionResource: Send + Sync {
    fn clear_for_logout(&self);
}

/// Local session teardown shared by logout and unrecoverable token expiry.
///
/// Tokens, the session snapshot and the observable session are always reset.
/// Caches and storage keys are cleared according to the configured targets.
/// Resources are held weakly so registering one never keeps it alive.
pub struct Teardown {
    tokens: TokenStore,
    state: SessionState,
    targets: Vec<TeardownTarget>,
    resources: RwLock<Vec<(TeardownTarget, Weak<dyn SessionResource>)>>,
}

impl Teardown {
    pub fn new(tokens: TokenStore, state: SessionState, targets: Vec<TeardownTarget>) -> Self {
        Self {
            tokens,
            state,
            targets,
            resources: RwLock::new(Vec::new()),
        }
    }

    pub fn targets(&self) -> &[TeardownTarget] {
        &self.targets
    }

    /// Registers `resource` as the implementation of `target`.
    pub fn register(&self, target: TeardownTarget, resource: Arc<dyn SessionResource>) {
        if let Ok(mut resources) = self.resources.write() {
            resources.retain(|(_, weak)| weak.strong_count() > 0);
            resources.push((target, Arc::downgrade(&resource)));
        }
    }

    pub fn run(&self) {
        self.tokens.clear_auth();
        let storage: &Storage = self.tokens.storage();
        storage.remove_everywhere(keys::SESSION_SNAPSHOT);

        let resources = self
            .resources
            .read()
            .map(|r| r.clone())
            .unwrap_or_default();

        for target in &self.targets {
            match target {
                TeardownTarget::StorageKey(key) => storage.remove_everywhere(key),
                _ => {
                    for (_, resource) in resources.iter().filter(|(t, _)| t == target) {
                        if let Some(resource) = resource.upgrade() {
                            resource.clear_for_logout();
                        }
                    }
                }
            }
        }

        self.state.reset();
        tracing::debug!(targets = self.targets.len(), "Session torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::session::SessionStatus;
    use crate::token::TokenPair;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl SessionResource for Counter {
        fn clear_for_logout(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn store() -> TokenStore {
        let tokens = TokenStore::new(Storage::in_memory());
        tokens.set_tokens(&TokenPair::new("A1", "R1"), true);
        tokens
    }

    #[test]
    fn test_always_clears_tokens_and_session() {
        let tokens = store();
        let state = SessionState::new();
        state.update(|s| s.status = SessionStatus::Authenticated);
        tokens.storage().durable().set(keys::SESSION_SNAPSHOT, "{}".into());

        Teardown::new(tokens.clone(), state.clone(), Vec::new()).run();

        assert!(!tokens.is_logged_in());
        assert!(tokens.remember_me());
        assert_eq!(tokens.storage().durable().get(keys::SESSION_SNAPSHOT), None);
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_only_configured_targets_are_cleared() {
        let tokens = store();
        tokens.storage().durable().set("layout", "wide".into());
        tokens.storage().ephemeral().set("layout", "wide".into());
        tokens.storage().durable().set("theme", "dark".into());

        let teardown = Teardown::new(
            tokens.clone(),
            SessionState::new(),
            vec![
                TeardownTarget::DictCache,
                TeardownTarget::StorageKey("layout".into()),
            ],
        );
        let dicts = Arc::new(Counter::default());
        let perms = Arc::new(Counter::default());
        teardown.register(TeardownTarget::DictCache, dicts.clone());
        teardown.register(TeardownTarget::PermissionCache, perms.clone());

        teardown.run();

        assert_eq!(dicts.0.load(Ordering::SeqCst), 1);
        assert_eq!(perms.0.load(Ordering::SeqCst), 0);
        assert_eq!(tokens.storage().durable().get("layout"), None);
        assert_eq!(tokens.storage().ephemeral().get("layout"), None);
        assert_eq!(tokens.storage().durable().get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_dropped_resources_are_skipped() {
        let teardown = Teardown::new(
            store(),
            SessionState::new(),
            vec![TeardownTarget::DictCache],
        );
        let dicts = Arc::new(Counter::default());
        teardown.register(TeardownTarget::DictCache, dicts.clone());
        drop(dicts);
        teardown.run();
    }
}
