use std::sync::Arc;

use crate::api::dict::DictEditor;
use crate::config::{ClientConfig, TeardownTarget};
use crate::dict::DictCache;
use crate::error::ConfigError;
use crate::events::{EventBus, Navigator};
use crate::http::ApiClient;
use crate::permission::PermissionCache;
use crate::session::{SessionController, SessionState, Teardown};
use crate::storage::Storage;
use crate::token::TokenStore;

/// Every client service, wired once and shared by handle.
///
/// Holds what would otherwise be process-wide singletons: the token store,
/// the refresh gate inside the [`ApiClient`], the dictionary cache and the
/// observable session.
#[derive(Clone)]
pub struct AdminConsole {
    config: Arc<ClientConfig>,
    events: EventBus,
    client: ApiClient,
    dicts: DictCache,
    dict_editor: DictEditor,
    permissions: PermissionCache,
    session: SessionController,
}

impl AdminConsole {
    /// Builds the services with storage taken from `config.storage`.
    pub fn new(config: ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self, ConfigError> {
        let storage = match config.storage.durable_path() {
            Some(path) => Storage::with_durable_file(path),
            None => Storage::in_memory(),
        };
        Self::with_storage(config, storage, navigator)
    }

    pub fn with_storage(
        config: ClientConfig,
        storage: Storage,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let events = EventBus::new();
        let tokens = TokenStore::new(storage.clone());
        let state = SessionState::new();
        let teardown = Arc::new(Teardown::new(
            tokens.clone(),
            state.clone(),
            config.auth.teardown.clone(),
        ));

        let client = ApiClient::new(&config, tokens, teardown.clone(), events.clone(), navigator)?;
        let dicts = DictCache::new(client.clone(), storage);
        let permissions = PermissionCache::new();
        teardown.register(TeardownTarget::DictCache, dicts.resource());
        teardown.register(TeardownTarget::PermissionCache, permissions.resource());

        let session = SessionController::new(
            client.clone(),
            state,
            teardown,
            permissions.clone(),
            config.auth.profile_failure,
        );
        let dict_editor = DictEditor::new(client.clone(), dicts.clone());

        tracing::debug!(base_url = %client.base_url(), "Admin console client ready");
        Ok(Self {
            config: Arc::new(config),
            events,
            client,
            dicts,
            dict_editor,
            permissions,
            session,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn tokens(&self) -> &TokenStore {
        self.client.tokens()
    }

    pub fn dicts(&self) -> &DictCache {
        &self.dicts
    }

    pub fn dict_editor(&self) -> &DictEditor {
        &self.dict_editor
    }

    pub fn permissions(&self) -> &PermissionCache {
        &self.permissions
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }
}
