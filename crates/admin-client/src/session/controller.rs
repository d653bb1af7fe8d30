use std::sync::Arc;

use super::{Session, SessionSnapshot, SessionState, SessionStatus, Teardown};
use crate::api::auth::LoginForm;
use crate::api::user::UserInfo;
use crate::config::ProfileFailurePolicy;
use crate::error::ApiError;
use crate::events::ClientEvent;
use crate::http::ApiClient;
use crate::permission::PermissionCache;
use crate::storage::keys;

/// Drives login, logout and profile loading, and owns the observable session.
#[derive(Clone)]
pub struct SessionController {
    client: ApiClient,
    state: SessionState,
    teardown: Arc<Teardown>,
    permissions: PermissionCache,
    profile_failure: ProfileFailurePolicy,
}

impl SessionController {
    pub fn new(
        client: ApiClient,
        state: SessionState,
        teardown: Arc<Teardown>,
        permissions: PermissionCache,
        profile_failure: ProfileFailurePolicy,
    ) -> Self {
        Self {
            client,
            state,
            teardown,
            permissions,
            profile_failure,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Session {
        self.state.snapshot()
    }

    pub fn permissions(&self) -> &PermissionCache {
        &self.permissions
    }

    /// Signs in, stores the token pair in the tier chosen by
    /// `form.remember_me`, then loads the profile.
    ///
    /// A failed login leaves the session unauthenticated. A failed profile
    /// fetch is handled according to the configured [`ProfileFailurePolicy`]
    /// and its error is returned either way.
    pub async fn login(&self, form: &LoginForm) -> Result<(), ApiError> {
        self.state.update(|s| {
            s.status = SessionStatus::Authenticating;
            s.loading = true;
        });

        let pair = match self.client.login(form).await {
            Ok(pair) => pair,
            Err(err) => {
                self.state.update(|s| {
                    s.status = SessionStatus::Unauthenticated;
                    s.loading = false;
                });
                return Err(err);
            }
        };

        self.client.tokens().set_tokens(&pair, form.remember_me);
        self.state
            .update(|s| s.status = SessionStatus::Authenticated);
        tracing::info!(
            username = %form.username,
            remember_me = form.remember_me,
            "Signed in"
        );
        self.client
            .events()
            .publish(ClientEvent::SessionChanged { authenticated: true });

        match self.client.current_user().await {
            Ok(user) => {
                self.accept_profile(user);
                Ok(())
            }
            Err(err) => {
                match self.profile_failure {
                    ProfileFailurePolicy::KeepAuthenticated => {
                        tracing::warn!(error = %err, "Profile fetch after login failed");
                        self.state.update(|s| s.loading = false);
                        self.persist();
                    }
                    ProfileFailurePolicy::Deauthenticate => {
                        tracing::warn!(error = %err, "Profile fetch after login failed, signing out");
                        self.teardown.run();
                        self.client
                            .events()
                            .publish(ClientEvent::SessionChanged { authenticated: false });
                    }
                }
                Err(err)
            }
        }
    }

    /// Fetches the profile. Failure deauthenticates the session.
    pub async fn get_user_info(&self) -> Result<UserInfo, ApiError> {
        self.state.update(|s| s.loading = true);
        match self.client.current_user().await {
            Ok(user) => {
                self.accept_profile(user.clone());
                Ok(user)
            }
            Err(err) => {
                self.permissions.clear();
                self.state.update(|s| {
                    s.status = SessionStatus::Unauthenticated;
                    s.user_info = None;
                    s.loading = false;
                });
                self.persist();
                Err(err)
            }
        }
    }

    /// Signs out. The endpoint call is best effort; local state is always
    /// torn down.
    pub async fn logout(&self) {
        if self.client.tokens().is_logged_in()
            && let Err(err) = self.client.logout().await
        {
            tracing::warn!(error = %err, "Logout request failed");
        }
        self.teardown.run();
        self.client
            .events()
            .publish(ClientEvent::SessionChanged { authenticated: false });
        tracing::info!("Signed out");
    }

    /// Reinstates the persisted session snapshot when tokens are still
    /// present. Returns whether the session is now authenticated.
    pub fn restore(&self) -> bool {
        let tokens = self.client.tokens();
        let tier = tokens.storage().tier(tokens.active_tier());
        let snapshot = tier
            .get(keys::SESSION_SNAPSHOT)
            .and_then(|raw| match serde_json::from_str::<SessionSnapshot>(&raw) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding corrupt session snapshot");
                    None
                }
            });

        match snapshot {
            Some(snapshot) if snapshot.is_authenticated && tokens.is_logged_in() => {
                if let Some(user) = &snapshot.user_info {
                    self.permissions.load(user);
                }
                self.state.update(|s| {
                    s.status = SessionStatus::Authenticated;
                    s.user_info = snapshot.user_info;
                    s.loading = false;
                });
                tracing::debug!("Restored session");
                true
            }
            _ => {
                tokens.storage().remove_everywhere(keys::SESSION_SNAPSHOT);
                false
            }
        }
    }

    fn accept_profile(&self, user: UserInfo) {
        self.permissions.load(&user);
        self.state.update(|s| {
            s.status = SessionStatus::Authenticated;
            s.user_info = Some(user);
            s.loading = false;
        });
        self.persist();
    }

    fn persist(&self) {
        let session = self.state.snapshot();
        let tokens = self.client.tokens();
        let snapshot = SessionSnapshot {
            is_authenticated: session.is_authenticated(),
            user_info: session.user_info,
        };
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                let tier = tokens.active_tier();
                tokens.storage().tier(tier.other()).remove(keys::SESSION_SNAPSHOT);
                tokens.storage().tier(tier).set(keys::SESSION_SNAPSHOT, json);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to persist session snapshot"),
        }
    }
}
