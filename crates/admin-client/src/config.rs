//! Client configuration.
//!
//! Values come from an optional TOML file and are overridden by environment
//! variables prefixed with `ADMIN_CONSOLE`, using `__` as the section
//! separator (e.g. `ADMIN_CONSOLE__API__BASE_URL=https://admin.example.com/api/v1`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "admin-console.toml";
pub const ENV_PREFIX: &str = "ADMIN_CONSOLE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    pub request_timeout_ms: u64,
    /// Business code meaning success inside the response envelope.
    pub success_code: String,
    pub access_token_invalid_code: String,
    pub refresh_token_invalid_code: String,
    pub captcha_error_codes: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8989/api/v1".into(),
            request_timeout_ms: 50_000,
            success_code: "00000".into(),
            access_token_invalid_code: "A0230".into(),
            refresh_token_invalid_code: "A0231".into(),
            captcha_error_codes: vec!["A0240".into()],
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Sign-in route used for redirects after an unrecoverable auth failure.
    pub login_route: String,
    pub profile_failure: ProfileFailurePolicy,
    /// Extra state cleared on logout and on session expiry. Tokens are always cleared.
    pub teardown: Vec<TeardownTarget>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_route: "/login".into(),
            profile_failure: ProfileFailurePolicy::default(),
            teardown: vec![TeardownTarget::DictCache, TeardownTarget::PermissionCache],
        }
    }
}

/// What happens to the session when the profile fetch following a successful
/// login fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFailurePolicy {
    /// Stay authenticated without a profile; the next fetch may succeed.
    #[default]
    KeepAuthenticated,
    /// Treat a missing profile as a failed login.
    Deauthenticate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownTarget {
    DictCache,
    PermissionCache,
    /// Arbitrary key removed from both storage tiers.
    StorageKey(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the durable tier. `None` keeps everything in memory.
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn durable_path(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join("durable.json"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.api.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.auth.login_route = route.into();
        self
    }

    #[must_use]
    pub fn with_profile_failure(mut self, policy: ProfileFailurePolicy) -> Self {
        self.auth.profile_failure = policy;
        self
    }

    #[must_use]
    pub fn with_teardown(mut self, targets: Vec<TeardownTarget>) -> Self {
        self.auth.teardown = targets;
        self
    }

    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.dir = Some(dir.into());
        self
    }

    /// Parsed base URL, guaranteed to end with a slash so relative joins keep
    /// the path prefix.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut raw = self.api.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| ConfigError::invalid(format!("api.base_url: {e}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("api.base_url must not be empty"));
        }
        let url = self.base_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(format!(
                "api.base_url: unsupported scheme {}",
                url.scheme()
            )));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(ConfigError::invalid("api.request_timeout_ms must be > 0"));
        }
        let success = &self.api.success_code;
        let mut codes = vec![
            &self.api.access_token_invalid_code,
            &self.api.refresh_token_invalid_code,
        ];
        codes.extend(self.api.captcha_error_codes.iter());
        if let Some(clash) = codes.into_iter().find(|c| *c == success) {
            return Err(ConfigError::invalid(format!(
                "business code {clash} collides with api.success_code"
            )));
        }
        if self.api.access_token_invalid_code == self.api.refresh_token_invalid_code {
            return Err(ConfigError::invalid(
                "access and refresh token invalid codes must differ",
            ));
        }
        if !self.auth.login_route.starts_with('/') {
            return Err(ConfigError::invalid("auth.login_route must start with '/'"));
        }
        Ok(())
    }
}

/// Loads configuration from `path` (or `admin-console.toml` in the working
/// directory when present) with environment overrides, then validates it.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let mut builder = Config::builder();
    match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::invalid(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            builder = builder.add_source(File::from(p.to_path_buf()));
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                builder = builder.add_source(File::from(default_path));
            }
        }
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .separator("__"),
    );
    let merged: ClientConfig = builder.build()?.try_deserialize()?;
    merged.validate()?;
    tracing::debug!(base_url = %merged.api.base_url, "Loaded client configuration");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = ClientConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.api.success_code, "00000");
        assert_eq!(cfg.api.access_token_invalid_code, "A0230");
        assert_eq!(cfg.api.refresh_token_invalid_code, "A0231");
        assert_eq!(cfg.auth.login_route, "/login");
        assert_eq!(cfg.auth.profile_failure, ProfileFailurePolicy::KeepAuthenticated);
        assert_eq!(
            cfg.auth.teardown,
            vec![TeardownTarget::DictCache, TeardownTarget::PermissionCache]
        );
    }

    #[test]
    fn test_base_url_keeps_prefix() {
        let cfg = ClientConfig::default().with_base_url("https://admin.example.com/api/v1");
        let url = cfg.base_url().unwrap();
        assert_eq!(url.as_str(), "https://admin.example.com/api/v1/");
        assert_eq!(
            url.join("auth/login").unwrap().as_str(),
            "https://admin.example.com/api/v1/auth/login"
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ClientConfig::default().with_base_url("").validate().is_err());
        assert!(
            ClientConfig::default()
                .with_base_url("ftp://example.com")
                .validate()
                .is_err()
        );
        assert!(
            ClientConfig::default()
                .with_request_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            ClientConfig::default()
                .with_login_route("login")
                .validate()
                .is_err()
        );

        let mut cfg = ClientConfig::default();
        cfg.api.access_token_invalid_code = "00000".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("admin-console.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "https://admin.example.com/api/v1"
request_timeout_ms = 1500

[auth]
login_route = "/signin"
profile_failure = "deauthenticate"
teardown = ["dict_cache", { storage_key = "layout" }]

[logging]
level = "debug"
"#,
        )
        .expect("write toml");

        let cfg = load_config(Some(&path)).expect("should parse config");
        assert_eq!(cfg.api.base_url, "https://admin.example.com/api/v1");
        assert_eq!(cfg.api.request_timeout(), Duration::from_millis(1500));
        assert_eq!(cfg.api.success_code, "00000");
        assert_eq!(cfg.auth.login_route, "/signin");
        assert_eq!(cfg.auth.profile_failure, ProfileFailurePolicy::Deauthenticate);
        assert_eq!(
            cfg.auth.teardown,
            vec![
                TeardownTarget::DictCache,
                TeardownTarget::StorageKey("layout".into())
            ]
        );
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let result = load_config(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
