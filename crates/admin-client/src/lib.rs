//! Client core of the admin console.
//!
//! [`AdminConsole`] wires the services together:
//!
//! - [`TokenStore`] keeps the token pair in one of two [`storage`] tiers chosen
//!   by the remember-me flag.
//! - [`ApiClient`] sends requests, unwraps the `{code, data, msg}` envelope and
//!   refreshes an expired access token once for all concurrent callers.
//! - [`DictCache`] coalesces dictionary loads and persists the results.
//! - [`SessionController`] drives login, logout and profile loading and
//!   publishes the [`Session`] to subscribers.

pub mod api;
pub mod config;
mod context;
pub mod dict;
pub mod error;
pub mod events;
pub mod http;
pub mod permission;
pub mod session;
pub mod storage;
pub mod token;

pub use api::auth::{CaptchaInfo, LoginForm};
pub use api::dict::DictEditor;
pub use api::user::UserInfo;
pub use api::{PageQuery, PageResult};
pub use config::{ClientConfig, ProfileFailurePolicy, TeardownTarget, load_config};
pub use context::AdminConsole;
pub use dict::{DictCache, DictItem, DictItems};
pub use error::{ApiError, ConfigError, ErrorCategory, StorageError};
pub use events::{ClientEvent, EventBus, Navigator, NoticeLevel, RecordingNavigator};
pub use http::{ApiClient, ApiRequest, BlobResponse};
pub use permission::PermissionCache;
pub use session::{Session, SessionController, SessionState, SessionStatus};
pub use storage::{KeyValueStore, Storage, StorageTier};
pub use token::{TokenPair, TokenStore};
