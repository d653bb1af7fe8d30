#![allow(dead_code)]

use std::sync::Arc;

use admin_client::storage::Storage;
use admin_client::{AdminConsole, ClientConfig, RecordingNavigator, TokenPair};
use serde_json::{Value, json};
use wiremock::{Match, MockServer, Request, ResponseTemplate};

pub const API_PREFIX: &str = "/api/v1";

pub struct Harness {
    pub server: MockServer,
    pub console: AdminConsole,
    pub navigator: Arc<RecordingNavigator>,
    pub storage: Storage,
}

impl Harness {
    pub async fn start() -> Self {
        Self::start_with(|config| config).await
    }

    pub async fn start_with(customize: impl FnOnce(ClientConfig) -> ClientConfig) -> Self {
        let server = MockServer::start().await;
        let storage = Storage::in_memory();
        let navigator = RecordingNavigator::shared("/dashboard");
        let config = customize(
            ClientConfig::default().with_base_url(format!("{}{API_PREFIX}", server.uri())),
        );
        let console = AdminConsole::with_storage(config, storage.clone(), navigator.clone())
            .expect("valid test config");
        Self {
            server,
            console,
            navigator,
            storage,
        }
    }

    /// Stores a token pair as if a previous login had happened.
    pub fn sign_in(&self, access: &str, refresh: &str) {
        self.console
            .tokens()
            .set_tokens(&TokenPair::new(access, refresh), false);
    }
}

pub fn api_path(path: &str) -> String {
    format!("{API_PREFIX}/{}", path.trim_start_matches('/'))
}

/// Successful envelope around `data`.
pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": "00000",
        "data": data,
        "msg": "一切ok"
    }))
}

/// HTTP 200 carrying a non-success business code.
pub fn biz(code: &str, msg: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": code,
        "data": null,
        "msg": msg
    }))
}

pub fn token_pair(access: &str, refresh: &str) -> Value {
    json!({
        "accessToken": access,
        "refreshToken": refresh,
        "tokenType": "Bearer",
        "expiresIn": 3600
    })
}

pub fn profile() -> Value {
    json!({
        "userId": 2,
        "username": "admin",
        "nickname": "System Admin",
        "avatar": null,
        "roles": ["ADMIN"],
        "perms": ["sys:user:add", "sys:dict:edit"]
    })
}

/// Matches requests sent without an `Authorization` header.
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}
