use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::envelope::{ApiEnvelope, BusinessCodes, Outcome};
use super::refresh::{RefreshGate, Release, Ticket};
use super::request::{ApiRequest, AuthMode, BlobResponse, RequestBody, ResponseKind};
use crate::config::ClientConfig;
use crate::error::{ApiError, ConfigError};
use crate::events::{ClientEvent, EventBus, Navigator, NoticeLevel, login_redirect};
use crate::session::Teardown;
use crate::token::{TokenPair, TokenStore};

pub const REFRESH_TOKEN_PATH: &str = "auth/refresh-token";

const SESSION_EXPIRED_NOTICE: &str = "Your session has expired, please sign in again";
const MAX_ERROR_BODY: usize = 200;

/// Authenticated request pipeline.
///
/// Composes the bearer header, unwraps the `{code, data, msg}` envelope,
/// classifies failures, and transparently refreshes an expired access token
/// before replaying the call once. Cloning is cheap; clones share the token
/// store and the refresh single-flight state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    base_url: Url,
    codes: BusinessCodes,
    tokens: TokenStore,
    gate: RefreshGate,
    teardown: Arc<Teardown>,
    events: EventBus,
    navigator: Arc<dyn Navigator>,
    login_route: String,
}

enum Reply {
    Payload(Value),
    Blob(BlobResponse),
}

/// Failure of a single dispatch, before protocol handling.
enum Failure {
    AccessTokenInvalid(String),
    RefreshTokenInvalid(String),
    Error(ApiError),
}

impl From<ApiError> for Failure {
    fn from(err: ApiError) -> Self {
        Self::Error(err)
    }
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        tokens: TokenStore,
        teardown: Arc<Teardown>,
        events: EventBus,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.api.request_timeout())
            .build()
            .map_err(|e| ConfigError::invalid(format!("failed to build HTTP client: {e}")))?;
        Self::with_http_client(config, http, tokens, teardown, events, navigator)
    }

    /// Uses a caller-provided HTTP client (connection pool reuse, proxies).
    pub fn with_http_client(
        config: &ClientConfig,
        http: reqwest::Client,
        tokens: TokenStore,
        teardown: Arc<Teardown>,
        events: EventBus,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: config.base_url()?,
                codes: BusinessCodes::from(&config.api),
                tokens,
                gate: RefreshGate::new(),
                teardown,
                events,
                navigator,
                login_route: config.auth.login_route.clone(),
            }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Whether a token refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.gate.is_refreshing()
    }

    /// Sends `request` and decodes the envelope's `data` into `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        match self.execute(&request).await? {
            Reply::Payload(data) => serde_json::from_value(data)
                .map_err(|e| self.report(&request, ApiError::decode(e.to_string()))),
            Reply::Blob(_) => Err(ApiError::invalid_request(
                "blob responses must be requested with send_blob",
            )),
        }
    }

    /// Sends `request` and discards the payload.
    pub async fn send_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(&request).await.map(|_| ())
    }

    /// Sends `request` and returns the raw response body on success.
    pub async fn send_blob(&self, request: ApiRequest) -> Result<BlobResponse, ApiError> {
        let request = request.blob();
        match self.execute(&request).await? {
            Reply::Blob(blob) => Ok(blob),
            Reply::Payload(_) => Err(ApiError::decode("expected a raw response body")),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::post(path).json_of(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::put(path).json_of(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_unit(ApiRequest::delete(path)).await
    }

    /// Exchanges the stored refresh token for a new pair, joining any refresh
    /// already in flight.
    pub async fn refresh_access_token(&self) -> Result<(), ApiError> {
        let used = self.inner.tokens.access_token();
        self.ensure_refreshed(&used).await
    }

    async fn execute(&self, request: &ApiRequest) -> Result<Reply, ApiError> {
        let used = self.bearer_for(request);
        let result = match self.attempt(request, used.as_deref()).await {
            Err(Failure::AccessTokenInvalid(_)) if request.auth == AuthMode::Bearer => {
                tracing::debug!(path = request.path(), "Access token rejected");
                self.ensure_refreshed(used.as_deref().unwrap_or_default())
                    .await?;
                // Re-read: the replay must carry the token stored by the refresh.
                let fresh = self.bearer_for(request);
                match self.attempt(request, fresh.as_deref()).await {
                    Err(Failure::AccessTokenInvalid(message)) => {
                        Err(Failure::Error(ApiError::TokenExpired(message)))
                    }
                    other => other,
                }
            }
            other => other,
        };

        match result {
            Ok(reply) => Ok(reply),
            Err(Failure::RefreshTokenInvalid(message)) => Err(self.expire_session(message)),
            Err(Failure::AccessTokenInvalid(message)) => Err(self.report(
                request,
                ApiError::business(self.inner.codes.access_token_invalid.clone(), message),
            )),
            Err(Failure::Error(err)) => Err(self.report(request, err)),
        }
    }

    async fn ensure_refreshed(&self, used: &str) -> Result<(), ApiError> {
        let tokens = &self.inner.tokens;
        loop {
            let ticket = self.inner.gate.enter(|| {
                let current = tokens.access_token();
                !current.is_empty() && current != used
            });

            return match ticket {
                Ticket::AlreadyRefreshed => Ok(()),
                Ticket::Waiter(released) => match released.await {
                    Ok(Release::Refreshed) => Ok(()),
                    Ok(Release::Abandoned) => {
                        tracing::debug!("Refresh leader cancelled, re-entering");
                        continue;
                    }
                    Err(_) => Err(ApiError::SessionExpired("token refresh failed".into())),
                },
                Ticket::Leader(guard) => match self.request_new_tokens().await {
                    Ok(pair) => {
                        let remember_me = tokens.remember_me();
                        guard.succeed(|| tokens.set_tokens(&pair, remember_me));
                        Ok(())
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Token refresh failed");
                        guard.fail();
                        Err(self.expire_session(err.message()))
                    }
                },
            };
        }
    }

    async fn request_new_tokens(&self) -> Result<TokenPair, ApiError> {
        let refresh_token = self.inner.tokens.refresh_token();
        if refresh_token.is_empty() {
            return Err(ApiError::SessionExpired("no refresh token stored".into()));
        }
        let request = ApiRequest::post(REFRESH_TOKEN_PATH)
            .query("refreshToken", refresh_token)
            .no_auth()
            .silent();

        match self.attempt(&request, None).await {
            Ok(Reply::Payload(data)) => {
                let pair: TokenPair =
                    serde_json::from_value(data).map_err(|e| ApiError::decode(e.to_string()))?;
                if pair.access_token.is_empty() {
                    return Err(ApiError::decode("refresh returned an empty access token"));
                }
                Ok(pair)
            }
            Ok(Reply::Blob(_)) => Err(ApiError::decode("unexpected raw refresh response")),
            Err(Failure::Error(err)) => Err(err),
            Err(Failure::AccessTokenInvalid(message) | Failure::RefreshTokenInvalid(message)) => {
                Err(ApiError::SessionExpired(message))
            }
        }
    }

    /// Clears the local session, points the user at the sign-in route and
    /// returns the error the original call rejects with.
    fn expire_session(&self, message: String) -> ApiError {
        let inner = &self.inner;
        inner.teardown.run();

        let location = inner.navigator.current_location();
        let redirect = login_redirect(&inner.login_route, &location);
        tracing::info!(%redirect, "Session expired");

        inner.events.publish(ClientEvent::SessionExpired {
            redirect: redirect.clone(),
        });
        inner.events.notify(NoticeLevel::Warning, SESSION_EXPIRED_NOTICE);

        let on_login_page = location.split('?').next() == Some(inner.login_route.as_str());
        if !on_login_page {
            inner.navigator.navigate(&redirect);
        }

        let message = if message.is_empty() {
            SESSION_EXPIRED_NOTICE.to_string()
        } else {
            message
        };
        ApiError::SessionExpired(message)
    }

    fn report(&self, request: &ApiRequest, err: ApiError) -> ApiError {
        tracing::warn!(
            method = %request.method(),
            path = request.path(),
            code = err.code(),
            category = %err.category(),
            error = %err,
            "Request failed"
        );
        if request.notify_errors {
            self.inner.events.notify(NoticeLevel::Error, err.message());
        }
        err
    }

    fn bearer_for(&self, request: &ApiRequest) -> Option<String> {
        match request.auth {
            AuthMode::Bearer => {
                let token = self.inner.tokens.access_token();
                (!token.is_empty()).then_some(token)
            }
            AuthMode::NoAuth => None,
        }
    }

    async fn attempt(&self, request: &ApiRequest, token: Option<&str>) -> Result<Reply, Failure> {
        let url = self
            .inner
            .base_url
            .join(request.relative_path())
            .map_err(|e| ApiError::invalid_request(format!("{}: {e}", request.path())))?;

        let mut builder = self.inner.http.request(request.method().clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Form(fields) => builder.form(fields),
        };
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!(method = %request.method(), path = request.path(), "Dispatching request");
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;
        let status = response.status();

        if request.response == ResponseKind::Blob && status.is_success() {
            return Ok(Reply::Blob(read_blob(response).await?));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        match serde_json::from_slice::<ApiEnvelope>(&body) {
            Ok(envelope) => match self.inner.codes.classify(envelope) {
                Outcome::Success(data) if status.is_success() => Ok(Reply::Payload(data)),
                Outcome::Success(_) => Err(ApiError::http(status.as_u16(), error_text(status, &[])).into()),
                Outcome::AccessTokenInvalid(message) => Err(Failure::AccessTokenInvalid(message)),
                Outcome::RefreshTokenInvalid(message) => Err(Failure::RefreshTokenInvalid(message)),
                Outcome::Captcha { code, message } => Err(ApiError::Captcha { code, message }.into()),
                Outcome::Business { code, message } => {
                    Err(ApiError::Business { code, message }.into())
                }
            },
            Err(_) if !status.is_success() => {
                Err(ApiError::http(status.as_u16(), error_text(status, &body)).into())
            }
            Err(e) => Err(ApiError::decode(format!("response is not an envelope: {e}")).into()),
        }
    }
}

async fn read_blob(response: reqwest::Response) -> Result<BlobResponse, ApiError> {
    let status = response.status().as_u16();
    let headers = response.headers();
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let file_name = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(super::request::disposition_file_name);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::network(e.to_string()))?;
    Ok(BlobResponse {
        status,
        content_type,
        file_name,
        bytes: bytes.to_vec(),
    })
}

fn error_text(status: StatusCode, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return status.canonical_reason().unwrap_or_default().to_string();
    }
    text.chars().take(MAX_ERROR_BODY).collect()
}
