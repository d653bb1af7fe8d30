use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// How the `Authorization` header is composed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// `Authorization: Bearer <access token>` when a token is stored.
    #[default]
    Bearer,
    /// No `Authorization` header at all.
    NoAuth,
}

/// What the caller gets back on success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseKind {
    /// Envelope is unwrapped; only `data` is returned.
    #[default]
    Envelope,
    /// The raw response is returned untouched.
    Blob,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// Description of one outbound call. Cloned for replays after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: RequestBody,
    pub(crate) auth: AuthMode,
    pub(crate) response: ResponseKind,
    pub(crate) notify_errors: bool,
}

impl ApiRequest {
    /// `path` is relative to the configured base URL; a leading slash is ignored.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            auth: AuthMode::Bearer,
            response: ResponseKind::Envelope,
            notify_errors: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Adds `key=value` only when `value` is present.
    #[must_use]
    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Serializes `body` as the JSON payload.
    pub fn json_of<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::invalid_request(format!("request body: {e}")))?;
        Ok(self.json(value))
    }

    #[must_use]
    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    #[must_use]
    pub fn no_auth(mut self) -> Self {
        self.auth = AuthMode::NoAuth;
        self
    }

    #[must_use]
    pub fn blob(mut self) -> Self {
        self.response = ResponseKind::Blob;
        self
    }

    /// Failures are still returned but no notice is published for them.
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.notify_errors = false;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn auth(&self) -> AuthMode {
        self.auth
    }

    pub fn response_kind(&self) -> ResponseKind {
        self.response
    }

    pub(crate) fn relative_path(&self) -> &str {
        self.path.trim_start_matches('/')
    }
}

/// Raw response of a [`ResponseKind::Blob`] call.
#[derive(Debug, Clone)]
pub struct BlobResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Extracts the file name from a `Content-Disposition` header value.
///
/// `filename*=UTF-8''...` wins over a plain `filename=`.
pub(crate) fn disposition_file_name(header: &str) -> Option<String> {
    let mut plain = None;
    for part in header.split(';').map(str::trim) {
        if let Some(encoded) = part.strip_prefix("filename*=") {
            let value = encoded.split("''").nth(1).unwrap_or(encoded);
            if let Ok(decoded) = urlencoding::decode(value.trim_matches('"')) {
                return Some(decoded.into_owned());
            }
        } else if let Some(value) = part.strip_prefix("filename=") {
            plain = Some(value.trim_matches('"').to_string());
        }
    }
    plain
}
