use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};
use crate::token::TokenPair;

pub const LOGIN_PATH: &str = "auth/login";
pub const LOGOUT_PATH: &str = "auth/logout";
pub const CAPTCHA_PATH: &str = "auth/captcha";

/// Credentials posted form-encoded to the login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub captcha_key: Option<String>,
    pub captcha_code: Option<String>,
    pub remember_me: bool,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    #[must_use]
    pub fn captcha(mut self, key: impl Into<String>, code: impl Into<String>) -> Self {
        self.captcha_key = Some(key.into());
        self.captcha_code = Some(code.into());
        self
    }

    pub(crate) fn to_form(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("username".to_string(), self.username.clone()),
            ("password".to_string(), self.password.clone()),
        ];
        if let Some(key) = &self.captcha_key {
            fields.push(("captchaKey".to_string(), key.clone()));
        }
        if let Some(code) = &self.captcha_code {
            fields.push(("captchaCode".to_string(), code.clone()));
        }
        if self.remember_me {
            fields.push(("rememberMe".to_string(), "true".to_string()));
        }
        fields
    }
}

/// Captcha challenge: the key to echo back and a base64 data URL image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaInfo {
    pub captcha_key: String,
    pub captcha_base64: String,
}

impl ApiClient {
    /// Exchanges credentials for a token pair. Tokens are not stored here.
    pub async fn login(&self, form: &LoginForm) -> Result<TokenPair, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).form(form.to_form()).no_auth();
        self.send(request).await
    }

    pub async fn captcha(&self) -> Result<CaptchaInfo, ApiError> {
        self.send(ApiRequest::get(CAPTCHA_PATH).no_auth()).await
    }

    /// Invalidates the session server-side. Failures are not notified.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.send_unit(ApiRequest::delete(LOGOUT_PATH).silent()).await
    }
}
