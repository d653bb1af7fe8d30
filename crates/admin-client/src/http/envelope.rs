use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::ApiConfig;

/// `{code, data, msg}` wrapper every endpoint answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Result of inspecting an envelope's business code.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    AccessTokenInvalid(String),
    RefreshTokenInvalid(String),
    Captcha { code: String, message: String },
    Business { code: String, message: String },
}

/// Business codes the pipeline reacts to.
#[derive(Debug, Clone)]
pub struct BusinessCodes {
    pub success: String,
    pub access_token_invalid: String,
    pub refresh_token_invalid: String,
    pub captcha: Vec<String>,
}

impl From<&ApiConfig> for BusinessCodes {
    fn from(api: &ApiConfig) -> Self {
        Self {
            success: api.success_code.clone(),
            access_token_invalid: api.access_token_invalid_code.clone(),
            refresh_token_invalid: api.refresh_token_invalid_code.clone(),
            captcha: api.captcha_error_codes.clone(),
        }
    }
}

impl Default for BusinessCodes {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

impl BusinessCodes {
    pub fn classify(&self, envelope: ApiEnvelope) -> Outcome {
        let message = envelope.msg.unwrap_or_default();
        let code = envelope.code;
        if code == self.success {
            Outcome::Success(envelope.data.unwrap_or(Value::Null))
        } else if code == self.access_token_invalid {
            Outcome::AccessTokenInvalid(message)
        } else if code == self.refresh_token_invalid {
            Outcome::RefreshTokenInvalid(message)
        } else if self.captcha.contains(&code) {
            Outcome::Captcha { code, message }
        } else {
            Outcome::Business { code, message }
        }
    }
}

/// Accepts `"00000"` as well as `200` on the wire.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
