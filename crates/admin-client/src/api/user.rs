use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

pub const CURRENT_USER_PATH: &str = "users/me";

/// Profile of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub user_id: Option<u64>,
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Button-level permission strings, e.g. `sys:user:add`.
    #[serde(default)]
    pub perms: Vec<String>,
}

impl UserInfo {
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}

impl ApiClient {
    pub async fn current_user(&self) -> Result<UserInfo, ApiError> {
        self.send(ApiRequest::get(CURRENT_USER_PATH)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_wire_shape() {
        let user: UserInfo = serde_json::from_value(serde_json::json!({
            "userId": 2,
            "username": "admin",
            "nickname": "System Admin",
            "roles": ["ADMIN"],
            "perms": ["sys:user:add", "sys:dict:edit"]
        }))
        .unwrap();
        assert_eq!(user.user_id, Some(2));
        assert_eq!(user.display_name(), "System Admin");
        assert_eq!(user.perms.len(), 2);
        assert_eq!(user.avatar, None);
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let user = UserInfo {
            username: "root".into(),
            nickname: Some(String::new()),
            ..UserInfo::default()
        };
        assert_eq!(user.display_name(), "root");
    }
}
