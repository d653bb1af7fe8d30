use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::api::user::UserInfo;
use crate::session::SessionResource;

/// Role that implicitly holds every permission.
pub const ROOT_ROLE: &str = "ROOT";

#[derive(Debug, Default)]
struct Grants {
    roles: HashSet<String>,
    perms: HashSet<String>,
}

/// Roles and button permissions of the signed-in user.
#[derive(Debug, Clone, Default)]
pub struct PermissionCache {
    grants: Arc<RwLock<Grants>>,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cached grants with those of `user`.
    pub fn load(&self, user: &UserInfo) {
        if let Ok(mut grants) = self.grants.write() {
            grants.roles = user.roles.iter().cloned().collect();
            grants.perms = user.perms.iter().cloned().collect();
            tracing::debug!(
                roles = grants.roles.len(),
                perms = grants.perms.len(),
                "Loaded permissions"
            );
        }
    }

    pub fn clear(&self) {
        if let Ok(mut grants) = self.grants.write() {
            grants.roles.clear();
            grants.perms.clear();
        }
    }

    pub fn is_root(&self) -> bool {
        self.has_role(ROOT_ROLE)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.grants
            .read()
            .map(|g| g.roles.contains(role))
            .unwrap_or(false)
    }

    pub fn has_perm(&self, perm: &str) -> bool {
        self.grants
            .read()
            .map(|g| g.roles.contains(ROOT_ROLE) || g.perms.contains(perm))
            .unwrap_or(false)
    }

    pub fn has_any_perm<S: AsRef<str>>(&self, perms: &[S]) -> bool {
        self.grants
            .read()
            .map(|g| {
                g.roles.contains(ROOT_ROLE) || perms.iter().any(|p| g.perms.contains(p.as_ref()))
            })
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.grants
            .read()
            .map(|g| g.roles.is_empty() && g.perms.is_empty())
            .unwrap_or(true)
    }

    /// Teardown handle for this cache.
    pub fn resource(&self) -> Arc<dyn SessionResource> {
        self.grants.clone()
    }
}

impl SessionResource for RwLock<Grants> {
    fn clear_for_logout(&self) {
        if let Ok(mut grants) = self.write() {
            *grants = Grants::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: &[&str], perms: &[&str]) -> UserInfo {
        UserInfo {
            username: "admin".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            perms: perms.iter().map(|p| p.to_string()).collect(),
            ..UserInfo::default()
        }
    }

    #[test]
    fn test_perm_checks() {
        let cache = PermissionCache::new();
        cache.load(&user(&["ADMIN"], &["sys:user:add", "sys:dict:edit"]));

        assert!(cache.has_role("ADMIN"));
        assert!(!cache.is_root());
        assert!(cache.has_perm("sys:user:add"));
        assert!(!cache.has_perm("sys:user:delete"));
        assert!(cache.has_any_perm(&["sys:user:delete", "sys:dict:edit"]));
        assert!(!cache.has_any_perm::<&str>(&[]));
    }

    #[test]
    fn test_root_grants_everything() {
        let cache = PermissionCache::new();
        cache.load(&user(&[ROOT_ROLE], &[]));
        assert!(cache.has_perm("anything:at:all"));
        assert!(cache.has_any_perm(&["x"]));
    }

    #[test]
    fn test_teardown_clears_grants() {
        let cache = PermissionCache::new();
        cache.load(&user(&["ADMIN"], &["sys:user:add"]));
        cache.resource().clear_for_logout();
        assert!(cache.is_empty());
        assert!(!cache.has_perm("sys:user:add"));
    }
}
