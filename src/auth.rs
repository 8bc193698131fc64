// src/auth.rs

//! Request-scoped caller identity
//!
//! Resolved once per request by the surrounding application and passed to
//! every operation that needs it. Nothing here reads ambient session state.

use crate::error::{Error, Result};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" | "super_admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            _ => Err(format!("Invalid role: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Option<i64>,
    pub role: Role,
    pub is_authenticated: bool,
}

impl AuthContext {
    pub fn authenticated(user_id: i64, role: Role) -> Self {
        Self {
            user_id: Some(user_id),
            role,
            is_authenticated: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Viewer,
            is_authenticated: false,
        }
    }

    /// Identity used by the command-line front end
    pub fn local_admin() -> Self {
        Self::authenticated(0, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated && self.role == Role::Admin
    }

    /// Fail with `Unauthorized` unless the caller is a logged-in admin
    pub fn require_admin(&self) -> Result<()> {
        if !self.is_authenticated {
            return Err(Error::Unauthorized("not logged in".to_string()));
        }
        if self.role != Role::Admin {
            return Err(Error::Unauthorized(
                "package management requires the admin role".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin() {
        assert!(AuthContext::local_admin().require_admin().is_ok());
        assert!(matches!(
            AuthContext::anonymous().require_admin(),
            Err(Error::Unauthorized(_))
        ));
        assert!(
            AuthContext::authenticated(7, Role::Editor)
                .require_admin()
                .is_err()
        );
    }

    #[test]
    fn test_unauthenticated_admin_role_is_not_admin() {
        let ctx = AuthContext {
            user_id: Some(1),
            role: Role::Admin,
            is_authenticated: false,
        };
        assert!(!ctx.is_admin());
        assert!(ctx.require_admin().is_err());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("super_admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }
}
