//! Group allow-lists and the route access table
//!
//! Authorization is coarse: a route either needs nothing, a valid token, or a
//! token whose user belongs to one of a fixed set of groups. Which routes need
//! what depends on the configured [`AccessMode`].

use hyper::Method;
use serde::Serialize;
use std::fmt;

use crate::config::{AccessMode, Args};

/// What a route requires from the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// No token needed
    Public,
    /// Any valid token
    Authenticated,
    /// Token whose user is in the member allow-list
    Member,
    /// Token whose user is in the admin allow-list
    Admin,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Public => write!(f, "PUBLIC"),
            Access::Authenticated => write!(f, "AUTHENTICATED"),
            Access::Member => write!(f, "MEMBER"),
            Access::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Fixed set of permitted group ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAllowList(Vec<i64>);

impl GroupAllowList {
    pub fn new(groups: impl IntoIterator<Item = i64>) -> Self {
        Self(groups.into_iter().collect())
    }

    /// Check a caller's group against the list
    pub fn permits(&self, group: i64) -> bool {
        self.0.contains(&group)
    }

    pub fn groups(&self) -> &[i64] {
        &self.0
    }
}

/// The route table mode plus the two configured allow-lists
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    pub mode: AccessMode,
    pub admin: GroupAllowList,
    pub member: GroupAllowList,
}

impl AccessPolicy {
    pub fn from_args(args: &Args) -> Self {
        Self {
            mode: args.access_mode,
            admin: GroupAllowList::new(args.admin_groups.iter().copied()),
            member: GroupAllowList::new(args.member_groups.iter().copied()),
        }
    }

    /// Access a route needs under this policy's mode
    pub fn required_access(&self, method: &Method, segments: &[&str]) -> Access {
        required_access(self.mode, method, segments)
    }

    /// Allow-list for a group-restricted access level
    pub fn allow_list(&self, access: Access) -> Option<&GroupAllowList> {
        match access {
            Access::Admin => Some(&self.admin),
            Access::Member => Some(&self.member),
            Access::Public | Access::Authenticated => None,
        }
    }

    /// Whether a caller in `group` may use a route needing `access`
    pub fn is_allowed(&self, access: Access, group: i64) -> bool {
        match self.allow_list(access) {
            Some(list) => list.permits(group),
            None => true,
        }
    }
}

/// Access required by a route, keyed by mode, method and path segments
pub fn required_access(mode: AccessMode, method: &Method, segments: &[&str]) -> Access {
    match mode {
        AccessMode::Open => open_access(method, segments),
        AccessMode::Groups => group_access(method, segments),
    }
}

fn open_access(method: &Method, segments: &[&str]) -> Access {
    match (method, segments) {
        (&Method::GET, ["usuarios", "me"]) | (&Method::HEAD, ["usuarios", "me"]) => {
            Access::Authenticated
        }
        _ => Access::Public,
    }
}

fn group_access(method: &Method, segments: &[&str]) -> Access {
    let resource = segments.first().copied().unwrap_or("");

    if *method == Method::GET || *method == Method::HEAD {
        return match resource {
            "usuarios" => Access::Authenticated,
            _ => Access::Public,
        };
    }

    match (method, segments) {
        (&Method::POST, ["login"]) | (&Method::POST, ["usuarios"]) => Access::Public,
        (&Method::OPTIONS, _) => Access::Public,
        _ => match resource {
            "participacoes" | "cultivos" | "colheitas" => Access::Member,
            _ => Access::Admin,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(method: Method, segments: &[&str]) -> Access {
        required_access(AccessMode::Groups, &method, segments)
    }

    fn open(method: Method, segments: &[&str]) -> Access {
        required_access(AccessMode::Open, &method, segments)
    }

    fn policy() -> AccessPolicy {
        AccessPolicy {
            mode: AccessMode::Groups,
            admin: GroupAllowList::new([1]),
            member: GroupAllowList::new([1, 2]),
        }
    }

    #[test]
    fn test_public_routes() {
        assert_eq!(groups(Method::POST, &["login"]), Access::Public);
        assert_eq!(groups(Method::POST, &["usuarios"]), Access::Public);
        assert_eq!(groups(Method::GET, &["health"]), Access::Public);
        assert_eq!(groups(Method::GET, &["cultivos"]), Access::Public);
        assert_eq!(groups(Method::OPTIONS, &["hortas"]), Access::Public);
    }

    #[test]
    fn test_user_reads_need_token() {
        assert_eq!(groups(Method::GET, &["usuarios"]), Access::Authenticated);
        assert_eq!(groups(Method::GET, &["usuarios", "me"]), Access::Authenticated);
    }

    #[test]
    fn test_workflow_routes_need_member() {
        assert_eq!(groups(Method::POST, &["cultivos"]), Access::Member);
        assert_eq!(groups(Method::DELETE, &["participacoes", "u", "1"]), Access::Member);
        assert_eq!(groups(Method::PUT, &["colheitas", "3"]), Access::Member);
    }

    #[test]
    fn test_everything_else_needs_admin() {
        assert_eq!(groups(Method::POST, &["hortas"]), Access::Admin);
        assert_eq!(groups(Method::DELETE, &["usuarios", "abc"]), Access::Admin);
        assert_eq!(groups(Method::PUT, &["grupos", "1"]), Access::Admin);
    }

    #[test]
    fn test_open_mode_only_guards_own_profile() {
        assert_eq!(open(Method::GET, &["usuarios", "me"]), Access::Authenticated);
        assert_eq!(open(Method::GET, &["usuarios"]), Access::Public);
        assert_eq!(open(Method::GET, &["usuarios", "abc"]), Access::Public);
        assert_eq!(open(Method::POST, &["hortas"]), Access::Public);
        assert_eq!(open(Method::PUT, &["produtos", "1"]), Access::Public);
        assert_eq!(open(Method::DELETE, &["colheitas", "3"]), Access::Public);
    }

    #[test]
    fn test_policy_follows_its_mode() {
        let mut policy = policy();
        assert_eq!(
            policy.required_access(&Method::POST, &["hortas"]),
            Access::Admin
        );
        policy.mode = AccessMode::Open;
        assert_eq!(
            policy.required_access(&Method::POST, &["hortas"]),
            Access::Public
        );
    }

    #[test]
    fn test_allow_lists() {
        let policy = policy();
        assert!(policy.is_allowed(Access::Admin, 1));
        assert!(!policy.is_allowed(Access::Admin, 2));
        assert!(policy.is_allowed(Access::Member, 2));
        assert!(!policy.is_allowed(Access::Member, 7));
        assert!(policy.is_allowed(Access::Authenticated, 7));
    }
}
