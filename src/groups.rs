//! Group membership gateway.
//!
//! Membership of the restricted group is the ban itself; the group system
//! behind this trait owns the membership storage.

use crate::error::GatewayError;
use async_trait::async_trait;

/// Conventional name of the restricted group.
pub const BANNED_USERS: &str = "banned-users";

/// Conventional system groups, restricted group included.
pub const DEFAULT_SYSTEM_GROUPS: &[&str] = &[
    "registered-users",
    "verified-users",
    "unverified-users",
    BANNED_USERS,
    "administrators",
    "Global Moderators",
    "guests",
    "spiders",
];

/// Access to the external group system.
#[async_trait]
pub trait GroupGateway: Send + Sync {
    /// Add `uid` to every group in `groups`.
    async fn join(&self, groups: &[&str], uid: &str) -> Result<(), GatewayError>;

    /// Remove `uid` from every group in `groups`.
    async fn leave(&self, groups: &[&str], uid: &str) -> Result<(), GatewayError>;

    /// Whether `uid` is a member of `group`.
    async fn is_member(&self, uid: &str, group: &str) -> Result<bool, GatewayError>;

    /// Membership of each of `uids` in `group`, in input order.
    async fn is_members(&self, uids: &[&str], group: &str) -> Result<Vec<bool>, GatewayError>;

    /// Names of the baseline role-granting groups.
    fn system_groups(&self) -> Vec<String>;

    /// Name of the group whose membership means "banned".
    fn restricted_group(&self) -> &str;
}

/// System groups a principal leaves when banned: all but the restricted one.
pub fn groups_left_on_ban(system_groups: &[String], restricted: &str) -> Vec<String> {
    system_groups
        .iter()
        .filter(|group| group.as_str() != restricted)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_left_on_ban_keeps_order() {
        let system: Vec<String> = DEFAULT_SYSTEM_GROUPS.iter().map(|g| g.to_string()).collect();
        let left = groups_left_on_ban(&system, BANNED_USERS);
        assert_eq!(left.len(), DEFAULT_SYSTEM_GROUPS.len() - 1);
        assert!(!left.iter().any(|g| g == BANNED_USERS));
        assert_eq!(left[0], "registered-users");
        assert_eq!(left[3], "administrators");
    }

    #[test]
    fn test_groups_left_on_ban_without_restricted() {
        let system = vec!["registered-users".to_string()];
        assert_eq!(groups_left_on_ban(&system, BANNED_USERS), system);
    }
}
