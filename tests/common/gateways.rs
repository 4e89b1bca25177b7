//! In-memory group, privilege and notification gateways.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use userbans::groups::{BANNED_USERS, DEFAULT_SYSTEM_GROUPS};
use userbans::{
    BanNotice, GatewayError, GroupGateway, Notifier, NotifyError, PrivilegeGateway,
};

/// Group system kept in a map of group name to members.
///
/// Every gateway call is recorded so tests can assert on what was (not) done.
#[derive(Default)]
pub struct MemoryGroups {
    members: Mutex<HashMap<String, BTreeSet<String>>>,
    calls: Mutex<Vec<String>>,
    failing: AtomicBool,
    truncating: AtomicBool,
}

impl MemoryGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, group: &str, uid: &str) {
        self.members
            .lock()
            .entry(group.to_string())
            .or_default()
            .insert(uid.to_string());
    }

    pub fn has_member(&self, group: &str, uid: &str) -> bool {
        self.members
            .lock()
            .get(group)
            .is_some_and(|members| members.contains(uid))
    }

    /// Groups `uid` belongs to, sorted.
    pub fn groups_of(&self, uid: &str) -> Vec<String> {
        let members = self.members.lock();
        let mut groups: Vec<String> = members
            .iter()
            .filter(|(_, members)| members.contains(uid))
            .map(|(group, _)| group.clone())
            .collect();
        groups.sort();
        groups
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Make every subsequent call fail with `GatewayError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make bulk membership answers drop their last entry.
    pub fn set_truncating(&self, truncating: bool) {
        self.truncating.store(truncating, Ordering::SeqCst);
    }

    fn record(&self, call: String) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("group store offline".into()));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

#[async_trait]
impl GroupGateway for MemoryGroups {
    async fn join(&self, groups: &[&str], uid: &str) -> Result<(), GatewayError> {
        self.record(format!("join {} {}", groups.join(","), uid))?;
        for group in groups {
            self.add_member(group, uid);
        }
        Ok(())
    }

    async fn leave(&self, groups: &[&str], uid: &str) -> Result<(), GatewayError> {
        self.record(format!("leave {} {}", groups.join(","), uid))?;
        let mut members = self.members.lock();
        for group in groups {
            if let Some(set) = members.get_mut(*group) {
                set.remove(uid);
            }
        }
        Ok(())
    }

    async fn is_member(&self, uid: &str, group: &str) -> Result<bool, GatewayError> {
        self.record(format!("is_member {} {}", uid, group))?;
        Ok(self.has_member(group, uid))
    }

    async fn is_members(&self, uids: &[&str], group: &str) -> Result<Vec<bool>, GatewayError> {
        self.record(format!("is_members {} {}", uids.join(","), group))?;
        let mut answers: Vec<bool> = uids.iter().map(|uid| self.has_member(group, uid)).collect();
        if self.truncating.load(Ordering::SeqCst) {
            answers.pop();
        }
        Ok(answers)
    }

    fn system_groups(&self) -> Vec<String> {
        DEFAULT_SYSTEM_GROUPS.iter().map(|g| g.to_string()).collect()
    }

    fn restricted_group(&self) -> &str {
        BANNED_USERS
    }
}

/// Privilege system holding explicit (privilege, group) grants.
#[derive(Default)]
pub struct MemoryPrivileges {
    grants: Mutex<HashSet<(String, String)>>,
}

impl MemoryPrivileges {
    pub fn grant(&self, privilege: &str, group: &str) {
        self.grants
            .lock()
            .insert((privilege.to_string(), group.to_string()));
    }
}

#[async_trait]
impl PrivilegeGateway for MemoryPrivileges {
    async fn can_group(&self, privilege: &str, group: &str) -> Result<bool, GatewayError> {
        Ok(self
            .grants
            .lock()
            .contains(&(privilege.to_string(), group.to_string())))
    }
}

/// Notifier that keeps every notice it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String, BanNotice)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// `(template, uid, notice)` of every attempted send, failed ones included.
    pub fn sent(&self) -> Vec<(String, String, BanNotice)> {
        self.sent.lock().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, template: &str, uid: &str, notice: &BanNotice) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .push((template.to_string(), uid.to_string(), notice.clone()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("smtp connection refused".into()));
        }
        Ok(())
    }
}
