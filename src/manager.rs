//! Ban lifecycle manager.
//!
//! Owns the ban/unban write sequences and the read-side evaluation of ban
//! state. Restricted-group membership is the source of truth for "banned";
//! the cached expiry field and the global indexes are kept in step on every
//! write and reconciled lazily on read (or by [`BanManager::sweep_expired`]).
//!
//! None of the multi-store sequences are transactional. A failure midway
//! propagates to the caller and leaves the steps already applied in place;
//! re-running `ban` or `unban` converges.

use crate::bans::{
    BanRecord, BanRepository, BanState, UserBanFields, parse_expiry, parse_leading_int,
};
use crate::clock::Clock;
use crate::config::BanConfig;
use crate::db::{FieldMap, ObjectStore, SortedSetStore};
use crate::error::BanResult;
use crate::groups::{GroupGateway, groups_left_on_ban};
use crate::notify::{BanNotice, NotificationStatus, Notifier};
use crate::privileges::PrivilegeGateway;
use crate::profile::{BANNED_EXPIRE, EMAIL_CONFIRMED, ProfileFields, USERNAME};
use crate::telemetry;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, warn};

/// Result of a successful ban.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanOutcome {
    /// The record that was written.
    pub record: BanRecord,
    /// Whether the ban notice went out. Never affects the ban itself.
    pub notification: NotificationStatus,
}

/// Parameters for creating a new BanManager.
pub struct BanManagerParams {
    pub config: BanConfig,
    pub sets: Arc<dyn SortedSetStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub groups: Arc<dyn GroupGateway>,
    pub privileges: Arc<dyn PrivilegeGateway>,
    pub profiles: Arc<dyn ProfileFields>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

/// Ban lifecycle manager.
pub struct BanManager {
    config: BanConfig,
    sets: Arc<dyn SortedSetStore>,
    objects: Arc<dyn ObjectStore>,
    groups: Arc<dyn GroupGateway>,
    privileges: Arc<dyn PrivilegeGateway>,
    profiles: Arc<dyn ProfileFields>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl BanManager {
    pub fn new(params: BanManagerParams) -> Self {
        let BanManagerParams {
            config,
            sets,
            objects,
            groups,
            privileges,
            profiles,
            notifier,
            clock,
        } = params;

        Self {
            config,
            sets,
            objects,
            groups,
            privileges,
            profiles,
            notifier,
            clock,
        }
    }

    pub fn config(&self) -> &BanConfig {
        &self.config
    }

    fn bans(&self) -> BanRepository<'_> {
        BanRepository::new(self.sets.as_ref(), self.objects.as_ref())
    }

    // ========== Ban ==========

    /// Ban `uid` until the instant `until` (Unix ms); `0` or a past instant
    /// bans permanently.
    ///
    /// Steps run in order, each awaited: leave the other system groups, join
    /// the restricted group, index the ban, append and persist the record,
    /// cache the expiry, (un)schedule expiry, then send the notice. Only the
    /// notice is best effort.
    pub async fn ban(&self, uid: &str, until: i64, reason: Option<&str>) -> BanResult<BanOutcome> {
        self.do_ban(uid, until, reason)
            .instrument(telemetry::ban_write("ban", uid))
            .await
    }

    /// Ban with an expiry supplied as text (e.g. straight from a request).
    ///
    /// Empty text bans permanently. Text without a leading integer fails with
    /// [`crate::BanError::InvalidExpiry`] before anything is written.
    pub async fn ban_with_raw_expiry(
        &self,
        uid: &str,
        until: &str,
        reason: Option<&str>,
    ) -> BanResult<BanOutcome> {
        let until = parse_expiry(until)?;
        self.ban(uid, until, reason).await
    }

    async fn do_ban(&self, uid: &str, until: i64, reason: Option<&str>) -> BanResult<BanOutcome> {
        let now = self.clock.now_ms();
        let record = BanRecord::issue(uid, now, until, reason);

        // Other system groups would keep granting their privileges while banned.
        let restricted = self.groups.restricted_group();
        let leaving = groups_left_on_ban(&self.groups.system_groups(), restricted);
        let leaving: Vec<&str> = leaving.iter().map(String::as_str).collect();
        self.groups.leave(&leaving, uid).await?;
        self.groups.join(&[restricted], uid).await?;

        let bans = self.bans();
        bans.add_to_banned_index(uid, now).await?;
        bans.append_to_timeline(&record).await?;
        bans.save_record(&record).await?;
        self.profiles
            .set_field(uid, BANNED_EXPIRE, &record.expire.to_string())
            .await?;
        if until > now {
            bans.schedule_expiry(uid, until).await?;
        } else {
            bans.clear_expiry(uid).await?;
        }

        info!(
            uid = %uid,
            expire = record.expire,
            permanent = record.is_permanent(),
            "Principal banned"
        );

        let notification = self.send_ban_notice(&record).await;
        Ok(BanOutcome {
            record,
            notification,
        })
    }

    async fn send_ban_notice(&self, record: &BanRecord) -> NotificationStatus {
        match self.deliver_ban_notice(record).await {
            Ok(()) => NotificationStatus::Sent,
            Err(e) => {
                error!(uid = %record.uid, error = %e, "Failed to send ban notice");
                NotificationStatus::Failed(e)
            }
        }
    }

    async fn deliver_ban_notice(&self, record: &BanRecord) -> Result<(), String> {
        let username = self
            .profiles
            .get_field(&record.uid, USERNAME)
            .await
            .map_err(|e| e.to_string())?;
        let notice = BanNotice::new(
            &self.config.site_title,
            username,
            record.expire,
            record.reason.as_deref().unwrap_or(""),
        );
        self.notifier
            .send(&self.config.notification_template, &record.uid, &notice)
            .await
            .map_err(|e| e.to_string())
    }

    // ========== Unban ==========

    /// Lift the ban on `uid`. See [`BanManager::unban_many`].
    pub async fn unban(&self, uid: &str) -> BanResult<()> {
        self.unban_many(&[uid]).await
    }

    /// Lift the bans on `uids`.
    ///
    /// Principals return to the registered group plus the verified or
    /// unverified group; roles held before the ban are not restored. Ban
    /// records are kept. Unbanning a principal that is not banned is a no-op
    /// apart from rewriting the same baseline state.
    pub async fn unban_many(&self, uids: &[&str]) -> BanResult<()> {
        if uids.is_empty() {
            return Ok(());
        }
        self.do_unban(uids)
            .instrument(telemetry::ban_write_many("unban", uids.len()))
            .await
    }

    async fn do_unban(&self, uids: &[&str]) -> BanResult<()> {
        self.profiles
            .set_users_field(uids, BANNED_EXPIRE, "0")
            .await?;

        let user_data = self
            .profiles
            .get_users_fields(uids, &[EMAIL_CONFIRMED])
            .await?;

        let restricted = self.groups.restricted_group();
        let empty = FieldMap::new();
        for (index, uid) in uids.iter().enumerate() {
            let fields = user_data.get(index).unwrap_or(&empty);
            let confirmed = fields
                .get(EMAIL_CONFIRMED)
                .and_then(|v| parse_leading_int(v))
                == Some(1);
            let verification_group = if confirmed {
                self.config.verified_group.as_str()
            } else {
                self.config.unverified_group.as_str()
            };

            self.groups.leave(&[restricted], uid).await?;
            self.groups
                .join(
                    &[self.config.registered_group.as_str(), verification_group],
                    uid,
                )
                .await?;
        }

        self.bans().remove_from_indexes(uids).await?;

        info!(count = uids.len(), "Principals unbanned");
        Ok(())
    }

    // ========== Expiry evaluation ==========

    /// Ban state of one principal. Never writes.
    pub async fn unban_if_expired(&self, uid: &str) -> BanResult<BanState> {
        let states = self.unban_if_expired_many(&[uid]).await?;
        Ok(states.into_iter().next().unwrap_or_default())
    }

    /// Ban state of each principal, in input order. Never writes.
    ///
    /// Detecting a lapsed ban does not lift it: `banned` stays true until
    /// [`BanManager::unban`] runs.
    pub async fn unban_if_expired_many(&self, uids: &[&str]) -> BanResult<Vec<BanState>> {
        let rows = self
            .profiles
            .get_users_fields(uids, &[BANNED_EXPIRE])
            .await?;

        let empty = FieldMap::new();
        let user_data: Vec<UserBanFields> = uids
            .iter()
            .enumerate()
            .map(|(index, uid)| {
                UserBanFields::from_field_map(uid, rows.get(index).unwrap_or(&empty))
            })
            .collect();

        self.calc_expired_from_user_data(&user_data)
            .instrument(telemetry::ban_read("unban_if_expired", uids.len()))
            .await
    }

    /// Ban state from already-loaded profile fields plus current membership.
    pub async fn calc_expired_from_user_data(
        &self,
        user_data: &[UserBanFields],
    ) -> BanResult<Vec<BanState>> {
        if user_data.is_empty() {
            return Ok(Vec::new());
        }

        let uids: Vec<&str> = user_data.iter().map(|u| u.uid.as_str()).collect();
        let banned = self
            .groups
            .is_members(&uids, self.groups.restricted_group())
            .await?;
        if banned.len() != uids.len() {
            warn!(
                expected = uids.len(),
                got = banned.len(),
                "Group gateway returned a membership answer of the wrong length"
            );
        }
        let now = self.clock.now_ms();

        Ok(user_data
            .iter()
            .enumerate()
            .map(|(index, user)| {
                BanState::evaluate(
                    banned.get(index).copied().unwrap_or(false),
                    user.banned_expire,
                    now,
                )
            })
            .collect())
    }

    // ========== Queries ==========

    /// Whether `uid` is currently banned.
    pub async fn is_banned(&self, uid: &str) -> BanResult<bool> {
        Ok(self.unban_if_expired(uid).await?.banned)
    }

    /// Whether each of `uids` is currently banned, in input order.
    pub async fn is_banned_many(&self, uids: &[&str]) -> BanResult<Vec<bool>> {
        Ok(self
            .unban_if_expired_many(uids)
            .await?
            .into_iter()
            .map(|state| state.banned)
            .collect())
    }

    /// Whether `uid` may log in.
    ///
    /// Unbanned principals always may. A banned principal may when the
    /// restricted group holds the login privilege; failing that, when the
    /// principal individually holds it.
    pub async fn can_login_if_banned(&self, uid: &str) -> BanResult<bool> {
        let state = self.unban_if_expired(uid).await?;
        if !state.banned {
            return Ok(true);
        }

        // Group privilege overshadows individual one
        let restricted = self.groups.restricted_group();
        if self
            .privileges
            .can_group(&self.config.login_privilege, restricted)
            .await?
        {
            debug!(uid = %uid, "Banned principal allowed to log in by group privilege");
            return Ok(true);
        }

        let allowed = self
            .groups
            .is_member(uid, &self.config.login_override_group)
            .await?;
        debug!(uid = %uid, allowed, "Checked individual login privilege of banned principal");
        Ok(allowed)
    }

    /// The principals in `uids` that are not banned, order preserved.
    pub async fn filter_banned(&self, uids: &[&str]) -> BanResult<Vec<String>> {
        let banned = self.is_banned_many(uids).await?;
        Ok(uids
            .iter()
            .zip(banned)
            .filter(|(_, banned)| !*banned)
            .map(|(uid, _)| uid.to_string())
            .collect())
    }

    /// Reason of the principal's most recent ban, or `""`.
    ///
    /// Principals without a positive numeric id have no ban history.
    pub async fn get_reason(&self, uid: &str) -> BanResult<String> {
        if !parse_leading_int(uid).is_some_and(|id| id > 0) {
            return Ok(String::new());
        }

        let bans = self.bans();
        let Some(key) = bans.latest_ban_key(uid).await? else {
            return Ok(String::new());
        };
        Ok(bans
            .get_record(&key)
            .await?
            .and_then(|record| record.reason)
            .unwrap_or_default())
    }

    /// The principal's `limit` most recent ban records, newest first.
    pub async fn ban_history(&self, uid: &str, limit: usize) -> BanResult<Vec<BanRecord>> {
        Ok(self.bans().recent_records(uid, limit).await?)
    }

    /// Banned principals at positions `start..=stop`, most recently banned
    /// first. A negative `stop` reads to the end.
    pub async fn banned_principals(&self, start: i64, stop: i64) -> BanResult<Vec<String>> {
        Ok(self.bans().banned_page(start, stop).await?)
    }

    // ========== Expiry enforcement ==========

    /// Lift up to `limit` bans whose expiry has passed.
    ///
    /// Reads candidates from the expiry index and re-checks each through
    /// [`BanManager::unban_if_expired_many`]. Index entries that no longer
    /// match the principal's state are repaired instead. Returns the
    /// principals that were unbanned.
    pub async fn sweep_expired(&self, limit: usize) -> BanResult<Vec<String>> {
        self.do_sweep(limit)
            .instrument(telemetry::sweep(limit))
            .await
    }

    async fn do_sweep(&self, limit: usize) -> BanResult<Vec<String>> {
        let now = self.clock.now_ms();
        let bans = self.bans();
        let due = bans.due_for_expiry(now, limit).await?;
        if due.is_empty() {
            return Ok(Vec::new());
        }

        let due: Vec<&str> = due.iter().map(String::as_str).collect();
        let states = self.unban_if_expired_many(&due).await?;

        let mut expired = Vec::new();
        let mut stale = Vec::new();
        for (uid, state) in due.iter().zip(&states) {
            if !state.banned {
                stale.push(*uid);
            } else if state.ban_expired {
                expired.push(*uid);
            } else if state.expire == 0 {
                // Banned permanently since this entry was written.
                bans.clear_expiry(uid).await?;
            } else {
                bans.schedule_expiry(uid, state.expire).await?;
            }
        }

        if !stale.is_empty() {
            warn!(count = stale.len(), "Removing index entries of principals no longer banned");
            bans.remove_from_indexes(&stale).await?;
        }

        self.unban_many(&expired).await?;
        if !expired.is_empty() {
            info!(count = expired.len(), "Lifted expired bans");
        }

        Ok(expired.into_iter().map(str::to_string).collect())
    }
}
