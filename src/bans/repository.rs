//! Typed access to ban records and ban indexes.
//!
//! Layout:
//! - `users:banned`: sorted set of banned principals, scored by issue time
//! - `users:banned:expire`: sorted set of non-permanent bans, scored by expiry
//! - `uid:{uid}:bans:timestamp`: sorted set of record keys, scored by issue time
//! - `uid:{uid}:ban:{timestamp}`: the record object

use super::models::BanRecord;
use crate::db::{ObjectStore, SortedSetStore, StoreError};

/// Global index of banned principals.
pub const BANNED_INDEX: &str = "users:banned";
/// Global index of non-permanent bans by expiry.
pub const EXPIRY_INDEX: &str = "users:banned:expire";

/// Key of a principal's ban timeline.
pub fn timeline_key(uid: &str) -> String {
    format!("uid:{}:bans:timestamp", uid)
}

/// Key of the record of a ban issued at `timestamp`.
pub fn ban_key(uid: &str, timestamp: i64) -> String {
    format!("uid:{}:ban:{}", uid, timestamp)
}

/// Repository for ban record operations.
pub struct BanRepository<'a> {
    sets: &'a dyn SortedSetStore,
    objects: &'a dyn ObjectStore,
}

impl<'a> BanRepository<'a> {
    /// Create a new ban repository.
    pub fn new(sets: &'a dyn SortedSetStore, objects: &'a dyn ObjectStore) -> Self {
        Self { sets, objects }
    }

    // ========== Write path ==========

    /// Record `uid` in the global banned index.
    pub async fn add_to_banned_index(&self, uid: &str, now: i64) -> Result<(), StoreError> {
        self.sets.sorted_set_add(BANNED_INDEX, now, uid).await
    }

    /// Append a record key to the principal's timeline.
    pub async fn append_to_timeline(&self, record: &BanRecord) -> Result<(), StoreError> {
        self.sets
            .sorted_set_add(&timeline_key(&record.uid), record.timestamp, &record.key())
            .await
    }

    /// Persist the full record.
    pub async fn save_record(&self, record: &BanRecord) -> Result<(), StoreError> {
        self.objects
            .set_object(&record.key(), &record.to_fields())
            .await
    }

    /// Schedule the principal's ban to lapse at `until`.
    pub async fn schedule_expiry(&self, uid: &str, until: i64) -> Result<(), StoreError> {
        self.sets.sorted_set_add(EXPIRY_INDEX, until, uid).await
    }

    /// Drop any expiry entry for the principal.
    pub async fn clear_expiry(&self, uid: &str) -> Result<(), StoreError> {
        self.sets.sorted_set_remove(&[EXPIRY_INDEX], &[uid]).await
    }

    /// Remove principals from both global indexes in one batch.
    pub async fn remove_from_indexes(&self, uids: &[&str]) -> Result<(), StoreError> {
        self.sets
            .sorted_set_remove(&[BANNED_INDEX, EXPIRY_INDEX], uids)
            .await
    }

    // ========== Read path ==========

    /// Key of the principal's most recent ban record.
    pub async fn latest_ban_key(&self, uid: &str) -> Result<Option<String>, StoreError> {
        let mut keys = self.sets.rev_range(&timeline_key(uid), 0, 0).await?;
        Ok(keys.pop())
    }

    /// Load a record by key.
    pub async fn get_record(&self, key: &str) -> Result<Option<BanRecord>, StoreError> {
        let fields = self.objects.get_object(key).await?;
        Ok(fields.as_ref().and_then(BanRecord::from_fields))
    }

    /// The principal's `limit` most recent records, newest first.
    ///
    /// Timeline entries whose record is gone are skipped.
    pub async fn recent_records(
        &self,
        uid: &str,
        limit: usize,
    ) -> Result<Vec<BanRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let stop = i64::try_from(limit - 1).unwrap_or(-1);
        let keys = self.sets.rev_range(&timeline_key(uid), 0, stop).await?;

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = self.get_record(&key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Page of banned principals, most recently banned first.
    pub async fn banned_page(&self, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        self.sets.rev_range(BANNED_INDEX, start, stop).await
    }

    /// Principals whose scheduled expiry is at or before `now`, oldest first.
    pub async fn due_for_expiry(&self, now: i64, limit: usize) -> Result<Vec<String>, StoreError> {
        self.sets
            .range_by_score(EXPIRY_INDEX, i64::MIN, now, limit)
            .await
    }
}
