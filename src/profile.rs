//! Per-principal profile fields.
//!
//! The core reads and writes three fields: the cached ban expiry, the email
//! confirmation flag (picks the group restored on unban) and the username
//! (used in the ban notice).

use crate::db::{FieldMap, ObjectStore, StoreError};
use async_trait::async_trait;
use std::sync::Arc;

/// Cached expiry of the current ban, `0` when permanent or lifted.
pub const BANNED_EXPIRE: &str = "banned:expire";
/// `1` when the principal confirmed their email address.
pub const EMAIL_CONFIRMED: &str = "email:confirmed";
/// Display name.
pub const USERNAME: &str = "username";

/// Profile field accessor.
#[async_trait]
pub trait ProfileFields: Send + Sync {
    /// Read one field of one principal.
    async fn get_field(&self, uid: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Write one field of one principal.
    async fn set_field(&self, uid: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Read selected fields of many principals, in `uids` order.
    async fn get_users_fields(
        &self,
        uids: &[&str],
        fields: &[&str],
    ) -> Result<Vec<FieldMap>, StoreError>;

    /// Write the same field value on many principals in one batch.
    async fn set_users_field(
        &self,
        uids: &[&str],
        field: &str,
        value: &str,
    ) -> Result<(), StoreError>;
}

/// Profiles kept as `user:{uid}` objects in an [`ObjectStore`].
pub struct StoreProfiles<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ObjectStore + ?Sized> StoreProfiles<S> {
    /// Wrap an object store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Object key of a principal's profile.
    pub fn user_key(uid: &str) -> String {
        format!("user:{}", uid)
    }
}

fn single_field(field: &str, value: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert(field.to_string(), value.to_string());
    fields
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ProfileFields for StoreProfiles<S> {
    async fn get_field(&self, uid: &str, field: &str) -> Result<Option<String>, StoreError> {
        let key = Self::user_key(uid);
        let mut rows = self.store.get_objects_fields(&[key.as_str()], &[field]).await?;
        Ok(rows.pop().and_then(|mut row| row.remove(field)))
    }

    async fn set_field(&self, uid: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.store
            .set_object(&Self::user_key(uid), &single_field(field, value))
            .await
    }

    async fn get_users_fields(
        &self,
        uids: &[&str],
        fields: &[&str],
    ) -> Result<Vec<FieldMap>, StoreError> {
        let keys: Vec<String> = uids.iter().map(|uid| Self::user_key(uid)).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.store.get_objects_fields(&keys, fields).await
    }

    async fn set_users_field(
        &self,
        uids: &[&str],
        field: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let keys: Vec<String> = uids.iter().map(|uid| Self::user_key(uid)).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.store
            .set_objects(&keys, &single_field(field, value))
            .await
    }
}
