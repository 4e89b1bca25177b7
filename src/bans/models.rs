//! Ban record models and derived state.

use crate::db::FieldMap;
use crate::error::BanError;
use crate::profile::BANNED_EXPIRE;
use serde::Serialize;

/// One ban event for one principal.
///
/// Never modified after it is written; every ban produces a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanRecord {
    /// Banned principal.
    pub uid: String,
    /// Unix milliseconds when the ban was issued.
    pub timestamp: i64,
    /// Unix milliseconds when the ban stops applying, `0` for permanent.
    pub expire: i64,
    /// Free-text justification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BanRecord {
    /// Build the record for a ban issued at `now` lasting until `until`.
    ///
    /// An `until` that is not after `now` yields a permanent ban. An empty
    /// reason is not stored.
    pub fn issue(uid: &str, now: i64, until: i64, reason: Option<&str>) -> Self {
        Self {
            uid: uid.to_string(),
            timestamp: now,
            expire: if until > now { until } else { 0 },
            reason: reason.filter(|r| !r.is_empty()).map(str::to_string),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.expire == 0
    }

    /// Object key this record is stored under.
    pub fn key(&self) -> String {
        super::ban_key(&self.uid, self.timestamp)
    }

    pub fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("uid".into(), self.uid.clone());
        fields.insert("timestamp".into(), self.timestamp.to_string());
        fields.insert("expire".into(), self.expire.to_string());
        if let Some(reason) = &self.reason {
            fields.insert("reason".into(), reason.clone());
        }
        fields
    }

    /// Rebuild a record from stored fields.
    ///
    /// Returns `None` when `uid` or `timestamp` is missing or unreadable.
    pub fn from_fields(fields: &FieldMap) -> Option<Self> {
        let uid = fields.get("uid")?.clone();
        let timestamp = fields.get("timestamp")?.parse().ok()?;
        let expire = fields
            .get("expire")
            .and_then(|v| parse_leading_int(v))
            .unwrap_or(0);
        Some(Self {
            uid,
            timestamp,
            expire,
            reason: fields.get("reason").filter(|r| !r.is_empty()).cloned(),
        })
    }
}

/// The ban-relevant profile fields of one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserBanFields {
    pub uid: String,
    /// Cached expiry; missing or unreadable values read as `0`.
    pub banned_expire: i64,
}

impl UserBanFields {
    pub fn from_field_map(uid: &str, fields: &FieldMap) -> Self {
        Self {
            uid: uid.to_string(),
            banned_expire: fields
                .get(BANNED_EXPIRE)
                .and_then(|v| parse_leading_int(v))
                .unwrap_or(0),
        }
    }
}

/// Ban state of a principal, derived at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BanState {
    /// Member of the restricted group.
    pub banned: bool,
    /// Cached expiry as stored, `0` for permanent or none.
    pub expire: i64,
    /// A non-permanent expiry lies at or before now.
    pub ban_expired: bool,
}

impl BanState {
    /// Combine membership and cached expiry as of `now`.
    pub fn evaluate(banned: bool, expire: i64, now: i64) -> Self {
        Self {
            banned,
            expire,
            ban_expired: expire != 0 && expire <= now,
        }
    }
}

/// Read the leading integer of `raw`.
///
/// Leading whitespace and a sign are accepted, anything after the digits is
/// ignored. Returns `None` when no digit follows.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let value: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Parse a caller-supplied ban expiry.
///
/// Empty input means permanent (`0`). Whitespace alone is not empty.
pub fn parse_expiry(raw: &str) -> Result<i64, BanError> {
    if raw.is_empty() {
        return Ok(0);
    }
    parse_leading_int(raw).ok_or_else(|| BanError::InvalidExpiry(raw.to_string()))
}
