//! Ban notices.
//!
//! Delivery is best effort: [`crate::manager::BanManager::ban`] reports the
//! outcome as a [`NotificationStatus`] next to the created record and never
//! fails because of it.

use async_trait::async_trait;
use chrono::DateTime;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Notification delivery errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("template error: {0}")]
    Template(String),
}

/// Payload of a "you have been banned" notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanNotice {
    /// Translation key of the subject line, resolved by the transport.
    pub subject: String,
    pub username: Option<String>,
    /// Expiry as RFC 1123 UTC text with commas escaped; `None` when permanent.
    pub until: Option<String>,
    pub reason: String,
}

impl BanNotice {
    /// Build the notice for a ban expiring at `expire` (0 = permanent).
    pub fn new(site_title: &str, username: Option<String>, expire: i64, reason: &str) -> Self {
        Self {
            subject: format!("[[email:banned.subject, {}]]", site_title),
            username,
            until: format_until(expire),
            reason: reason.to_string(),
        }
    }
}

/// Render an expiry instant for a notice.
///
/// Commas are escaped because the subject/body templates use them as argument
/// separators.
pub fn format_until(expire_ms: i64) -> Option<String> {
    if expire_ms == 0 {
        return None;
    }
    let instant = DateTime::from_timestamp_millis(expire_ms)?;
    Some(
        instant
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string()
            .replace(',', "\\,"),
    )
}

/// Outcome of the best-effort notice sent by a ban.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Sent,
    Failed(String),
}

impl NotificationStatus {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Outbound notification transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `template` to `uid` with the given notice.
    async fn send(&self, template: &str, uid: &str, notice: &BanNotice) -> Result<(), NotifyError>;
}

/// Notifier that only logs the notice.
///
/// For deployments without an outbound transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, template: &str, uid: &str, notice: &BanNotice) -> Result<(), NotifyError> {
        let payload =
            serde_json::to_string(notice).map_err(|e| NotifyError::Template(e.to_string()))?;
        info!(template = %template, uid = %uid, payload = %payload, "Ban notice");
        Ok(())
    }
}
