//! Privilege gateway.

use crate::error::GatewayError;
use async_trait::async_trait;

/// Access to the external privilege system.
#[async_trait]
pub trait PrivilegeGateway: Send + Sync {
    /// Whether `group` holds the global `privilege` (e.g. `local:login`).
    async fn can_group(&self, privilege: &str, group: &str) -> Result<bool, GatewayError>;
}
