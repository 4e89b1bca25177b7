//! Error hierarchy for the ban lifecycle core.
//!
//! Storage failures come from [`crate::db::StoreError`]; failures of the
//! external group/privilege/profile collaborators are reported as
//! [`GatewayError`]. Both propagate unchanged through [`BanError`]: a
//! half-applied ban or unban is not rolled back.

use crate::db::StoreError;
use thiserror::Error;

// ============================================================================
// Gateway Errors (external collaborators)
// ============================================================================

/// Errors reported by the group, privilege and profile gateways.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The collaborator could not be reached or timed out.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The collaborator refused the request.
    #[error("gateway rejected request: {0}")]
    Rejected(String),
}

// ============================================================================
// Ban Errors (lifecycle operations)
// ============================================================================

/// Errors returned by [`crate::manager::BanManager`] operations.
#[derive(Debug, Error)]
pub enum BanError {
    /// The supplied expiry could not be read as an integer instant.
    ///
    /// Raised before any write takes place.
    #[error("invalid ban expiry: {0:?}")]
    InvalidExpiry(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl BanError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidExpiry(_) => "invalid_expiry",
            Self::Store(_) => "store_error",
            Self::Gateway(_) => "gateway_error",
        }
    }
}

/// Result type for ban lifecycle operations.
pub type BanResult<T> = Result<T, BanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BanError::InvalidExpiry("soon".into()).error_code(),
            "invalid_expiry"
        );
        assert_eq!(
            BanError::from(GatewayError::Unavailable("groups".into())).error_code(),
            "gateway_error"
        );
        assert_eq!(
            BanError::from(StoreError::Internal("boom".into())).error_code(),
            "store_error"
        );
    }

    #[test]
    fn test_invalid_expiry_display() {
        let err = BanError::InvalidExpiry("not-a-number".into());
        assert_eq!(err.to_string(), "invalid ban expiry: \"not-a-number\"");
    }
}
