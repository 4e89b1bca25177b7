//! Standardized span constructors for ban observability.

use tracing::{Span, debug_span, info_span};

/// Span for a state-changing ban operation on one principal.
pub fn ban_write(operation: &'static str, uid: &str) -> Span {
    info_span!("ban_write", operation = operation, uid = %uid)
}

/// Span for a state-changing operation over several principals.
pub fn ban_write_many(operation: &'static str, count: usize) -> Span {
    info_span!("ban_write", operation = operation, count = count)
}

/// Span for a read-only ban query.
pub fn ban_read(operation: &'static str, count: usize) -> Span {
    debug_span!("ban_read", operation = operation, count = count)
}

/// Span for one run of the expiry sweep.
pub fn sweep(limit: usize) -> Span {
    info_span!("ban_sweep", limit = limit)
}
