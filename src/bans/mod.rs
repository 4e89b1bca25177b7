//! Ban records, derived ban state and their storage layout.

mod models;
mod repository;

pub use models::{BanRecord, BanState, UserBanFields, parse_expiry, parse_leading_int};
pub use repository::{BANNED_INDEX, BanRepository, EXPIRY_INDEX, ban_key, timeline_key};
