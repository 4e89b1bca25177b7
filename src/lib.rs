//! userbans - ban lifecycle core.
//!
//! Keeps a principal's ban records, the global ban indexes and the membership of
//! the restricted ("banned") group in step, evaluates expiry lazily on read, and
//! answers whether a banned principal may still log in.
//!
//! The core talks to the outside world through narrow async traits:
//! - [`db::SortedSetStore`] / [`db::ObjectStore`]: storage primitives
//! - [`groups::GroupGateway`]: group membership
//! - [`privileges::PrivilegeGateway`]: group capability checks
//! - [`profile::ProfileFields`]: per-principal profile fields
//! - [`notify::Notifier`]: ban notices
//!
//! [`manager::BanManager`] composes them.

pub mod bans;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod groups;
pub mod manager;
pub mod notify;
pub mod privileges;
pub mod profile;
pub mod sweeper;
pub mod telemetry;

pub use bans::{BanRecord, BanRepository, BanState, UserBanFields};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BanConfig, ConfigError, DatabaseConfig, SweepConfig};
pub use db::{Database, FieldMap, MemoryStore, ObjectStore, SortedSetStore, StoreError};
pub use error::{BanError, GatewayError};
pub use groups::GroupGateway;
pub use manager::{BanManager, BanManagerParams, BanOutcome};
pub use notify::{BanNotice, NotificationStatus, Notifier, NotifyError, TracingNotifier};
pub use privileges::PrivilegeGateway;
pub use profile::{ProfileFields, StoreProfiles};
