//! Integration test common infrastructure.
//!
//! In-memory stand-ins for the group, privilege and notification systems,
//! and a harness wiring them into a `BanManager` over either storage backend.

#![allow(dead_code)]

pub mod gateways;

pub use gateways::{MemoryGroups, MemoryPrivileges, RecordingNotifier};

use std::sync::Arc;
use userbans::bans::{BANNED_INDEX, EXPIRY_INDEX};
use userbans::profile::{EMAIL_CONFIRMED, USERNAME};
use userbans::{
    BanConfig, BanManager, BanManagerParams, Database, ManualClock, MemoryStore, ObjectStore,
    ProfileFields, SortedSetStore, StoreProfiles,
};

/// 2026-10-20T12:00:00Z.
pub const NOW: i64 = 1_792_497_600_000;
pub const DAY_MS: i64 = 86_400_000;

/// Install a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// A `BanManager` plus handles on everything behind it.
pub struct Harness {
    pub manager: Arc<BanManager>,
    pub sets: Arc<dyn SortedSetStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub profiles: Arc<dyn ProfileFields>,
    pub groups: Arc<MemoryGroups>,
    pub privileges: Arc<MemoryPrivileges>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    /// Harness over the in-process backend.
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::build(store.clone(), store)
    }

    /// Harness over a fresh in-memory SQLite database.
    pub async fn sqlite() -> Self {
        let db = Arc::new(Database::new(":memory:").await.expect("sqlite database"));
        Self::build(db.clone(), db)
    }

    fn build(sets: Arc<dyn SortedSetStore>, objects: Arc<dyn ObjectStore>) -> Self {
        init_tracing();

        let profiles: Arc<dyn ProfileFields> = Arc::new(StoreProfiles::new(objects.clone()));
        let groups = Arc::new(MemoryGroups::new());
        let privileges = Arc::new(MemoryPrivileges::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let clock = Arc::new(ManualClock::new(NOW));

        let manager = Arc::new(BanManager::new(BanManagerParams {
            config: BanConfig::default(),
            sets: sets.clone(),
            objects: objects.clone(),
            groups: groups.clone(),
            privileges: privileges.clone(),
            profiles: profiles.clone(),
            notifier: notifier.clone(),
            clock: clock.clone(),
        }));

        Self {
            manager,
            sets,
            objects,
            profiles,
            groups,
            privileges,
            notifier,
            clock,
        }
    }

    /// Create a registered principal with baseline group membership.
    pub async fn register(&self, uid: &str, username: &str, email_confirmed: bool) {
        self.profiles
            .set_field(uid, USERNAME, username)
            .await
            .expect("set username");
        self.profiles
            .set_field(uid, EMAIL_CONFIRMED, if email_confirmed { "1" } else { "0" })
            .await
            .expect("set email:confirmed");

        self.groups.add_member("registered-users", uid);
        self.groups.add_member(
            if email_confirmed {
                "verified-users"
            } else {
                "unverified-users"
            },
            uid,
        );
    }

    /// Members of the banned index, most recent first.
    pub async fn banned_index(&self) -> Vec<String> {
        self.sets.rev_range(BANNED_INDEX, 0, -1).await.expect("banned index")
    }

    /// Members of the expiry index, soonest first.
    pub async fn expiry_index(&self) -> Vec<String> {
        self.sets
            .range_by_score(EXPIRY_INDEX, i64::MIN, i64::MAX, usize::MAX)
            .await
            .expect("expiry index")
    }

    /// Whether `uid` sits in the expiry index at exactly `score`.
    pub async fn expires_at(&self, uid: &str, score: i64) -> bool {
        self.sets
            .range_by_score(EXPIRY_INDEX, score, score, usize::MAX)
            .await
            .expect("expiry index")
            .iter()
            .any(|member| member == uid)
    }

    /// Cached `banned:expire` profile field.
    pub async fn cached_expire(&self, uid: &str) -> Option<String> {
        self.profiles
            .get_field(uid, "banned:expire")
            .await
            .expect("banned:expire")
    }
}
