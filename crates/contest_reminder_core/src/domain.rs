//! crates/contest_reminder_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The lifecycle phase of an upstream contest.
///
/// Only `Before` counts as upcoming; everything else is already running or
/// over and is dropped when building a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestPhase {
    Before,
    Coding,
    PendingSystemTest,
    SystemTest,
    Finished,
    /// A phase string this version does not know about.
    Unknown,
}

impl ContestPhase {
    pub fn is_upcoming(&self) -> bool {
        matches!(self, ContestPhase::Before)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContestPhase::Before => "BEFORE",
            ContestPhase::Coding => "CODING",
            ContestPhase::PendingSystemTest => "PENDING_SYSTEM_TEST",
            ContestPhase::SystemTest => "SYSTEM_TEST",
            ContestPhase::Finished => "FINISHED",
            ContestPhase::Unknown => "UNKNOWN",
        }
    }
}

/// An upcoming contest as reported by the upstream listing API.
///
/// Constructed fresh on every fetch and never mutated; a newer snapshot
/// simply replaces the previous one.
#[derive(Debug, Clone)]
pub struct Contest {
    pub id: i64,
    pub name: String,
    pub phase: ContestPhase,
    /// Absent for contests the upstream has not scheduled yet.
    pub start_time_utc: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub relative_time_seconds: Option<i64>,
}

/// Per-caller credentials for authenticated upstream requests.
#[derive(Clone)]
pub struct AuthParams {
    pub api_key: String,
    pub api_secret: String,
}

// The secret must never end up in logs, so Debug is written by hand.
impl std::fmt::Debug for AuthParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthParams")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Per-user reminder parameters.
///
/// Bounds (`count >= 1`, `interval_minutes >= 1`) are enforced where users
/// are created, not re-checked by the schedule computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSpec {
    pub count: u32,
    /// Minutes before the contest start for the first reminder.
    pub lead_minutes: u32,
    /// Minutes between successive reminders.
    pub interval_minutes: u32,
}

/// A subscribed user, as loaded from storage.
///
/// Account lifecycle is handled outside this service; rows are provisioned
/// externally.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// IANA timezone name used to render reminder times.
    pub timezone: String,
    pub handle: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub reminder_spec: ReminderSpec,
}

/// A user's subscription to one contest.
///
/// The contest name and start time are denormalized at save time so that
/// reminder computation does not depend on upstream availability.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub contest_id: i64,
    pub contest_name: String,
    pub start_time_utc: Option<DateTime<Utc>>,
}

/// The denormalized contest snapshot used when saving a subscription set.
#[derive(Debug, Clone)]
pub struct SubscriptionDraft {
    pub contest_id: i64,
    pub contest_name: String,
    pub start_time_utc: Option<DateTime<Utc>>,
}

/// Aggregate result of one dispatch run.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub sent: usize,
    /// Human-readable messages for sends that failed, in encounter order.
    pub errors: Vec<String>,
}

/// The computed reminder schedule for one subscription, with both the UTC
/// instants and their local rendering.
#[derive(Debug, Clone)]
pub struct ReminderPreview {
    pub contest_id: i64,
    pub contest_name: String,
    pub start_time_utc: Option<DateTime<Utc>>,
    pub reminders_utc: Vec<DateTime<Utc>>,
    pub reminders_local: Vec<String>,
}
