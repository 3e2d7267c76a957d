//! crates/contest_reminder_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AuthParams, Contest, Subscription, SubscriptionDraft, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// Upstream failures are modelled as explicit variants rather than opaque
/// transport errors so callers can distinguish "could not reach the listing
/// API" from "the listing API said no".
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Contest listing API unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Contest listing API rejected the request: {0}")]
    UpstreamRejected(String),
    #[error("Invalid timezone identifier: {0}")]
    InvalidTimezone(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Source of the canonical "upcoming contests" list.
#[async_trait]
pub trait ContestDirectory: Send + Sync {
    /// Returns upcoming contests sorted by start time ascending, contests
    /// with an unknown start time last.
    ///
    /// Without `auth` the result may be served from a shared snapshot;
    /// authenticated calls always go to the upstream, since the signature
    /// is scoped to the caller's own credentials.
    async fn upcoming_contests(&self, auth: Option<&AuthParams>) -> PortResult<Vec<Contest>>;
}

/// Storage for users and their contest subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn subscriptions_for_user(&self, user_id: Uuid) -> PortResult<Vec<Subscription>>;

    /// Replaces the user's subscription set: subscriptions absent from
    /// `drafts` are deleted, existing ones get their denormalized contest
    /// snapshot refreshed, new ones are inserted. `(user_id, contest_id)`
    /// stays unique throughout.
    async fn replace_subscriptions(
        &self,
        user_id: Uuid,
        drafts: &[SubscriptionDraft],
    ) -> PortResult<Vec<Subscription>>;
}

/// Durable record of which (subscription, reminder instant) pairs have
/// already been delivered. Its contents are the sole source of truth for
/// "already sent".
#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    async fn already_sent(
        &self,
        subscription_id: Uuid,
        instant: DateTime<Utc>,
    ) -> PortResult<bool>;

    /// Records a successful send. Implementations must enforce uniqueness of
    /// `(subscription_id, instant)` even under concurrent writers, and must
    /// absorb a duplicate insert as success: a concurrent run having already
    /// recorded the pair means the reminder was sent.
    async fn record_sent(&self, subscription_id: Uuid, instant: DateTime<Utc>) -> PortResult<()>;
}

/// Delivers one reminder to one user. The transport is expected to bound its
/// own latency; a failure must carry a human-readable message.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn send(
        &self,
        user: &User,
        subscription: &Subscription,
        local_times: &[String],
    ) -> PortResult<()>;
}
