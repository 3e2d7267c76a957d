//! services/api/src/adapters/store.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `SubscriptionStore` and `DeliveryLedger` ports from
//! the `core` crate. It handles all interactions with the PostgreSQL
//! database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contest_reminder_core::domain::{ReminderSpec, Subscription, SubscriptionDraft, User};
use contest_reminder_core::ports::{DeliveryLedger, PortError, PortResult, SubscriptionStore};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `SubscriptionStore` and
/// `DeliveryLedger` ports over one connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    timezone: String,
    handle: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
    reminder_count: i32,
    reminder_lead_minutes: i32,
    reminder_interval_minutes: i32,
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            timezone: self.timezone,
            handle: self.handle,
            api_key: self.api_key,
            api_secret: self.api_secret,
            reminder_spec: ReminderSpec {
                count: self.reminder_count as u32,
                lead_minutes: self.reminder_lead_minutes as u32,
                interval_minutes: self.reminder_interval_minutes as u32,
            },
        }
    }
}

#[derive(FromRow)]
struct SubscriptionRecord {
    id: Uuid,
    user_id: Uuid,
    contest_id: i64,
    contest_name: String,
    start_time_utc: Option<DateTime<Utc>>,
}

impl SubscriptionRecord {
    fn to_domain(self) -> Subscription {
        Subscription {
            id: self.id,
            user_id: self.user_id,
            contest_id: self.contest_id,
            contest_name: self.contest_name,
            start_time_utc: self.start_time_utc,
        }
    }
}

//=========================================================================================
// `SubscriptionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, timezone, handle, api_key, api_secret, \
             reminder_count, reminder_lead_minutes, reminder_interval_minutes \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => PortError::Unexpected(e.to_string()),
        })?;

        Ok(record.to_domain())
    }

    async fn subscriptions_for_user(&self, user_id: Uuid) -> PortResult<Vec<Subscription>> {
        let records = sqlx::query_as::<_, SubscriptionRecord>(
            "SELECT id, user_id, contest_id, contest_name, start_time_utc \
             FROM contest_subscriptions WHERE user_id = $1 ORDER BY start_time_utc ASC NULLS LAST",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn replace_subscriptions(
        &self,
        user_id: Uuid,
        drafts: &[SubscriptionDraft],
    ) -> PortResult<Vec<Subscription>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Drop subscriptions for contests not in the new set.
        let keep: Vec<i64> = drafts.iter().map(|d| d.contest_id).collect();
        sqlx::query(
            "DELETE FROM contest_subscriptions WHERE user_id = $1 AND contest_id <> ALL($2)",
        )
        .bind(user_id)
        .bind(&keep)
        .execute(&mut *tx)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Upsert the rest, refreshing the denormalized contest snapshot on
        // survivors. The (user_id, contest_id) unique constraint makes this
        // safe under concurrent saves.
        let mut saved = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let record = sqlx::query_as::<_, SubscriptionRecord>(
                "INSERT INTO contest_subscriptions (id, user_id, contest_id, contest_name, start_time_utc) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (user_id, contest_id) \
                 DO UPDATE SET contest_name = EXCLUDED.contest_name, start_time_utc = EXCLUDED.start_time_utc \
                 RETURNING id, user_id, contest_id, contest_name, start_time_utc",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(draft.contest_id)
            .bind(&draft.contest_name)
            .bind(draft.start_time_utc)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

            saved.push(record.to_domain());
        }

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(saved)
    }
}

//=========================================================================================
// `DeliveryLedger` Trait Implementation
//=========================================================================================

#[async_trait]
impl DeliveryLedger for PgStore {
    async fn already_sent(
        &self,
        subscription_id: Uuid,
        instant: DateTime<Utc>,
    ) -> PortResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM delivery_log WHERE subscription_id = $1 AND send_time = $2)",
        )
        .bind(subscription_id)
        .bind(instant)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(exists)
    }

    async fn record_sent(&self, subscription_id: Uuid, instant: DateTime<Utc>) -> PortResult<()> {
        // The unique constraint is the correctness backstop when two
        // dispatch runs overlap; a duplicate insert means the reminder was
        // already sent, which is success for our purposes.
        sqlx::query(
            "INSERT INTO delivery_log (subscription_id, send_time) VALUES ($1, $2) \
             ON CONFLICT (subscription_id, send_time) DO NOTHING",
        )
        .bind(subscription_id)
        .bind(instant)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(())
    }
}
