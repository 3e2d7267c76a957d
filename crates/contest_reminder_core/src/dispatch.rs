//! crates/contest_reminder_core/src/dispatch.rs
//!
//! The dispatch engine: walks a user's subscriptions, decides which reminder
//! instants are due and not yet delivered, and drives the notifier. The
//! delivery ledger is the only idempotency gate; everything else is
//! recomputed on every invocation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{DispatchOutcome, ReminderPreview, Subscription, User};
use crate::ports::{DeliveryLedger, PortResult, ReminderNotifier};
use crate::schedule::{format_local_times, is_due, reminder_schedule};

/// Runs reminder dispatch for one user at a time.
///
/// The engine holds no state of its own between invocations; it is triggered
/// by an external caller (typically a periodic job hitting the dispatch
/// endpoint) and runs to completion.
#[derive(Clone)]
pub struct DispatchEngine {
    ledger: Arc<dyn DeliveryLedger>,
    notifier: Arc<dyn ReminderNotifier>,
}

impl DispatchEngine {
    pub fn new(ledger: Arc<dyn DeliveryLedger>, notifier: Arc<dyn ReminderNotifier>) -> Self {
        Self { ledger, notifier }
    }

    /// Sends every due, not-yet-delivered reminder for the user's
    /// subscriptions.
    ///
    /// Instants are evaluated in schedule order. A future instant is simply
    /// skipped; it becomes due naturally on a later invocation. A notifier
    /// failure is captured in the outcome and does not block sibling sends;
    /// the failed instant stays unledgered and so retryable. Running the
    /// engine twice back-to-back sends nothing new on the second run.
    ///
    /// The ledger is keyed on exact (subscription, instant) equality and the
    /// schedule is recomputed from the current `ReminderSpec` each run: if a
    /// user changes their reminder parameters after some reminders were
    /// already sent, the new schedule's instants will not match the ledgered
    /// ones and overlapping times can be delivered again.
    pub async fn dispatch_user(
        &self,
        user: &User,
        subscriptions: &[Subscription],
        now: DateTime<Utc>,
    ) -> PortResult<DispatchOutcome> {
        let mut outcome = DispatchOutcome::default();

        for subscription in subscriptions {
            let schedule = reminder_schedule(subscription.start_time_utc, &user.reminder_spec);

            for instant in schedule {
                if !is_due(instant, now) {
                    continue;
                }
                if self.ledger.already_sent(subscription.id, instant).await? {
                    continue;
                }

                let local_times = format_local_times(&[instant], &user.timezone)?;
                if let Err(e) = self.notifier.send(user, subscription, &local_times).await {
                    outcome.errors.push(e.to_string());
                    continue;
                }

                self.ledger.record_sent(subscription.id, instant).await?;
                outcome.sent += 1;
            }
        }

        Ok(outcome)
    }

    /// Computes, without sending anything, the full reminder schedule for
    /// each subscription together with its local rendering.
    pub fn preview_user(
        &self,
        user: &User,
        subscriptions: &[Subscription],
    ) -> PortResult<Vec<ReminderPreview>> {
        subscriptions
            .iter()
            .map(|subscription| {
                let reminders_utc =
                    reminder_schedule(subscription.start_time_utc, &user.reminder_spec);
                let reminders_local = format_local_times(&reminders_utc, &user.timezone)?;
                Ok(ReminderPreview {
                    contest_id: subscription.contest_id,
                    contest_name: subscription.contest_name.clone(),
                    start_time_utc: subscription.start_time_utc,
                    reminders_utc,
                    reminders_local,
                })
            })
            .collect()
    }
}
