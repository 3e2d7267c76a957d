//! services/api/src/adapters/ses.rs
//!
//! This module contains the adapter for Amazon SES email delivery.
//! It implements the `ReminderNotifier` port from the `core` crate.

use async_trait::async_trait;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use contest_reminder_core::domain::{Subscription, User};
use contest_reminder_core::ports::{PortError, PortResult, ReminderNotifier};
use tracing::info;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ReminderNotifier` port using Amazon SES.
#[derive(Clone)]
pub struct SesNotifier {
    client: aws_sdk_sesv2::Client,
    sender: String,
}

impl SesNotifier {
    /// Creates a new `SesNotifier`. The sender identity is required up
    /// front; a missing sender is a configuration error caught at startup,
    /// not something to retry at send time.
    pub fn new(client: aws_sdk_sesv2::Client, sender: String) -> Self {
        Self { client, sender }
    }
}

fn build_subject(subscription: &Subscription) -> String {
    format!("Codeforces contest reminder: {}", subscription.contest_name)
}

fn build_body(user: &User, subscription: &Subscription, local_times: &[String]) -> String {
    let start = match subscription.start_time_utc {
        Some(start) => start.to_rfc3339(),
        None => "not scheduled yet".to_string(),
    };

    let mut lines = vec![
        format!("Hi {},", user.handle.as_deref().unwrap_or("Codeforces user")),
        String::new(),
        format!(
            "Contest: {} (ID: {})",
            subscription.contest_name, subscription.contest_id
        ),
        format!("Start (UTC): {}", start),
        "Scheduled reminders (local time):".to_string(),
    ];
    lines.extend(local_times.iter().map(|t| format!("- {t}")));
    lines.push(String::new());
    lines.push("You received this because you subscribed to this contest.".to_string());
    lines.join("\n")
}

//=========================================================================================
// `ReminderNotifier` Trait Implementation
//=========================================================================================

#[async_trait]
impl ReminderNotifier for SesNotifier {
    async fn send(
        &self,
        user: &User,
        subscription: &Subscription,
        local_times: &[String],
    ) -> PortResult<()> {
        let subject = Content::builder()
            .data(build_subject(subscription))
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let body_text = Content::builder()
            .data(build_body(user, subscription, local_times))
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let message = Message::builder()
            .subject(subject)
            .body(Body::builder().text(body_text).build())
            .build();

        self.client
            .send_email()
            .from_email_address(&self.sender)
            .destination(Destination::builder().to_addresses(&user.email).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("SES send failed: {e}")))?;

        info!(
            contest_id = subscription.contest_id,
            "reminder email sent to {}", user.email
        );
        Ok(())
    }
}
