//! services/api/src/web/reminders.rs
//!
//! Contains the Axum handlers for a user's contest subscriptions and for the
//! reminder endpoints: previewing the computed schedule and triggering a
//! dispatch run. Dispatch is expected to be hit periodically by an external
//! job; the engine itself keeps no timer.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use contest_reminder_core::domain::{Subscription, SubscriptionDraft};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::port_error_response;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The full set of contest ids the user wants to be reminded about.
#[derive(Deserialize, ToSchema)]
pub struct SaveSubscriptionsRequest {
    contest_ids: Vec<i64>,
}

#[derive(Serialize, ToSchema)]
pub struct SubscriptionDto {
    contest_id: i64,
    contest_name: String,
    start_time_utc: Option<DateTime<Utc>>,
}

impl From<&Subscription> for SubscriptionDto {
    fn from(subscription: &Subscription) -> Self {
        Self {
            contest_id: subscription.contest_id,
            contest_name: subscription.contest_name.clone(),
            start_time_utc: subscription.start_time_utc,
        }
    }
}

/// The computed reminder schedule for one subscription.
#[derive(Serialize, ToSchema)]
pub struct NotificationPreviewDto {
    contest_id: i64,
    contest_name: String,
    start_time_utc: Option<DateTime<Utc>>,
    reminders_utc: Vec<DateTime<Utc>>,
    reminders_local_formatted: Vec<String>,
}

/// The aggregate result of one dispatch run.
#[derive(Serialize, ToSchema)]
pub struct DispatchResponse {
    sent_count: usize,
    errors: Vec<String>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the user's saved subscriptions.
#[utoipa::path(
    get,
    path = "/users/{user_id}/subscriptions",
    responses(
        (status = 200, description = "The user's subscriptions", body = [SubscriptionDto]),
        (status = 404, description = "User not found")
    ),
    params(("user_id" = Uuid, Path, description = "The unique ID of the user."))
)]
pub async fn list_subscriptions_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .store
        .get_user(user_id)
        .await
        .map_err(port_error_response)?;
    let subscriptions = app_state
        .store
        .subscriptions_for_user(user_id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(
        subscriptions.iter().map(SubscriptionDto::from).collect::<Vec<_>>(),
    ))
}

/// Replace the user's subscription set.
///
/// Every contest id must be in the current upcoming snapshot; the contest
/// name and start time are denormalized onto the subscription at save time
/// so later reminder computation does not depend on the upstream being
/// reachable.
#[utoipa::path(
    put,
    path = "/users/{user_id}/subscriptions",
    request_body = SaveSubscriptionsRequest,
    responses(
        (status = 200, description = "The saved subscriptions", body = [SubscriptionDto]),
        (status = 400, description = "Empty set, or a contest is not upcoming"),
        (status = 404, description = "User not found"),
        (status = 502, description = "Upstream contest API unavailable")
    ),
    params(("user_id" = Uuid, Path, description = "The unique ID of the user."))
)]
pub async fn save_subscriptions_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SaveSubscriptionsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .store
        .get_user(user_id)
        .await
        .map_err(port_error_response)?;

    if payload.contest_ids.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "contest_ids cannot be empty".to_string(),
        ));
    }

    // Validate against the shared upcoming snapshot and capture the
    // denormalized name/start for each requested contest.
    let upcoming = app_state
        .contests
        .upcoming_contests(None)
        .await
        .map_err(port_error_response)?;
    let upcoming_by_id: HashMap<i64, _> =
        upcoming.iter().map(|contest| (contest.id, contest)).collect();

    let mut drafts = Vec::with_capacity(payload.contest_ids.len());
    for contest_id in &payload.contest_ids {
        let contest = upcoming_by_id.get(contest_id).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("Contest {} is not upcoming or not found", contest_id),
            )
        })?;
        drafts.push(SubscriptionDraft {
            contest_id: contest.id,
            contest_name: contest.name.clone(),
            start_time_utc: contest.start_time_utc,
        });
    }

    let saved = app_state
        .store
        .replace_subscriptions(user_id, &drafts)
        .await
        .map_err(port_error_response)?;

    Ok(Json(saved.iter().map(SubscriptionDto::from).collect::<Vec<_>>()))
}

/// Preview the reminder schedule for each of the user's subscriptions.
#[utoipa::path(
    get,
    path = "/users/{user_id}/notification-preview",
    responses(
        (status = 200, description = "Per-subscription schedules", body = [NotificationPreviewDto]),
        (status = 400, description = "The user's timezone is invalid"),
        (status = 404, description = "User not found")
    ),
    params(("user_id" = Uuid, Path, description = "The unique ID of the user."))
)]
pub async fn notification_preview_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = app_state
        .store
        .get_user(user_id)
        .await
        .map_err(port_error_response)?;
    let subscriptions = app_state
        .store
        .subscriptions_for_user(user_id)
        .await
        .map_err(port_error_response)?;

    let previews = app_state
        .engine
        .preview_user(&user, &subscriptions)
        .map_err(port_error_response)?;

    Ok(Json(
        previews
            .into_iter()
            .map(|preview| NotificationPreviewDto {
                contest_id: preview.contest_id,
                contest_name: preview.contest_name,
                start_time_utc: preview.start_time_utc,
                reminders_utc: preview.reminders_utc,
                reminders_local_formatted: preview.reminders_local,
            })
            .collect::<Vec<_>>(),
    ))
}

/// Run reminder dispatch for this user.
///
/// Sends every due, not-yet-delivered reminder. Safe to call repeatedly:
/// delivered instants are recorded and never sent twice, and a failed send
/// is reported in `errors` while remaining retryable on the next run.
#[utoipa::path(
    post,
    path = "/users/{user_id}/notifications/dispatch",
    responses(
        (status = 200, description = "Dispatch outcome", body = DispatchResponse),
        (status = 400, description = "The user's timezone is invalid"),
        (status = 404, description = "User not found")
    ),
    params(("user_id" = Uuid, Path, description = "The unique ID of the user."))
)]
pub async fn dispatch_notifications_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = app_state
        .store
        .get_user(user_id)
        .await
        .map_err(port_error_response)?;
    let subscriptions = app_state
        .store
        .subscriptions_for_user(user_id)
        .await
        .map_err(port_error_response)?;

    let outcome = app_state
        .engine
        .dispatch_user(&user, &subscriptions, Utc::now())
        .await
        .map_err(port_error_response)?;

    if outcome.errors.is_empty() {
        info!(user_id = %user_id, sent = outcome.sent, "dispatch run complete");
    } else {
        error!(
            user_id = %user_id,
            sent = outcome.sent,
            failed = outcome.errors.len(),
            "dispatch run finished with failures"
        );
    }

    Ok(Json(DispatchResponse {
        sent_count: outcome.sent,
        errors: outcome.errors,
    }))
}
