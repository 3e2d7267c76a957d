//! services/api/src/web/contests.rs
//!
//! Contains the Axum handler for listing upcoming contests, with optional
//! caller credentials for an authenticated upstream request and optional
//! timezone-local display of start times.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use contest_reminder_core::domain::{AuthParams, Contest};
use contest_reminder_core::schedule::format_local_times;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::port_error_response;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize)]
pub struct ContestsQuery {
    /// IANA timezone like Europe/Berlin for local display fields.
    timezone: Option<String>,
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
    #[serde(rename = "apiSecret")]
    api_secret: Option<String>,
}

/// One upcoming contest as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContestDto {
    id: i64,
    name: String,
    phase: String,
    start_time_utc: Option<DateTime<Utc>>,
    duration_seconds: Option<i64>,
    relative_time_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time_local_formatted: Option<String>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List upcoming contests.
///
/// Unauthenticated requests are served from a shared snapshot of the
/// upstream listing; supplying `apiKey`/`apiSecret` issues a signed request
/// scoped to those credentials instead.
#[utoipa::path(
    get,
    path = "/contests",
    responses(
        (status = 200, description = "Upcoming contests, earliest first", body = [ContestDto]),
        (status = 400, description = "Invalid timezone or half-supplied credentials"),
        (status = 502, description = "Upstream contest API unavailable or rejected the request")
    ),
    params(
        ("timezone" = Option<String>, Query, description = "IANA timezone like Europe/Berlin"),
        ("apiKey" = Option<String>, Query, description = "Upstream API key"),
        ("apiSecret" = Option<String>, Query, description = "Upstream API secret")
    )
)]
pub async fn list_contests_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ContestsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let auth = parse_auth(&query)?;
    let contests = app_state
        .contests
        .upcoming_contests(auth.as_ref())
        .await
        .map_err(port_error_response)?;

    let dtos = apply_timezone(&contests, query.timezone.as_deref())?;
    Ok(Json(dtos))
}

/// Credentials must come as a pair: either both query params or neither.
fn parse_auth(query: &ContestsQuery) -> Result<Option<AuthParams>, (StatusCode, String)> {
    match (&query.api_key, &query.api_secret) {
        (Some(api_key), Some(api_secret)) => Ok(Some(AuthParams {
            api_key: api_key.clone(),
            api_secret: api_secret.clone(),
        })),
        (None, None) => Ok(None),
        _ => Err((
            StatusCode::BAD_REQUEST,
            "Both apiKey and apiSecret are required when supplying credentials".to_string(),
        )),
    }
}

fn apply_timezone(
    contests: &[Contest],
    timezone_name: Option<&str>,
) -> Result<Vec<ContestDto>, (StatusCode, String)> {
    if let Some(name) = timezone_name {
        // Reject bogus zone names before building any DTOs.
        name.parse::<chrono_tz::Tz>().map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                "Invalid timezone identifier".to_string(),
            )
        })?;
    }

    contests
        .iter()
        .map(|contest| {
            let start_time_local_formatted = match (timezone_name, contest.start_time_utc) {
                (Some(name), Some(start)) => format_local_times(&[start], name)
                    .map_err(port_error_response)?
                    .into_iter()
                    .next(),
                _ => None,
            };

            Ok(ContestDto {
                id: contest.id,
                name: contest.name.clone(),
                phase: contest.phase.as_str().to_string(),
                start_time_utc: contest.start_time_utc,
                duration_seconds: contest.duration_seconds,
                relative_time_seconds: contest.relative_time_seconds,
                local_timezone: timezone_name.map(str::to_string),
                start_time_local_formatted,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contest_reminder_core::domain::ContestPhase;

    fn contest(id: i64, start: Option<DateTime<Utc>>) -> Contest {
        Contest {
            id,
            name: format!("Round #{id}"),
            phase: ContestPhase::Before,
            start_time_utc: start,
            duration_seconds: Some(7200),
            relative_time_seconds: None,
        }
    }

    #[test]
    fn auth_requires_both_credentials_or_neither() {
        let query = ContestsQuery {
            timezone: None,
            api_key: Some("key".to_string()),
            api_secret: None,
        };
        let (status, _) = parse_auth(&query).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let query = ContestsQuery {
            timezone: None,
            api_key: None,
            api_secret: None,
        };
        assert!(parse_auth(&query).unwrap().is_none());
    }

    #[test]
    fn timezone_adds_local_display_fields() {
        let start = Utc.with_ymd_and_hms(2026, 2, 16, 15, 0, 0).unwrap();
        let dtos = apply_timezone(&[contest(1, Some(start))], Some("Europe/Berlin")).unwrap();

        assert_eq!(dtos[0].local_timezone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(
            dtos[0].start_time_local_formatted.as_deref(),
            Some("2026-02-16 04:00 PM")
        );
    }

    #[test]
    fn without_timezone_no_local_fields_are_set() {
        let start = Utc.with_ymd_and_hms(2026, 2, 16, 15, 0, 0).unwrap();
        let dtos = apply_timezone(&[contest(1, Some(start))], None).unwrap();
        assert!(dtos[0].local_timezone.is_none());
        assert!(dtos[0].start_time_local_formatted.is_none());
    }

    #[test]
    fn invalid_timezone_is_a_bad_request() {
        let (status, message) = apply_timezone(&[], Some("Pluto/Nowhere")).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Invalid timezone identifier");
    }
}
