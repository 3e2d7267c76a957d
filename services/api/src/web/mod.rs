pub mod contests;
pub mod reminders;
pub mod state;

use axum::http::StatusCode;
use contest_reminder_core::ports::PortError;
use utoipa::OpenApi;

pub use contests::list_contests_handler;
pub use reminders::{
    dispatch_notifications_handler, list_subscriptions_handler, notification_preview_handler,
    save_subscriptions_handler,
};

use contests::ContestDto;
use reminders::{DispatchResponse, NotificationPreviewDto, SaveSubscriptionsRequest, SubscriptionDto};

/// The master definition for the OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    paths(
        contests::list_contests_handler,
        reminders::list_subscriptions_handler,
        reminders::save_subscriptions_handler,
        reminders::notification_preview_handler,
        reminders::dispatch_notifications_handler,
    ),
    components(
        schemas(
            ContestDto,
            SubscriptionDto,
            SaveSubscriptionsRequest,
            NotificationPreviewDto,
            DispatchResponse
        )
    ),
    tags(
        (name = "Contest Reminders API", description = "Upcoming Codeforces contests and per-user email reminders.")
    )
)]
pub struct ApiDoc;

/// Maps a core port error onto the HTTP response the excluded layers expect:
/// missing data is 404, configuration problems are the caller's 400, and
/// upstream trouble is a 502 with the upstream's own message.
pub(crate) fn port_error_response(error: PortError) -> (StatusCode, String) {
    let status = match &error {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::InvalidTimezone(_) => StatusCode::BAD_REQUEST,
        PortError::UpstreamUnavailable(_) | PortError::UpstreamRejected(_) => {
            StatusCode::BAD_GATEWAY
        }
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("request failed: {error}");
    }

    (status, error.to_string())
}
