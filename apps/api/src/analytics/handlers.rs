use axum::{
    extract::State,
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::analytics::query::AnalyticsParams;
use crate::analytics::service::{self, Sourced};
use crate::auth::AdminUser;
use crate::errors::AppError;
use crate::extract::ValidQuery;
use crate::state::AppState;

/// Response header naming where the payload came from: `live` or `fallback`.
pub const DATA_SOURCE_HEADER: HeaderName = HeaderName::from_static("x-data-source");

fn sourced_response<T: Serialize>(sourced: Sourced<T>) -> Response {
    (
        [(
            DATA_SOURCE_HEADER,
            HeaderValue::from_static(sourced.source.as_str()),
        )],
        Json(sourced.data),
    )
        .into_response()
}

/// GET /api/analytics/usage-trends
pub async fn handle_usage_trends(
    State(state): State<AppState>,
    _admin: AdminUser,
    ValidQuery(params): ValidQuery<AnalyticsParams>,
) -> Result<Response, AppError> {
    let filter = params.into_filter(Utc::now())?;
    let trends = service::usage_trends(state.store.as_ref(), &filter).await;
    Ok(sourced_response(trends))
}

/// GET /api/analytics/system-dashboard
pub async fn handle_system_dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
    ValidQuery(params): ValidQuery<AnalyticsParams>,
) -> Result<Response, AppError> {
    let filter = params.into_filter(Utc::now())?;
    let dashboard = service::system_dashboard(state.store.as_ref(), &filter).await;
    Ok(sourced_response(dashboard))
}
