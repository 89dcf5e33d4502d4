use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use shrty_links::{AnalyticsError, CountryClicks};

use crate::state::AppState;

use super::{error, ApiError, ErrorResponse};

/// Clicks on one shorty grouped by country, highest first.
#[utoipa::path(
    post,
    path = "/api/report/{slug}",
    tag = "Links",
    params(
        ("slug" = String, Path, description = "Shorty slug")
    ),
    responses(
        (status = 200, description = "Rows of {country, total}", body = Vec<Object>),
        (status = 400, description = "Slug cannot be queried", body = ErrorResponse),
        (status = 502, description = "Analytics backend unavailable", body = ErrorResponse)
    )
)]
pub async fn clicks_report(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<CountryClicks>>, ApiError> {
    state
        .analytics
        .clicks_by_country(&slug)
        .await
        .map(Json)
        .map_err(|e| match e {
            AnalyticsError::InvalidParameter(m) => error(StatusCode::BAD_REQUEST, m),
            other => {
                tracing::warn!(slug = %slug, error = %other, "Clicks report failed");
                error(StatusCode::BAD_GATEWAY, other.to_string())
            }
        })
}
