use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use jukebox_types::api::{Claims, PreferenceResponse, SetPreferenceRequest};
use jukebox_types::models::Preference;

use crate::auth::AppState;
use crate::error::ApiError;

/// GET /preferences/{name}
pub async fn get_preference(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let pref = Preference::from_name(&name).ok_or(ApiError::NotFound)?;

    let value = tokio::task::spawn_blocking(move || {
        state.db.get_preference_bool(claims.sub, pref.name())
    })
    .await??;

    Ok(Json(PreferenceResponse {
        name: pref.name().to_string(),
        value,
    }))
}

/// PUT /preferences/{name}
pub async fn set_preference(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetPreferenceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pref = Preference::from_name(&name).ok_or(ApiError::NotFound)?;
    let stored = if req.value { "1" } else { "0" };

    tokio::task::spawn_blocking(move || {
        state.db.set_preference(claims.sub, pref.name(), stored)
    })
    .await??;

    info!(user_id = claims.sub, "Preference {} set to {}", pref.name(), req.value);
    Ok(StatusCode::NO_CONTENT)
}
