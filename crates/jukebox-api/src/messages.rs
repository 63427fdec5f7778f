use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

use jukebox_types::api::{
    Claims, CreatePrivateMessageRequest, CreatePrivateMessageResponse, MessageListQuery,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::pvmsg::{self, CreateError};

/// POST /pvmsg
///
/// Only administrators may set `from_user` to write on another user's behalf.
pub async fn send_private_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePrivateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Run blocking DB work off the async runtime
    let id = tokio::task::spawn_blocking(move || {
        if req.from_user.is_some() {
            let is_admin = state
                .db
                .get_user_by_id(claims.sub)?
                .is_some_and(|u| u.is_admin);
            if !is_admin {
                warn!(user_id = claims.sub, "Rejected from_user override by non-admin");
                return Err(ApiError::Forbidden("from_user requires administrator access".into()));
            }
        }

        pvmsg::create(&state, claims.sub, req).map_err(|e| match e {
            CreateError::Validation(errors) => ApiError::Validation(errors),
            CreateError::Storage(e) => ApiError::Internal(e),
        })
    })
    .await??;

    Ok((StatusCode::CREATED, Json(CreatePrivateMessageResponse { id })))
}

/// GET /pvmsg?box=inbox|outbox&limit=N
pub async fn list_private_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MessageListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || {
        pvmsg::list(&db, claims.sub, query.r#box, query.limit)
    })
    .await??;

    let messages: Vec<_> = rows
        .into_iter()
        .map(|row| pvmsg::to_response(row, &state.web_path))
        .collect();

    Ok(Json(messages))
}

/// GET /pvmsg/{id}
pub async fn get_private_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || pvmsg::get(&db, claims.sub, id))
        .await??
        .ok_or(ApiError::NotFound)?;

    Ok(Json(pvmsg::to_response(row, &state.web_path)))
}
