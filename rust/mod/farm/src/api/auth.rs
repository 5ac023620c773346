use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use henhouse_core::ServiceError;

use crate::api::AppState;
use crate::model::{LoginRequest, RegisterUser, TokenResponse, UpdateProfile, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me).put(update_me))
}

async fn register(
    State(svc): State<AppState>,
    Json(input): Json<RegisterUser>,
) -> Result<(StatusCode, Json<User>), ServiceError> {
    let user = svc.register(input)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(svc): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ServiceError> {
    Ok(Json(svc.login(input)?))
}

/// GET /auth/me: the caller's profile.
async fn me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}

async fn update_me(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<UpdateProfile>,
) -> Result<Json<User>, ServiceError> {
    Ok(Json(svc.update_profile(&user.id, input)?))
}
