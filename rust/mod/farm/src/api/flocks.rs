use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use henhouse_core::{ListResult, ServiceError};

use crate::api::AppState;
use crate::model::{CreateFlock, Flock, FlockQuery, FlockStats, UpdateFlock, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flocks", get(list_flocks).post(create_flock))
        .route("/flocks/{id}", get(get_flock).put(update_flock).delete(delete_flock))
        .route("/flocks/{id}/stats", get(flock_stats))
}

async fn list_flocks(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<FlockQuery>,
) -> Result<Json<ListResult<Flock>>, ServiceError> {
    Ok(Json(svc.list_flocks(&user.id, &query)?))
}

async fn create_flock(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<CreateFlock>,
) -> Result<(StatusCode, Json<Flock>), ServiceError> {
    let flock = svc.create_flock(&user.id, input)?;
    Ok((StatusCode::CREATED, Json(flock)))
}

async fn get_flock(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Flock>, ServiceError> {
    Ok(Json(svc.get_flock(&user.id, &id)?))
}

async fn update_flock(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(input): Json<UpdateFlock>,
) -> Result<Json<Flock>, ServiceError> {
    Ok(Json(svc.update_flock(&user.id, &id, input)?))
}

async fn delete_flock(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_flock(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn flock_stats(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<FlockStats>, ServiceError> {
    Ok(Json(svc.flock_stats(&user.id, &id)?))
}
