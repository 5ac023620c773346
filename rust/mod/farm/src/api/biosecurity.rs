use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};

use henhouse_core::{ListParams, ListResult, ServiceError};

use crate::api::AppState;
use crate::model::{BiosecurityCheck, CreateBiosecurityCheck, UpdateBiosecurityCheck, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/biosecurity", get(list_checks).post(create_check))
        .route("/biosecurity/{id}", put(update_check).delete(delete_check))
}

async fn list_checks(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<BiosecurityCheck>>, ServiceError> {
    Ok(Json(svc.list_biosecurity_checks(&user.id, &params)?))
}

async fn create_check(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<CreateBiosecurityCheck>,
) -> Result<(StatusCode, Json<BiosecurityCheck>), ServiceError> {
    let check = svc.create_biosecurity_check(&user.id, input)?;
    Ok((StatusCode::CREATED, Json(check)))
}

async fn update_check(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(input): Json<UpdateBiosecurityCheck>,
) -> Result<Json<BiosecurityCheck>, ServiceError> {
    Ok(Json(svc.update_biosecurity_check(&user.id, &id, input)?))
}

async fn delete_check(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_biosecurity_check(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
