use axum::extract::{Extension, Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};

use henhouse_core::{ListResult, ServiceError};

use crate::api::AppState;
use crate::model::{Alert, AlertQuery, UpdateAlert, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(list_alerts))
        .route("/alerts/{id}", put(update_alert))
        .route("/alerts/{id}/acknowledge", post(acknowledge_alert))
        .route("/alerts/{id}/resolve", post(resolve_alert))
}

async fn list_alerts(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<ListResult<Alert>>, ServiceError> {
    Ok(Json(svc.list_alerts(&user.id, &query)?))
}

async fn update_alert(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(input): Json<UpdateAlert>,
) -> Result<Json<Alert>, ServiceError> {
    Ok(Json(svc.update_alert_status(&user.id, &id, input.status)?))
}

async fn acknowledge_alert(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ServiceError> {
    Ok(Json(svc.acknowledge_alert(&user.id, &id)?))
}

async fn resolve_alert(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ServiceError> {
    Ok(Json(svc.resolve_alert(&user.id, &id)?))
}
