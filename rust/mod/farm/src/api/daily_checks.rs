use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;

use henhouse_core::ServiceError;

use crate::api::AppState;
use crate::model::{DailyCheck, DailyCheckOutcome, DailyCheckQuery, DailyCheckSubmission, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/daily-checks", post(submit_daily_check))
        .route("/daily-checks/{flock_id}", get(list_daily_checks))
        .route("/daily-checks/{flock_id}/{check_date}", get(get_daily_check))
}

/// POST /daily-checks: observations plus batched events, answered with
/// the alerts the check raised.
async fn submit_daily_check(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Json(submission): Json<DailyCheckSubmission>,
) -> Result<(StatusCode, Json<DailyCheckOutcome>), ServiceError> {
    let outcome = svc.submit_daily_check(&user.id, submission)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn list_daily_checks(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(flock_id): Path<String>,
    Query(query): Query<DailyCheckQuery>,
) -> Result<Json<Vec<DailyCheck>>, ServiceError> {
    Ok(Json(svc.list_daily_checks(&user.id, &flock_id, &query)?))
}

async fn get_daily_check(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path((flock_id, check_date)): Path<(String, NaiveDate)>,
) -> Result<Json<DailyCheck>, ServiceError> {
    Ok(Json(svc.get_daily_check(&user.id, &flock_id, check_date)?))
}
