use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};

use henhouse_core::{ListResult, ServiceError};

use crate::api::AppState;
use crate::model::{
    Event, EventInput, EventQuery, FeedConsumption, Mortality, User, Vaccination,
    WeightMeasurement,
};
use crate::service::event::EventBody;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(kind_routes::<Mortality>("mortality"))
        .merge(kind_routes::<FeedConsumption>("feed"))
        .merge(kind_routes::<Vaccination>("vaccination"))
        .merge(kind_routes::<WeightMeasurement>("weight"))
}

/// Collection and item routes for one event kind, mounted at `/events/{segment}`.
fn kind_routes<B: EventBody>(segment: &str) -> Router<AppState> {
    Router::new()
        .route(
            &format!("/events/{}", segment),
            get(list_events::<B>).post(create_event::<B>),
        )
        .route(
            &format!("/events/{}/{{id}}", segment),
            put(update_event::<B>).delete(delete_event::<B>),
        )
}

/// 201 for a new event, 200 when the idempotency key replayed a stored one.
async fn create_event<B: EventBody>(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<EventInput<B>>,
) -> Result<(StatusCode, Json<Event<B>>), ServiceError> {
    let (event, created) = svc.record_event(&user.id, input)?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(event)))
}

async fn list_events<B: EventBody>(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<EventQuery>,
) -> Result<Json<ListResult<Event<B>>>, ServiceError> {
    Ok(Json(svc.list_events::<B>(&user.id, &query)?))
}

async fn update_event<B: EventBody>(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<Event<B>>, ServiceError> {
    Ok(Json(svc.update_event::<B>(&user.id, &id, patch)?))
}

async fn delete_event<B: EventBody>(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_event::<B>(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
