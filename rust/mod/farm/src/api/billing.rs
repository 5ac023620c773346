use axum::body::Bytes;
use axum::extract::{Extension, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::warn;

use henhouse_core::ServiceError;

use crate::api::AppState;
use crate::model::{
    CallbackAck, CallbackPayload, SimulateCallback, SubscribeRequest, SubscribeResponse,
    Subscription, User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/billing/subscribe", post(subscribe))
        .route("/billing/mpesa/callback", post(mpesa_callback))
        .route("/billing/simulate-callback", post(simulate_callback))
        .route("/billing/my-subscription", get(my_subscription))
}

async fn subscribe(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, ServiceError> {
    Ok(Json(svc.subscribe(&user.id, req)?))
}

/// POST /billing/mpesa/callback is public. The body is decoded by hand so
/// an unreadable payload is still acknowledged with 200.
async fn mpesa_callback(
    State(svc): State<AppState>,
    body: Bytes,
) -> Result<Json<CallbackAck>, ServiceError> {
    let payload: CallbackPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "unreadable payment callback");
            return Ok(Json(CallbackAck::Error { detail: e.to_string() }));
        }
    };
    Ok(Json(svc.handle_payment_callback(payload)?))
}

async fn simulate_callback(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<SimulateCallback>,
) -> Result<Json<Subscription>, ServiceError> {
    Ok(Json(svc.simulate_payment_callback(&user.id, &query.mpesa_reference)?))
}

async fn my_subscription(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Subscription>, ServiceError> {
    Ok(Json(svc.my_subscription(&user.id)?))
}
