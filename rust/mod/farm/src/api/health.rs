use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use henhouse_core::{ListResult, ServiceError};

use crate::api::AppState;
use crate::model::{
    ConsultationQuery, CreateConsultation, UpdateConsultation, User, VetConsultation,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/health/consultations",
            get(list_consultations).post(create_consultation),
        )
        .route(
            "/health/consultations/{id}",
            get(get_consultation)
                .put(update_consultation)
                .delete(delete_consultation),
        )
}

async fn list_consultations(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<ConsultationQuery>,
) -> Result<Json<ListResult<VetConsultation>>, ServiceError> {
    Ok(Json(svc.list_consultations(&user.id, &query)?))
}

async fn create_consultation(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<CreateConsultation>,
) -> Result<(StatusCode, Json<VetConsultation>), ServiceError> {
    let consultation = svc.create_consultation(&user.id, input)?;
    Ok((StatusCode::CREATED, Json(consultation)))
}

async fn get_consultation(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<VetConsultation>, ServiceError> {
    Ok(Json(svc.get_consultation(&user.id, &id)?))
}

async fn update_consultation(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(input): Json<UpdateConsultation>,
) -> Result<Json<VetConsultation>, ServiceError> {
    Ok(Json(svc.update_consultation(&user.id, &id, input)?))
}

async fn delete_consultation(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_consultation(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
