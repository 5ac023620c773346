use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};

use henhouse_core::{ListResult, ServiceError};

use crate::api::AppState;
use crate::model::{
    CreateExpenditure, CreateSale, Expenditure, FinanceQuery, Sale, UpdateExpenditure,
    UpdateSale, User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/finance/expenditures", get(list_expenditures).post(create_expenditure))
        .route(
            "/finance/expenditures/{id}",
            put(update_expenditure).delete(delete_expenditure),
        )
        .route("/finance/sales", get(list_sales).post(create_sale))
        .route("/finance/sales/{id}", put(update_sale).delete(delete_sale))
}

// ── Expenditures ──

async fn list_expenditures(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<FinanceQuery>,
) -> Result<Json<ListResult<Expenditure>>, ServiceError> {
    Ok(Json(svc.list_expenditures(&user.id, &query)?))
}

async fn create_expenditure(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<CreateExpenditure>,
) -> Result<(StatusCode, Json<Expenditure>), ServiceError> {
    let expense = svc.create_expenditure(&user.id, input)?;
    Ok((StatusCode::CREATED, Json(expense)))
}

async fn update_expenditure(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(input): Json<UpdateExpenditure>,
) -> Result<Json<Expenditure>, ServiceError> {
    Ok(Json(svc.update_expenditure(&user.id, &id, input)?))
}

async fn delete_expenditure(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_expenditure(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Sales ──

async fn list_sales(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<FinanceQuery>,
) -> Result<Json<ListResult<Sale>>, ServiceError> {
    Ok(Json(svc.list_sales(&user.id, &query)?))
}

async fn create_sale(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<CreateSale>,
) -> Result<(StatusCode, Json<Sale>), ServiceError> {
    let sale = svc.create_sale(&user.id, input)?;
    Ok((StatusCode::CREATED, Json(sale)))
}

async fn update_sale(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(input): Json<UpdateSale>,
) -> Result<Json<Sale>, ServiceError> {
    Ok(Json(svc.update_sale(&user.id, &id, input)?))
}

async fn delete_sale(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_sale(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
