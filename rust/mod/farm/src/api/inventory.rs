use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use henhouse_core::{ListParams, ListResult, ServiceError};

use crate::api::AppState;
use crate::model::{
    CreateInventoryItem, InventoryHistory, InventoryItem, UpdateInventoryItem, User,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(list_inventory).post(create_item))
        .route("/inventory/{id}", get(get_item).put(update_item).delete(delete_item))
        .route("/inventory/{id}/history", get(item_history))
}

async fn list_inventory(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<InventoryItem>>, ServiceError> {
    Ok(Json(svc.list_inventory(&user.id, &params)?))
}

async fn create_item(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Json(input): Json<CreateInventoryItem>,
) -> Result<(StatusCode, Json<InventoryItem>), ServiceError> {
    let item = svc.create_inventory_item(&user.id, input)?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<InventoryItem>, ServiceError> {
    Ok(Json(svc.get_inventory_item(&user.id, &id)?))
}

async fn update_item(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(input): Json<UpdateInventoryItem>,
) -> Result<Json<InventoryItem>, ServiceError> {
    Ok(Json(svc.update_inventory_item(&user.id, &id, input)?))
}

async fn delete_item(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_inventory_item(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn item_history(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Vec<InventoryHistory>>, ServiceError> {
    Ok(Json(svc.inventory_history(&user.id, &id)?))
}
