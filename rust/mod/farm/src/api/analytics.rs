use axum::extract::{Extension, State};
use axum::routing::get;
use axum::{Json, Router};

use henhouse_core::ServiceError;

use crate::api::AppState;
use crate::model::{DashboardMetrics, MonthlyTotals, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/dashboard-metrics", get(dashboard_metrics))
        .route("/analytics/charts/revenue-vs-expenses", get(revenue_vs_expenses))
}

async fn dashboard_metrics(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<DashboardMetrics>, ServiceError> {
    Ok(Json(svc.dashboard_metrics(&user.id)?))
}

async fn revenue_vs_expenses(
    State(svc): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<MonthlyTotals>>, ServiceError> {
    Ok(Json(svc.revenue_vs_expenses(&user.id)?))
}
