mod auth;
mod flocks;
mod daily_checks;
mod events;
mod alerts;
mod inventory;
mod finance;
mod biosecurity;
mod health;
mod billing;
mod analytics;
mod middleware;

use std::sync::Arc;

use axum::Router;

use crate::service::FarmService;

/// Shared application state.
pub type AppState = Arc<FarmService>;

/// Build the complete farm API router, mounted under `/api/v1`.
pub fn build_router(svc: Arc<FarmService>) -> Router {
    let api = Router::new()
        .merge(auth::routes())
        .merge(flocks::routes())
        .merge(daily_checks::routes())
        .merge(events::routes())
        .merge(alerts::routes())
        .merge(inventory::routes())
        .merge(finance::routes())
        .merge(biosecurity::routes())
        .merge(health::routes())
        .merge(billing::routes())
        .merge(analytics::routes());

    Router::new()
        .nest("/api/v1", api)
        .layer(axum::middleware::from_fn_with_state(
            svc.clone(),
            middleware::auth_middleware,
        ))
        .with_state(svc)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::service::testutil;

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn signup(app: &Router, email: &str) -> String {
        let (status, _) = send(
            app,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({"email": email, "password": "correct-horse"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": email, "password": "correct-horse"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn create_flock(app: &Router, token: &str, days_old: i64) -> String {
        let start = testutil::today() - Duration::days(days_old);
        let (status, body) = send(
            app,
            "POST",
            "/api/v1/flocks",
            Some(token),
            Some(json!({"name": "Batch A", "start_date": start, "initial_count": 500})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_register_login_me() {
        let app = build_router(testutil::service());
        let token = signup(&app, "Achieng@Example.com").await;

        let (status, body) = send(&app, "GET", "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "achieng@example.com");
        assert!(body.get("password_hash").is_none());

        let (status, body) = send(
            &app,
            "PUT",
            "/api/v1/auth/me",
            Some(&token),
            Some(json!({"location": "Kisumu"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["location"], "Kisumu");

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "achieng@example.com", "password": "correct-horse"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let app = build_router(testutil::service());

        let (status, body) = send(&app, "GET", "/api/v1/flocks", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");

        let (status, _) = send(&app, "GET", "/api/v1/flocks", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ghost@example.com", "password": "whatever1"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_flocks_are_private() {
        let app = build_router(testutil::service());
        let owner = signup(&app, "owner@example.com").await;
        let other = signup(&app, "other@example.com").await;
        let flock_id = create_flock(&app, &owner, 5).await;

        let uri = format!("/api/v1/flocks/{}", flock_id);
        let (status, _) = send(&app, "GET", &uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "GET", &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Flock not found");

        let (status, body) = send(&app, "GET", "/api/v1/flocks", Some(&other), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);

        let (status, body) =
            send(&app, "GET", &format!("{}/stats", uri), Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_count"], 500);
    }

    #[tokio::test]
    async fn test_starter_plan_limit() {
        let app = build_router(testutil::service());
        let token = signup(&app, "starter@example.com").await;
        create_flock(&app, &token, 1).await;
        create_flock(&app, &token, 2).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/flocks",
            Some(&token),
            Some(json!({"name": "Batch C", "start_date": testutil::today(), "initial_count": 100})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn test_event_replay_status() {
        let app = build_router(testutil::service());
        let token = signup(&app, "events@example.com").await;
        let flock_id = create_flock(&app, &token, 10).await;

        let payload = json!({
            "event_id": "0f8b6c1e-5a0d-4d59-9a3c-2b7d8e1f4a10",
            "flock_id": flock_id,
            "count": 3,
            "cause": "Coccidiosis",
        });
        let (status, first) = send(
            &app,
            "POST",
            "/api/v1/events/mortality",
            Some(&token),
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{first}");

        let (status, replay) =
            send(&app, "POST", "/api/v1/events/mortality", Some(&token), Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replay["id"], first["id"]);

        let item = format!("/api/v1/events/mortality/{}", first["id"].as_str().unwrap());
        let (status, updated) =
            send(&app, "PUT", &item, Some(&token), Some(json!({"count": 4}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["count"], 4);

        let (status, _) = send(&app, "DELETE", &item, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, list) = send(
            &app,
            "GET",
            &format!("/api/v1/events/mortality?flock_id={}", flock_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(list["total"], 0);
    }

    #[tokio::test]
    async fn test_daily_check_raises_alert() {
        let app = build_router(testutil::service());
        let token = signup(&app, "checks@example.com").await;
        let flock_id = create_flock(&app, &token, 3).await;

        let (status, outcome) = send(
            &app,
            "POST",
            "/api/v1/daily-checks",
            Some(&token),
            Some(json!({
                "flock_id": flock_id,
                "temperature_celsius": 25.0,
                "feed_level": "adequate",
                "events": [{
                    "type": "feed_consumption",
                    "data": {
                        "event_id": "7c1f2a9e-0b3d-4e8f-8a6b-1d2c3e4f5a6b",
                        "feed_type": "starter",
                        "quantity_kg": 12.5
                    }
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{outcome}");
        assert_eq!(outcome["events_created"], 1);
        let alerts = outcome["alerts_triggered"].as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["alert_type"], "temperature");
        assert_eq!(alerts[0]["severity"], "critical");

        let (status, checks) = send(
            &app,
            "GET",
            &format!("/api/v1/daily-checks/{}", flock_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(checks.as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            "GET",
            &format!("/api/v1/daily-checks/{}/2001-01-01", flock_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No check found for 2001-01-01");

        let alert_id = alerts[0]["id"].as_str().unwrap();
        let (status, acked) = send(
            &app,
            "POST",
            &format!("/api/v1/alerts/{}/acknowledge", alert_id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(acked["status"], "acknowledged");

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/v1/alerts/{}", alert_id),
            Some(&token),
            Some(json!({"status": "active"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_event_rejects_daily_check() {
        let app = build_router(testutil::service());
        let token = signup(&app, "strict@example.com").await;
        let flock_id = create_flock(&app, &token, 3).await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/daily-checks",
            Some(&token),
            Some(json!({
                "flock_id": flock_id,
                "temperature_celsius": 33.0,
                "events": [{
                    "type": "mortality",
                    "data": {"event_id": "5b1e8f3c-2d4a-4c6b-9e7f-0a1b2c3d4e5f", "count": 0}
                }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, checks) = send(
            &app,
            "GET",
            &format!("/api/v1/daily-checks/{}", flock_id),
            Some(&token),
            None,
        )
        .await;
        assert!(checks.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payment_callback_is_public_and_tolerant() {
        let app = build_router(testutil::service());

        let (status, body) =
            send(&app, "POST", "/api/v1/billing/mpesa/callback", None, Some(json!({"oops": 1})))
                .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/billing/mpesa/callback",
            None,
            Some(json!({"Body": {"stkCallback": {
                "MerchantRequestID": "m-1",
                "CheckoutRequestID": "ws_CO_unknown",
                "ResultCode": 0,
                "ResultDesc": "ok"
            }}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ignored", "reason": "Subscription not found"}));
    }

    #[tokio::test]
    async fn test_subscribe_and_my_subscription() {
        let app = build_router(testutil::service());
        let token = signup(&app, "payer@example.com").await;

        let (status, sub) =
            send(&app, "GET", "/api/v1/billing/my-subscription", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sub["plan_type"], "STARTER");

        let (status, resp) = send(
            &app,
            "POST",
            "/api/v1/billing/subscribe",
            Some(&token),
            Some(json!({
                "plan_type": "PROFESSIONAL",
                "billing_period": "monthly",
                "phone_number": "0712345678"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{resp}");
        assert_eq!(resp["amount"], 500.0);

        let (status, _) = send(
            &app,
            "POST",
            &format!(
                "/api/v1/billing/simulate-callback?mpesa_reference={}",
                resp["mpesa_reference"].as_str().unwrap()
            ),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/billing/subscribe",
            Some(&token),
            Some(json!({"plan_type": "GOLD", "phone_number": "0712345678"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_biosecurity_and_consultation_routes() {
        let app = build_router(testutil::service());
        let token = signup(&app, "hygiene@example.com").await;
        let flock_id = create_flock(&app, &token, 12).await;

        let (status, check) = send(
            &app,
            "POST",
            "/api/v1/biosecurity",
            Some(&token),
            Some(json!({
                "date": testutil::today(),
                "items": [
                    {"task": "Footbath refreshed", "completed": true},
                    {"task": "Visitor log signed"}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{check}");
        assert_eq!(check["items"][1]["completed"], false);

        let (status, list) = send(&app, "GET", "/api/v1/biosecurity", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total"], 1);

        let (status, consultation) = send(
            &app,
            "POST",
            "/api/v1/health/consultations",
            Some(&token),
            Some(json!({
                "flock_id": flock_id,
                "visit_date": testutil::today(),
                "issue": "Swollen eyes"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{consultation}");
        assert_eq!(consultation["status"], "pending");

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/v1/health/consultations/{}", consultation["id"].as_str().unwrap()),
            Some(&token),
            Some(json!({"status": "in_progress", "diagnosis": "Mycoplasma"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{updated}");
        assert_eq!(updated["status"], "in_progress");

        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/v1/biosecurity/{}", check["id"].as_str().unwrap()),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Another farmer sees none of it.
        let other = signup(&app, "neighbour@example.com").await;
        let (_, list) = send(
            &app,
            "GET",
            "/api/v1/health/consultations",
            Some(&other),
            None,
        )
        .await;
        assert_eq!(list["total"], 0);
    }

    #[tokio::test]
    async fn test_analytics_endpoints() {
        let app = build_router(testutil::service());
        let token = signup(&app, "numbers@example.com").await;
        create_flock(&app, &token, 20).await;

        let (status, metrics) = send(
            &app,
            "GET",
            "/api/v1/analytics/dashboard-metrics",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(metrics["active_flocks"], 1);
        assert_eq!(metrics["current_birds"], 500);

        let (status, months) = send(
            &app,
            "GET",
            "/api/v1/analytics/charts/revenue-vs-expenses",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(months.as_array().unwrap().len(), 6);
    }
}
