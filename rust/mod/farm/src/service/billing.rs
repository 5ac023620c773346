//! Paid plans and the mobile-money callback flow.
//!
//! ```text
//! subscribe ──> PENDING ──callback ok──> ACTIVE ──end_date passes──> EXPIRED
//!                  └─────callback fail──> CANCELLED
//! ```

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::{info, warn};

use henhouse_core::{new_id, now_rfc3339};
use henhouse_sql::Value;

use crate::model::{
    BillingPeriod, CallbackAck, CallbackPayload, PlanType, SubscribeRequest, SubscribeResponse,
    Subscription, SubscriptionStatus,
};
use crate::payment::PaymentRequest;
use crate::service::schema::SUBSCRIPTIONS;
use crate::service::{FarmError, FarmService};

/// Amounts at or above this buy a year; below it, a month.
const YEARLY_THRESHOLD: f64 = 2000.0;

/// Price of a paid plan in whole shillings.
pub fn plan_price(plan: PlanType, period: BillingPeriod) -> Option<i64> {
    match (plan, period) {
        (PlanType::Professional, BillingPeriod::Monthly) => Some(500),
        (PlanType::Professional, BillingPeriod::Yearly) => Some(5000),
        (PlanType::Enterprise, _) => Some(10000),
        (PlanType::Starter, _) => None,
    }
}

/// Normalize a Kenyan phone number to `2547XXXXXXXX` form.
pub fn normalize_phone(raw: &str) -> Result<String, FarmError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let phone = match trimmed.strip_prefix('0') {
        Some(rest) => format!("254{}", rest),
        None => trimmed.to_string(),
    };
    if phone.is_empty() || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FarmError::Validation(format!("'{}' is not a valid phone number", raw)));
    }
    Ok(phone)
}

impl FarmService {
    /// Start a paid subscription by pushing a payment prompt to the phone.
    pub fn subscribe(
        &self,
        user_id: &str,
        req: SubscribeRequest,
    ) -> Result<SubscribeResponse, FarmError> {
        let invalid_plan = || FarmError::Validation("Invalid plan type".to_string());
        let plan = PlanType::from_str(req.plan_type.trim()).ok_or_else(invalid_plan)?;
        let amount = plan_price(plan, req.billing_period).ok_or_else(invalid_plan)?;
        let phone = normalize_phone(&req.phone_number)?;

        let now = now_rfc3339();
        let reference = subscription_reference(user_id);
        let mut sub = Subscription {
            id: new_id(),
            user_id: user_id.to_string(),
            plan_type: plan,
            status: SubscriptionStatus::Pending,
            start_date: None,
            end_date: None,
            amount: amount as f64,
            mpesa_reference: Some(reference.clone()),
            checkout_request_id: None,
            phone_number: Some(phone.clone()),
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        self.insert_record(SUBSCRIPTIONS, &sub.id, &sub, &subscription_indexes(&sub))?;

        let request = PaymentRequest {
            phone: &phone,
            amount,
            reference: &reference,
            description: "Subscription Payment",
        };
        let ack = match self.gateway.initiate_payment(&request) {
            Ok(ack) => ack,
            Err(e) => {
                warn!(user_id, reference = %reference, error = %e, "payment prompt failed");
                self.sql.exec(
                    "DELETE FROM subscriptions WHERE id = ?1",
                    &[Value::from(sub.id.clone())],
                )?;
                return Err(FarmError::Upstream(format!("M-Pesa API Error: {}", e)));
            }
        };

        sub.checkout_request_id = Some(ack.checkout_request_id.clone());
        sub.updated_at = now_rfc3339();
        self.update_record(SUBSCRIPTIONS, &sub.id, &sub, &subscription_indexes(&sub))?;
        info!(
            user_id,
            plan = plan.as_str(),
            amount,
            reference = %reference,
            "subscription pending payment"
        );

        Ok(SubscribeResponse {
            subscription_id: sub.id,
            status: sub.status,
            amount: sub.amount,
            mpesa_reference: reference,
            checkout_request_id: ack.checkout_request_id,
            message: "Payment request sent. Enter your M-Pesa PIN to complete the subscription."
                .to_string(),
        })
    }

    /// Apply a provider callback. Never fails for a well-formed payload.
    pub fn handle_payment_callback(
        &self,
        payload: CallbackPayload,
    ) -> Result<CallbackAck, FarmError> {
        let cb = payload.body.stk_callback;
        info!(
            checkout_request_id = ?cb.checkout_request_id,
            result_code = cb.result_code,
            result_desc = ?cb.result_desc,
            "payment callback received"
        );

        let Some(checkout_id) = cb.checkout_request_id.filter(|s| !s.is_empty()) else {
            return Ok(CallbackAck::Ignored {
                reason: "No CheckoutRequestID".to_string(),
            });
        };

        let found: Option<Subscription> = self.find_one(
            "SELECT data FROM subscriptions WHERE checkout_request_id = ?1",
            &[Value::from(checkout_id.clone())],
        )?;
        let Some(sub) = found else {
            warn!(checkout_request_id = %checkout_id, "callback for unknown subscription");
            return Ok(CallbackAck::Ignored {
                reason: "Subscription not found".to_string(),
            });
        };
        if sub.status != SubscriptionStatus::Pending {
            return Ok(CallbackAck::Ignored {
                reason: "Already processed".to_string(),
            });
        }

        if cb.result_code == 0 {
            self.activate_subscription(sub)?;
        } else {
            self.cancel_subscription(sub, cb.result_desc.as_deref())?;
        }
        Ok(CallbackAck::Processed {
            result_code: cb.result_code,
        })
    }

    /// Activate one of the caller's pending subscriptions as if the provider
    /// had confirmed payment.
    pub fn simulate_payment_callback(
        &self,
        user_id: &str,
        reference: &str,
    ) -> Result<Subscription, FarmError> {
        if !self.config.allow_payment_simulation {
            return Err(FarmError::Forbidden(
                "Payment simulation is disabled".to_string(),
            ));
        }
        let sub: Subscription = self
            .find_one(
                "SELECT data FROM subscriptions WHERE mpesa_reference = ?1 AND user_id = ?2",
                &[Value::from(reference), Value::from(user_id)],
            )?
            .ok_or_else(|| FarmError::NotFound("Subscription not found".to_string()))?;
        if sub.status != SubscriptionStatus::Pending {
            return Err(FarmError::Validation(
                "Subscription is not awaiting payment".to_string(),
            ));
        }
        self.activate_subscription(sub)
    }

    /// The caller's current plan record. Users without a paid plan get a
    /// synthetic STARTER record keyed by their own id.
    pub fn my_subscription(&self, user_id: &str) -> Result<Subscription, FarmError> {
        if let Some(sub) = self.active_subscription(user_id)? {
            return Ok(sub);
        }
        let now = now_rfc3339();
        Ok(Subscription {
            id: user_id.to_string(),
            user_id: user_id.to_string(),
            plan_type: PlanType::Starter,
            status: SubscriptionStatus::Active,
            start_date: None,
            end_date: None,
            amount: 0.0,
            mpesa_reference: None,
            checkout_request_id: None,
            phone_number: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Latest ACTIVE subscription that has not run out. Lapsed ones are
    /// marked EXPIRED on the way.
    pub(crate) fn active_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<Subscription>, FarmError> {
        let active: Vec<Subscription> = self.find_all(
            "SELECT data FROM subscriptions WHERE user_id = ?1 AND status = 'ACTIVE'
             ORDER BY created_at DESC, rowid DESC",
            &[Value::from(user_id)],
        )?;

        let now = Utc::now();
        for mut sub in active {
            if !has_lapsed(&sub, now) {
                return Ok(Some(sub));
            }
            sub.status = SubscriptionStatus::Expired;
            sub.updated_at = now_rfc3339();
            self.update_record(SUBSCRIPTIONS, &sub.id, &sub, &subscription_indexes(&sub))?;
            info!(subscription_id = %sub.id, user_id, "subscription expired");
        }
        Ok(None)
    }

    fn activate_subscription(&self, mut sub: Subscription) -> Result<Subscription, FarmError> {
        let now = Utc::now();
        let days = if sub.amount < YEARLY_THRESHOLD { 30 } else { 365 };
        sub.status = SubscriptionStatus::Active;
        sub.start_date = Some(now.to_rfc3339_opts(SecondsFormat::Millis, true));
        sub.end_date = Some((now + Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true));
        sub.updated_at = now_rfc3339();
        self.update_record(SUBSCRIPTIONS, &sub.id, &sub, &subscription_indexes(&sub))?;
        info!(
            subscription_id = %sub.id,
            user_id = %sub.user_id,
            plan = sub.plan_type.as_str(),
            days,
            "subscription activated"
        );
        Ok(sub)
    }

    fn cancel_subscription(
        &self,
        mut sub: Subscription,
        reason: Option<&str>,
    ) -> Result<Subscription, FarmError> {
        sub.status = SubscriptionStatus::Cancelled;
        sub.updated_at = now_rfc3339();
        self.update_record(SUBSCRIPTIONS, &sub.id, &sub, &subscription_indexes(&sub))?;
        warn!(
            subscription_id = %sub.id,
            reference = ?sub.mpesa_reference,
            reason = reason.unwrap_or(""),
            "payment failed; subscription cancelled"
        );
        Ok(sub)
    }
}

/// `SUB-{user}-{millis}-{nonce}`. The nonce keeps two requests from the
/// same user in one millisecond apart.
fn subscription_reference(user_id: &str) -> String {
    let nonce = new_id();
    format!(
        "SUB-{}-{}-{}",
        user_id,
        Utc::now().timestamp_millis(),
        &nonce[..8]
    )
}

fn has_lapsed(sub: &Subscription, now: DateTime<Utc>) -> bool {
    match sub.end_date.as_deref().map(DateTime::parse_from_rfc3339) {
        Some(Ok(end)) => end.with_timezone(&Utc) < now,
        // Open-ended or unreadable end dates never lapse.
        _ => false,
    }
}

fn subscription_indexes(sub: &Subscription) -> Vec<(&'static str, Value)> {
    vec![
        ("user_id", Value::from(sub.user_id.clone())),
        ("plan_type", Value::from(sub.plan_type.as_str())),
        ("status", Value::from(sub.status.as_str())),
        ("mpesa_reference", Value::from(sub.mpesa_reference.clone())),
        ("checkout_request_id", Value::from(sub.checkout_request_id.clone())),
        ("end_date", Value::from(sub.end_date.clone())),
        ("created_at", Value::from(sub.created_at.clone())),
        ("updated_at", Value::from(sub.updated_at.clone())),
    ]
}

#[cfg(test)]
impl FarmService {
    /// Store an already-active subscription that ends `days` from now.
    pub(crate) fn insert_active_subscription_for_test(
        &self,
        user_id: &str,
        plan: PlanType,
        days: i64,
    ) -> Subscription {
        let now = Utc::now();
        let sub = Subscription {
            id: new_id(),
            user_id: user_id.to_string(),
            plan_type: plan,
            status: SubscriptionStatus::Active,
            start_date: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            end_date: Some((now + Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true)),
            amount: 500.0,
            mpesa_reference: Some(format!("SUB-{}-test-{}", user_id, new_id())),
            checkout_request_id: None,
            phone_number: None,
            created_at: now_rfc3339(),
            updated_at: now_rfc3339(),
        };
        self.insert_record(SUBSCRIPTIONS, &sub.id, &sub, &subscription_indexes(&sub))
            .unwrap();
        sub
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{CallbackBody, StkCallback};
    use crate::payment::{PaymentAck, PaymentError, PaymentGateway};
    use crate::service::{testutil, FarmConfig};
    use henhouse_sql::SqliteStore;

    struct DownGateway;

    impl PaymentGateway for DownGateway {
        fn initiate_payment(&self, _: &PaymentRequest<'_>) -> Result<PaymentAck, PaymentError> {
            Err(PaymentError::Unavailable("connection refused".into()))
        }
    }

    fn subscribe_req(plan: &str, period: BillingPeriod) -> SubscribeRequest {
        SubscribeRequest {
            plan_type: plan.to_string(),
            billing_period: period,
            phone_number: "+254 712345678".replace(' ', ""),
        }
    }

    fn callback(checkout: Option<&str>, code: i64) -> CallbackPayload {
        CallbackPayload {
            body: CallbackBody {
                stk_callback: StkCallback {
                    merchant_request_id: Some("29115-34620561-1".into()),
                    checkout_request_id: checkout.map(str::to_string),
                    result_code: code,
                    result_desc: Some("The service request is processed successfully.".into()),
                },
            },
        }
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone(" 0712345678 ").unwrap(), "254712345678");
        assert_eq!(normalize_phone("+254712345678").unwrap(), "254712345678");
        assert_eq!(normalize_phone("254712345678").unwrap(), "254712345678");
        assert!(normalize_phone("07-1234").is_err());
        assert!(normalize_phone("").is_err());
    }

    #[test]
    fn test_plan_prices() {
        assert_eq!(plan_price(PlanType::Professional, BillingPeriod::Monthly), Some(500));
        assert_eq!(plan_price(PlanType::Professional, BillingPeriod::Yearly), Some(5000));
        assert_eq!(plan_price(PlanType::Enterprise, BillingPeriod::Monthly), Some(10000));
        assert_eq!(plan_price(PlanType::Starter, BillingPeriod::Monthly), None);
    }

    #[test]
    fn test_subscribe_and_callback_activates() {
        let svc = testutil::service();
        let user = testutil::farmer(&svc, "pay@example.com");

        let resp = svc
            .subscribe(&user.id, subscribe_req("PROFESSIONAL", BillingPeriod::Monthly))
            .unwrap();
        assert_eq!(resp.status, SubscriptionStatus::Pending);
        assert_eq!(resp.amount, 500.0);
        assert!(resp.mpesa_reference.starts_with(&format!("SUB-{}-", user.id)));
        assert!(resp.checkout_request_id.starts_with("ws_CO_"));

        // Still STARTER until paid.
        assert_eq!(svc.my_subscription(&user.id).unwrap().plan_type, PlanType::Starter);

        let ack = svc
            .handle_payment_callback(callback(Some(&resp.checkout_request_id), 0))
            .unwrap();
        assert_eq!(ack, CallbackAck::Processed { result_code: 0 });

        let sub = svc.my_subscription(&user.id).unwrap();
        assert_eq!(sub.id, resp.subscription_id);
        assert_eq!(sub.plan_type, PlanType::Professional);
        let start = DateTime::parse_from_rfc3339(sub.start_date.as_deref().unwrap()).unwrap();
        let end = DateTime::parse_from_rfc3339(sub.end_date.as_deref().unwrap()).unwrap();
        assert_eq!((end - start).num_days(), 30);

        // A repeated callback is ignored.
        let again = svc
            .handle_payment_callback(callback(Some(&resp.checkout_request_id), 0))
            .unwrap();
        assert_eq!(
            again,
            CallbackAck::Ignored {
                reason: "Already processed".into()
            }
        );
    }

    #[test]
    fn test_back_to_back_subscriptions_get_distinct_references() {
        let svc = testutil::service();
        let user = testutil::farmer(&svc, "twice@example.com");
        let first = svc
            .subscribe(&user.id, subscribe_req("PROFESSIONAL", BillingPeriod::Monthly))
            .unwrap();
        let second = svc
            .subscribe(&user.id, subscribe_req("PROFESSIONAL", BillingPeriod::Monthly))
            .unwrap();
        assert_ne!(first.mpesa_reference, second.mpesa_reference);
        assert_ne!(subscription_reference(&user.id), subscription_reference(&user.id));
    }

    #[test]
    fn test_yearly_amount_buys_a_year() {
        let svc = testutil::service();
        let user = testutil::farmer(&svc, "year@example.com");
        let resp = svc
            .subscribe(&user.id, subscribe_req("ENTERPRISE", BillingPeriod::Monthly))
            .unwrap();
        svc.handle_payment_callback(callback(Some(&resp.checkout_request_id), 0))
            .unwrap();
        let sub = svc.my_subscription(&user.id).unwrap();
        let start = DateTime::parse_from_rfc3339(sub.start_date.as_deref().unwrap()).unwrap();
        let end = DateTime::parse_from_rfc3339(sub.end_date.as_deref().unwrap()).unwrap();
        assert_eq!((end - start).num_days(), 365);
    }

    #[test]
    fn test_failed_payment_cancels() {
        let svc = testutil::service();
        let user = testutil::farmer(&svc, "cancel@example.com");
        let resp = svc
            .subscribe(&user.id, subscribe_req("PROFESSIONAL", BillingPeriod::Yearly))
            .unwrap();
        assert_eq!(resp.amount, 5000.0);

        let ack = svc
            .handle_payment_callback(callback(Some(&resp.checkout_request_id), 1032))
            .unwrap();
        assert_eq!(ack, CallbackAck::Processed { result_code: 1032 });
        assert_eq!(svc.my_subscription(&user.id).unwrap().plan_type, PlanType::Starter);
    }

    #[test]
    fn test_callback_ignores_unknown() {
        let svc = testutil::service();
        assert_eq!(
            svc.handle_payment_callback(callback(None, 0)).unwrap(),
            CallbackAck::Ignored {
                reason: "No CheckoutRequestID".into()
            }
        );
        assert_eq!(
            svc.handle_payment_callback(callback(Some("ws_CO_missing"), 0)).unwrap(),
            CallbackAck::Ignored {
                reason: "Subscription not found".into()
            }
        );
    }

    #[test]
    fn test_invalid_plan_rejected() {
        let svc = testutil::service();
        let user = testutil::farmer(&svc, "plan@example.com");
        for plan in ["STARTER", "GOLD", "professional"] {
            let err = svc
                .subscribe(&user.id, subscribe_req(plan, BillingPeriod::Monthly))
                .unwrap_err();
            assert!(matches!(err, FarmError::Validation(ref m) if m == "Invalid plan type"));
        }
    }

    #[test]
    fn test_gateway_failure_removes_pending_row() {
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        let svc = FarmService::new(sql, FarmConfig::default(), Arc::new(DownGateway)).unwrap();
        let user = testutil::farmer(&svc, "down@example.com");

        let err = svc
            .subscribe(&user.id, subscribe_req("PROFESSIONAL", BillingPeriod::Monthly))
            .unwrap_err();
        assert!(matches!(err, FarmError::Upstream(_)));
        let left = svc
            .scalar_i64("SELECT COUNT(*) FROM subscriptions", &[])
            .unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn test_simulation_gated_by_config() {
        let svc = testutil::service();
        let user = testutil::farmer(&svc, "sim@example.com");
        let resp = svc
            .subscribe(&user.id, subscribe_req("PROFESSIONAL", BillingPeriod::Monthly))
            .unwrap();
        assert!(matches!(
            svc.simulate_payment_callback(&user.id, &resp.mpesa_reference),
            Err(FarmError::Forbidden(_))
        ));

        let svc = testutil::service_with(FarmConfig {
            allow_payment_simulation: true,
            ..Default::default()
        });
        let user = testutil::farmer(&svc, "sim@example.com");
        let resp = svc
            .subscribe(&user.id, subscribe_req("PROFESSIONAL", BillingPeriod::Monthly))
            .unwrap();

        // Another farmer cannot settle it by reference.
        let stranger = testutil::farmer(&svc, "stranger@example.com");
        assert!(matches!(
            svc.simulate_payment_callback(&stranger.id, &resp.mpesa_reference),
            Err(FarmError::NotFound(_))
        ));

        let sub = svc
            .simulate_payment_callback(&user.id, &resp.mpesa_reference)
            .unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(matches!(
            svc.simulate_payment_callback(&user.id, "SUB-nope"),
            Err(FarmError::NotFound(_))
        ));

        // Settled subscriptions keep their dates.
        assert!(matches!(
            svc.simulate_payment_callback(&user.id, &resp.mpesa_reference),
            Err(FarmError::Validation(_))
        ));
        let current = svc.my_subscription(&user.id).unwrap();
        assert_eq!(current.end_date, sub.end_date);

        let failed = svc
            .subscribe(&user.id, subscribe_req("ENTERPRISE", BillingPeriod::Monthly))
            .unwrap();
        svc.handle_payment_callback(callback(Some(&failed.checkout_request_id), 1032))
            .unwrap();
        assert!(matches!(
            svc.simulate_payment_callback(&user.id, &failed.mpesa_reference),
            Err(FarmError::Validation(_))
        ));
    }

    #[test]
    fn test_lapsed_subscription_expires() {
        let svc = testutil::service();
        let user = testutil::farmer(&svc, "lapse@example.com");
        let sub = svc.insert_active_subscription_for_test(&user.id, PlanType::Professional, -1);

        let current = svc.my_subscription(&user.id).unwrap();
        assert_eq!(current.plan_type, PlanType::Starter);
        assert_eq!(current.id, user.id);

        let status = svc
            .sql
            .query(
                "SELECT status FROM subscriptions WHERE id = ?1",
                &[Value::from(sub.id.clone())],
            )
            .unwrap();
        assert_eq!(status[0].get_str("status"), Some("EXPIRED"));
    }
}
