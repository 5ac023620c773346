use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    Starter,
    Professional,
    Enterprise,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "STARTER",
            Self::Professional => "PROFESSIONAL",
            Self::Enterprise => "ENTERPRISE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "STARTER" => Some(Self::Starter),
            "PROFESSIONAL" => Some(Self::Professional),
            "ENTERPRISE" => Some(Self::Enterprise),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription lifecycle.
///
/// ```text
/// PENDING → ACTIVE → EXPIRED
///         → CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Expired => "EXPIRED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    #[default]
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub mpesa_reference: Option<String>,
    #[serde(default)]
    pub checkout_request_id: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of `POST /billing/subscribe`. The plan arrives as a plain string
/// so an unknown plan is reported as a validation error.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub plan_type: String,
    #[serde(default)]
    pub billing_period: BillingPeriod,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeResponse {
    pub subscription_id: String,
    pub status: SubscriptionStatus,
    pub amount: f64,
    pub mpesa_reference: String,
    pub checkout_request_id: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Mobile-money callback payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackPayload {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: Option<String>,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: Option<String>,
}

/// Acknowledgement returned to the payment provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallbackAck {
    Processed { result_code: i64 },
    Ignored { reason: String },
    /// The payload could not be read. Still answered with 200 so the
    /// provider stops retrying.
    Error { detail: String },
}

/// Query string for the simulation endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulateCallback {
    pub mpesa_reference: String,
}
