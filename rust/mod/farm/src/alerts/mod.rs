//! Threshold rules evaluated against a flock's daily observation.
//!
//! Rules are pure: they see an [`AlertContext`] and return at most one
//! [`AlertOutcome`]. Persisting and deduplicating outcomes is the service's
//! job (see `service::alert`).

mod engine;
pub mod rules;

use chrono::NaiveDate;

use crate::model::{AlertSeverity, AlertType, ChickBehavior, SupplyLevel};

pub use engine::AlertEngine;

/// Everything a rule may look at.
#[derive(Debug, Clone)]
pub struct AlertContext {
    pub temperature_celsius: Option<f64>,
    pub chick_behavior: Option<ChickBehavior>,
    pub feed_level: Option<SupplyLevel>,
    pub water_level: Option<SupplyLevel>,
    /// Flock age on the check date; placement day is 0.
    pub days_old: i64,
    /// Cumulative mortality as a percentage of placed birds.
    pub mortality_rate_percent: f64,
    pub total_deaths: i64,
    pub next_vaccination_due_date: Option<NaiveDate>,
    pub vaccine_name: Option<String>,
    /// Latest weigh-in on or before the check date.
    pub average_weight_grams: Option<f64>,
    pub today: NaiveDate,
}

impl AlertContext {
    /// A context with no observations, for building tests and partial checks.
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            temperature_celsius: None,
            chick_behavior: None,
            feed_level: None,
            water_level: None,
            days_old: 0,
            mortality_rate_percent: 0.0,
            total_deaths: 0,
            next_vaccination_due_date: None,
            vaccine_name: None,
            average_weight_grams: None,
            today,
        }
    }
}

/// A fired rule.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertOutcome {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
}

/// A single threshold check.
pub trait AlertRule: Send + Sync {
    /// Stable rule name, used in logs.
    fn name(&self) -> &'static str;

    fn alert_type(&self) -> AlertType;

    fn evaluate(&self, ctx: &AlertContext) -> Option<AlertOutcome>;
}
