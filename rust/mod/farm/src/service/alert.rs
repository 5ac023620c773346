//! Alert persistence: deduplication, lifecycle and sweeps.
//!
//! At most one alert per dedupe key is `active` at a time. The partial
//! unique index on `alerts(dedupe_key) WHERE status = 'active'` backs this
//! up when two requests raise the same alert concurrently.

use chrono::{Duration, SecondsFormat, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use henhouse_core::{new_id, now_rfc3339, ListResult};
use henhouse_sql::Value;

use crate::alerts::{AlertContext, AlertOutcome};
use crate::model::{
    Alert, AlertQuery, AlertSeverity, AlertStatus, AlertType, DailyCheck, Flock, InventoryItem,
};
use crate::service::flock::mortality_rate;
use crate::service::schema::ALERTS;
use crate::service::{page, FarmError, FarmService};

/// What a raised alert is attached to.
pub(crate) struct AlertTarget<'a> {
    pub farmer_id: &'a str,
    pub flock_id: Option<&'a str>,
    pub inventory_item_id: Option<&'a str>,
    pub dedupe_key: String,
}

impl<'a> AlertTarget<'a> {
    pub fn flock(flock: &'a Flock, alert_type: AlertType) -> Self {
        Self {
            farmer_id: &flock.farmer_id,
            flock_id: Some(&flock.id),
            inventory_item_id: None,
            dedupe_key: format!("flock:{}:{}", flock.id, alert_type),
        }
    }

    pub fn inventory(item: &'a InventoryItem, flock_id: Option<&'a str>) -> Self {
        Self {
            farmer_id: &item.farmer_id,
            flock_id,
            inventory_item_id: Some(&item.id),
            dedupe_key: format!("inventory:{}", item.id),
        }
    }
}

impl FarmService {
    /// Rule inputs for `flock` as observed by `check`.
    pub(crate) fn alert_context(
        &self,
        flock: &Flock,
        check: &DailyCheck,
    ) -> Result<AlertContext, FarmError> {
        let total_deaths = self.total_deaths(&flock.id)?;
        let next_due = self.outstanding_vaccinations(&flock.id)?.into_iter().next();
        let weight = self.latest_weight(&flock.id, Some(check.check_date))?;

        let obs = &check.observations;
        Ok(AlertContext {
            temperature_celsius: obs.temperature_celsius,
            chick_behavior: obs.chick_behavior,
            feed_level: obs.feed_level,
            water_level: obs.water_level,
            days_old: flock.age_on(check.check_date),
            mortality_rate_percent: mortality_rate(total_deaths, flock.initial_count),
            total_deaths,
            next_vaccination_due_date: next_due.as_ref().map(|v| v.due_date),
            vaccine_name: next_due.map(|v| v.vaccine_name),
            average_weight_grams: weight.map(|w| w.body.average_weight_grams),
            today: Utc::now().date_naive(),
        })
    }

    /// Run every rule for a flock's check and persist what fired. Returns
    /// the alerts that were created or changed severity.
    pub(crate) fn evaluate_flock_alerts(
        &self,
        flock: &Flock,
        check: &DailyCheck,
    ) -> Result<Vec<Alert>, FarmError> {
        let ctx = self.alert_context(flock, check)?;
        let mut raised = Vec::new();
        for outcome in self.engine.evaluate(&ctx) {
            let target = AlertTarget::flock(flock, outcome.alert_type);
            if let Some(alert) = self.raise_alert(&target, outcome)? {
                raised.push(alert);
            }
        }
        if !raised.is_empty() {
            info!(flock_id = %flock.id, count = raised.len(), "alerts raised");
        }
        Ok(raised)
    }

    /// Create or escalate the active alert for `target`.
    ///
    /// Returns `None` when an active alert with the same severity already
    /// exists.
    pub(crate) fn raise_alert(
        &self,
        target: &AlertTarget<'_>,
        outcome: AlertOutcome,
    ) -> Result<Option<Alert>, FarmError> {
        if let Some(existing) = self.active_alert_by_key(&target.dedupe_key)? {
            return self.refresh_alert(existing, outcome);
        }
        self.insert_alert(target, outcome)
    }

    /// Insert a new active alert. If another request activated the same key
    /// since the caller looked it up, the stored alert is refreshed instead.
    fn insert_alert(
        &self,
        target: &AlertTarget<'_>,
        outcome: AlertOutcome,
    ) -> Result<Option<Alert>, FarmError> {
        let now = now_rfc3339();
        let alert = Alert {
            id: new_id(),
            farmer_id: target.farmer_id.to_string(),
            flock_id: target.flock_id.map(str::to_string),
            alert_type: outcome.alert_type,
            severity: outcome.severity,
            title: outcome.title.clone(),
            message: outcome.message.clone(),
            status: AlertStatus::Active,
            alert_metadata: outcome.metadata.clone(),
            triggered_at: now.clone(),
            acknowledged_at: None,
            resolved_at: None,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        let indexes: Vec<(&str, Value)> = vec![
            ("farmer_id", Value::from(target.farmer_id)),
            ("flock_id", Value::from(target.flock_id)),
            ("inventory_item_id", Value::from(target.inventory_item_id)),
            ("alert_type", Value::from(alert.alert_type.as_str())),
            ("severity", Value::from(alert.severity.as_str())),
            ("status", Value::from(alert.status.as_str())),
            ("dedupe_key", Value::from(target.dedupe_key.clone())),
            ("triggered_at", Value::from(now.clone())),
            ("created_at", Value::from(now.clone())),
            ("updated_at", Value::from(now)),
        ];

        match self.insert_record(ALERTS, &alert.id, &alert, &indexes) {
            Ok(()) => Ok(Some(alert)),
            Err(FarmError::Conflict(msg)) => {
                debug!(key = %target.dedupe_key, "active alert raced");
                match self.active_alert_by_key(&target.dedupe_key)? {
                    Some(existing) => self.refresh_alert(existing, outcome),
                    None => Err(FarmError::Conflict(msg)),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn active_alert_by_key(&self, key: &str) -> Result<Option<Alert>, FarmError> {
        self.find_one(
            "SELECT data FROM alerts WHERE dedupe_key = ?1 AND status = 'active'",
            &[Value::from(key)],
        )
    }

    /// Apply a re-fired rule to an existing active alert.
    fn refresh_alert(
        &self,
        mut alert: Alert,
        outcome: AlertOutcome,
    ) -> Result<Option<Alert>, FarmError> {
        if alert.severity == outcome.severity {
            return Ok(None);
        }
        let now = now_rfc3339();
        debug!(
            alert_id = %alert.id,
            from = alert.severity.as_str(),
            to = outcome.severity.as_str(),
            "alert severity changed"
        );
        alert.severity = outcome.severity;
        alert.title = outcome.title;
        alert.message = outcome.message;
        alert.alert_metadata = outcome.metadata;
        alert.triggered_at = now.clone();
        alert.updated_at = now.clone();
        self.update_record(
            ALERTS,
            &alert.id,
            &alert,
            &[
                ("severity", Value::from(alert.severity.as_str())),
                ("triggered_at", Value::from(now.clone())),
                ("updated_at", Value::from(now)),
            ],
        )?;
        Ok(Some(alert))
    }

    pub fn get_alert(&self, farmer_id: &str, id: &str) -> Result<Alert, FarmError> {
        self.get_owned(ALERTS, id, farmer_id, "Alert")
    }

    /// The farmer's alerts, most recently triggered first.
    pub fn list_alerts(
        &self,
        farmer_id: &str,
        query: &AlertQuery,
    ) -> Result<ListResult<Alert>, FarmError> {
        let mut filters: Vec<(&str, Value)> = vec![("farmer_id", Value::from(farmer_id))];
        if let Some(status) = query.status {
            filters.push(("status", Value::from(status.as_str())));
        }
        if let Some(flock_id) = &query.flock_id {
            filters.push(("flock_id", Value::from(flock_id.clone())));
        }
        let (items, total) = self.list_records(
            ALERTS,
            &filters,
            "triggered_at DESC",
            &page(query.skip, query.limit),
        )?;
        Ok(ListResult { items, total })
    }

    /// Move an alert along its lifecycle.
    pub fn update_alert_status(
        &self,
        farmer_id: &str,
        id: &str,
        next: AlertStatus,
    ) -> Result<Alert, FarmError> {
        let mut alert = self.get_alert(farmer_id, id)?;
        if !alert.status.can_transition_to(next) {
            return Err(FarmError::Validation(format!(
                "cannot change alert status from {} to {}",
                alert.status, next
            )));
        }
        if alert.status == next {
            return Ok(alert);
        }

        let now = now_rfc3339();
        match next {
            AlertStatus::Acknowledged if alert.acknowledged_at.is_none() => {
                alert.acknowledged_at = Some(now.clone());
            }
            AlertStatus::Resolved if alert.resolved_at.is_none() => {
                alert.resolved_at = Some(now.clone());
            }
            _ => {}
        }
        alert.status = next;
        alert.updated_at = now.clone();
        self.update_record(
            ALERTS,
            &alert.id,
            &alert,
            &[
                ("status", Value::from(next.as_str())),
                ("updated_at", Value::from(now)),
            ],
        )?;
        Ok(alert)
    }

    pub fn acknowledge_alert(&self, farmer_id: &str, id: &str) -> Result<Alert, FarmError> {
        self.update_alert_status(farmer_id, id, AlertStatus::Acknowledged)
    }

    pub fn resolve_alert(&self, farmer_id: &str, id: &str) -> Result<Alert, FarmError> {
        self.update_alert_status(farmer_id, id, AlertStatus::Resolved)
    }

    /// Resolve every active alert triggered more than `hours` ago. Returns
    /// the number of alerts resolved.
    pub fn auto_resolve_stale(&self, hours: i64) -> Result<usize, FarmError> {
        let cutoff = (Utc::now() - Duration::hours(hours)).to_rfc3339_opts(SecondsFormat::Millis, true);
        let stale: Vec<Alert> = self.find_all(
            "SELECT data FROM alerts WHERE status = 'active' AND triggered_at < ?1",
            &[Value::from(cutoff)],
        )?;

        let mut resolved = 0;
        for alert in stale {
            match self.update_alert_status(&alert.farmer_id, &alert.id, AlertStatus::Resolved) {
                Ok(_) => resolved += 1,
                Err(e) => warn!(alert_id = %alert.id, error = %e, "failed to auto-resolve alert"),
            }
        }
        if resolved > 0 {
            info!(resolved, hours, "auto-resolved stale alerts");
        }
        Ok(resolved)
    }

    /// Raise a low-stock alert when `item` is at or below its minimum.
    pub(crate) fn check_low_stock(
        &self,
        item: &InventoryItem,
        flock_id: Option<&str>,
    ) -> Result<Option<Alert>, FarmError> {
        if !item.is_low_stock() {
            return Ok(None);
        }
        let severity = if item.quantity > 0.0 {
            AlertSeverity::Warning
        } else {
            AlertSeverity::Critical
        };
        let outcome = AlertOutcome {
            alert_type: AlertType::LowStock,
            severity,
            title: format!("Low Stock: {}", item.name),
            message: format!(
                "Inventory item '{}' is low. Current: {} {}, Minimum: {} {}. Please restock.",
                item.name, item.quantity, item.unit, item.minimum_stock, item.unit
            ),
            metadata: json!({
                "inventory_item_id": item.id,
                "current_quantity": item.quantity,
                "minimum_stock": item.minimum_stock,
                "unit": item.unit,
            }),
        };
        let raised = self.raise_alert(&AlertTarget::inventory(item, flock_id), outcome)?;
        if raised.is_some() {
            info!(item_id = %item.id, quantity = item.quantity, "low stock alert raised");
        }
        Ok(raised)
    }
}
