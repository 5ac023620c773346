//! The standard broiler rules.

use serde_json::json;

use super::{AlertContext, AlertOutcome, AlertRule};
use crate::model::{AlertSeverity, AlertType, ChickBehavior, SupplyLevel};

fn outcome(
    alert_type: AlertType,
    severity: AlertSeverity,
    title: &str,
    message: String,
    metadata: serde_json::Value,
) -> Option<AlertOutcome> {
    Some(AlertOutcome {
        alert_type,
        severity,
        title: title.to_string(),
        message,
        metadata,
    })
}

/// Brooding temperature below the minimum for the flock's age.
pub struct LowTemperature;

impl LowTemperature {
    /// Minimum temperature and a label for the age band.
    pub fn minimum_for(days_old: i64) -> (f64, &'static str) {
        match days_old {
            d if d <= 7 => (32.0, "week 1"),
            d if d <= 14 => (29.3, "week 2"),
            d if d <= 21 => (26.6, "week 3"),
            _ => (24.0, "week 4+"),
        }
    }
}

impl AlertRule for LowTemperature {
    fn name(&self) -> &'static str {
        "low_temperature"
    }

    fn alert_type(&self) -> AlertType {
        AlertType::Temperature
    }

    fn evaluate(&self, ctx: &AlertContext) -> Option<AlertOutcome> {
        let temp = ctx.temperature_celsius?;
        let (min_temp, week) = Self::minimum_for(ctx.days_old);
        if temp >= min_temp {
            return None;
        }
        outcome(
            self.alert_type(),
            AlertSeverity::Critical,
            "Temperature Too Low",
            format!(
                "Temperature is {:.1}°C, below minimum of {:.1}°C for {}. \
                 Chicks may be cold-stressed. Check heat source immediately.",
                temp, min_temp, week
            ),
            json!({
                "current_temp": temp,
                "minimum_temp": min_temp,
                "days_old": ctx.days_old,
            }),
        )
    }
}

pub struct HighTemperature;

impl HighTemperature {
    pub const MAX_TEMP: f64 = 38.0;
}

impl AlertRule for HighTemperature {
    fn name(&self) -> &'static str {
        "high_temperature"
    }

    fn alert_type(&self) -> AlertType {
        AlertType::Temperature
    }

    fn evaluate(&self, ctx: &AlertContext) -> Option<AlertOutcome> {
        let temp = ctx.temperature_celsius?;
        if temp <= Self::MAX_TEMP {
            return None;
        }
        outcome(
            self.alert_type(),
            AlertSeverity::Critical,
            "Temperature Too High",
            format!(
                "Temperature is {:.1}°C, above maximum of {:.1}°C. \
                 Chicks may be heat-stressed. Reduce heat source and improve ventilation.",
                temp,
                Self::MAX_TEMP
            ),
            json!({ "current_temp": temp, "maximum_temp": Self::MAX_TEMP }),
        )
    }
}

/// Cumulative mortality over the week-one or the overall threshold.
pub struct HighMortality;

impl HighMortality {
    pub const MAX_RATE_WEEK_1: f64 = 1.0;
    pub const MAX_RATE_OVERALL: f64 = 5.0;
    pub const CRITICAL_RATE: f64 = 8.0;
}

impl AlertRule for HighMortality {
    fn name(&self) -> &'static str {
        "high_mortality"
    }

    fn alert_type(&self) -> AlertType {
        AlertType::Mortality
    }

    fn evaluate(&self, ctx: &AlertContext) -> Option<AlertOutcome> {
        let rate = ctx.mortality_rate_percent;

        if ctx.days_old <= 7 && rate > Self::MAX_RATE_WEEK_1 {
            return outcome(
                self.alert_type(),
                AlertSeverity::Critical,
                "High Mortality in Week 1",
                format!(
                    "Mortality rate is {:.2}%, exceeding {:.1}% threshold for first week \
                     ({} birds). Immediate investigation required.",
                    rate,
                    Self::MAX_RATE_WEEK_1,
                    ctx.total_deaths
                ),
                json!({
                    "mortality_rate": rate,
                    "threshold": Self::MAX_RATE_WEEK_1,
                    "total_deaths": ctx.total_deaths,
                    "days_old": ctx.days_old,
                }),
            );
        }

        if rate > Self::MAX_RATE_OVERALL {
            let severity = if rate > Self::CRITICAL_RATE {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Warning
            };
            return outcome(
                self.alert_type(),
                severity,
                "High Overall Mortality",
                format!(
                    "Mortality rate is {:.2}%, exceeding {:.1}% threshold ({} birds). \
                     Review health management practices.",
                    rate,
                    Self::MAX_RATE_OVERALL,
                    ctx.total_deaths
                ),
                json!({
                    "mortality_rate": rate,
                    "threshold": Self::MAX_RATE_OVERALL,
                    "total_deaths": ctx.total_deaths,
                }),
            );
        }

        None
    }
}

pub struct LowFeed;

impl AlertRule for LowFeed {
    fn name(&self) -> &'static str {
        "low_feed"
    }

    fn alert_type(&self) -> AlertType {
        AlertType::Feed
    }

    fn evaluate(&self, ctx: &AlertContext) -> Option<AlertOutcome> {
        let level = ctx.feed_level?;
        let metadata = json!({ "feed_level": level.as_str() });
        match level {
            SupplyLevel::Empty => outcome(
                self.alert_type(),
                AlertSeverity::Critical,
                "Feed Supply Empty",
                "Feed supply is empty. Chicks must have continuous access to feed. \
                 Refill immediately."
                    .to_string(),
                metadata,
            ),
            SupplyLevel::Low => outcome(
                self.alert_type(),
                AlertSeverity::Warning,
                "Feed Supply Low",
                "Feed supply is running low. Restock soon to prevent interruption.".to_string(),
                metadata,
            ),
            SupplyLevel::Full | SupplyLevel::Adequate => None,
        }
    }
}

pub struct LowWater;

impl AlertRule for LowWater {
    fn name(&self) -> &'static str {
        "low_water"
    }

    fn alert_type(&self) -> AlertType {
        AlertType::Water
    }

    fn evaluate(&self, ctx: &AlertContext) -> Option<AlertOutcome> {
        let level = ctx.water_level?;
        let metadata = json!({ "water_level": level.as_str() });
        match level {
            SupplyLevel::Empty => outcome(
                self.alert_type(),
                AlertSeverity::Critical,
                "Water Supply Empty",
                "Water supply is empty. Chicks require constant access to clean water. \
                 Refill immediately."
                    .to_string(),
                metadata,
            ),
            SupplyLevel::Low => outcome(
                self.alert_type(),
                AlertSeverity::Warning,
                "Water Supply Low",
                "Water supply is running low. Refill to maintain adequate hydration.".to_string(),
                metadata,
            ),
            SupplyLevel::Full | SupplyLevel::Adequate => None,
        }
    }
}

/// Behaviour that points at cold, heat or illness.
pub struct StressedChicks;

impl AlertRule for StressedChicks {
    fn name(&self) -> &'static str {
        "stressed_chicks"
    }

    fn alert_type(&self) -> AlertType {
        AlertType::Behavior
    }

    fn evaluate(&self, ctx: &AlertContext) -> Option<AlertOutcome> {
        let behavior = ctx.chick_behavior?;
        let temp = match ctx.temperature_celsius {
            Some(t) => format!("{:.1}°C", t),
            None => "not recorded".to_string(),
        };
        let metadata = json!({
            "behavior": behavior.as_str(),
            "temperature": ctx.temperature_celsius,
        });
        match behavior {
            ChickBehavior::Huddling => outcome(
                self.alert_type(),
                AlertSeverity::Warning,
                "Chicks Huddling Together",
                format!(
                    "Chicks are huddling, indicating they may be too cold. \
                     Current temperature: {}. Increase heat source.",
                    temp
                ),
                metadata,
            ),
            ChickBehavior::Panting => outcome(
                self.alert_type(),
                AlertSeverity::Warning,
                "Chicks Panting",
                format!(
                    "Chicks are panting, indicating they may be too hot. \
                     Current temperature: {}. Reduce heat and improve ventilation.",
                    temp
                ),
                metadata,
            ),
            ChickBehavior::Lethargic => outcome(
                self.alert_type(),
                AlertSeverity::Critical,
                "Lethargic Chicks",
                "Chicks appear lethargic. This may indicate illness, poor nutrition, or \
                 environmental stress. Inspect flock immediately and consult veterinarian \
                 if needed."
                    .to_string(),
                json!({ "behavior": behavior.as_str() }),
            ),
            ChickBehavior::Normal | ChickBehavior::Dispersed => None,
        }
    }
}

/// Next outstanding vaccination is overdue, due today, or within two days.
pub struct VaccinationDue;

impl AlertRule for VaccinationDue {
    fn name(&self) -> &'static str {
        "vaccination_due"
    }

    fn alert_type(&self) -> AlertType {
        AlertType::Vaccination
    }

    fn evaluate(&self, ctx: &AlertContext) -> Option<AlertOutcome> {
        let due = ctx.next_vaccination_due_date?;
        let vaccine = ctx.vaccine_name.as_deref().unwrap_or("Unknown vaccine");
        let days_until = (due - ctx.today).num_days();

        if days_until < 0 {
            return outcome(
                self.alert_type(),
                AlertSeverity::Critical,
                "Vaccination Overdue",
                format!(
                    "{} vaccination was due on {}. \
                     Administer as soon as possible to maintain protection.",
                    vaccine, due
                ),
                json!({
                    "vaccine_name": vaccine,
                    "due_date": due.to_string(),
                    "days_overdue": -days_until,
                }),
            );
        }
        if days_until == 0 {
            return outcome(
                self.alert_type(),
                AlertSeverity::Warning,
                "Vaccination Due Today",
                format!("{} vaccination is due today.", vaccine),
                json!({ "vaccine_name": vaccine, "due_date": due.to_string() }),
            );
        }
        if days_until <= 2 {
            return outcome(
                self.alert_type(),
                AlertSeverity::Info,
                "Upcoming Vaccination",
                format!(
                    "{} vaccination is due in {} day(s) on {}.",
                    vaccine, days_until, due
                ),
                json!({
                    "vaccine_name": vaccine,
                    "due_date": due.to_string(),
                    "days_until": days_until,
                }),
            );
        }
        None
    }
}

/// Day-7 weigh-in under target.
pub struct PoorGrowth;

impl PoorGrowth {
    /// Grams, assuming a 40 g day-old chick gaining 4.5x in the first week.
    pub const EXPECTED_WEIGHT_DAY_7: f64 = 180.0;
}

impl AlertRule for PoorGrowth {
    fn name(&self) -> &'static str {
        "poor_growth"
    }

    fn alert_type(&self) -> AlertType {
        AlertType::Growth
    }

    fn evaluate(&self, ctx: &AlertContext) -> Option<AlertOutcome> {
        let weight = ctx.average_weight_grams?;
        if ctx.days_old != 7 || weight <= 0.0 || weight >= Self::EXPECTED_WEIGHT_DAY_7 {
            return None;
        }
        let deficit = Self::EXPECTED_WEIGHT_DAY_7 - weight;
        outcome(
            self.alert_type(),
            AlertSeverity::Warning,
            "Below Expected Weight at Day 7",
            format!(
                "Average weight is {:.1}g, below expected {:.0}g (deficit: {:.1}g). \
                 Review feed quality, quantity, and health management.",
                weight,
                Self::EXPECTED_WEIGHT_DAY_7,
                deficit
            ),
            json!({
                "actual_weight": weight,
                "expected_weight": Self::EXPECTED_WEIGHT_DAY_7,
                "deficit": deficit,
                "days_old": ctx.days_old,
            }),
        )
    }
}
