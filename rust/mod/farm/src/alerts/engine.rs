use tracing::debug;

use super::rules;
use super::{AlertContext, AlertOutcome, AlertRule};

/// Ordered set of rules.
pub struct AlertEngine {
    rules: Vec<Box<dyn AlertRule>>,
}

impl AlertEngine {
    pub fn new(rules: Vec<Box<dyn AlertRule>>) -> Self {
        Self { rules }
    }

    /// The eight standard broiler rules, in evaluation order.
    pub fn with_default_rules() -> Self {
        Self::new(vec![
            Box::new(rules::LowTemperature),
            Box::new(rules::HighTemperature),
            Box::new(rules::HighMortality),
            Box::new(rules::LowFeed),
            Box::new(rules::LowWater),
            Box::new(rules::StressedChicks),
            Box::new(rules::VaccinationDue),
            Box::new(rules::PoorGrowth),
        ])
    }

    /// Evaluate every rule in order and collect the ones that fired.
    pub fn evaluate(&self, ctx: &AlertContext) -> Vec<AlertOutcome> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let outcome = rule.evaluate(ctx);
                if let Some(o) = &outcome {
                    debug!(rule = rule.name(), severity = o.severity.as_str(), "alert rule fired");
                }
                outcome
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertSeverity, AlertType, ChickBehavior, SupplyLevel};

    fn today() -> chrono::NaiveDate {
        "2024-05-10".parse().unwrap()
    }

    #[test]
    fn test_quiet_context_fires_nothing() {
        let engine = AlertEngine::with_default_rules();
        assert_eq!(engine.rules.len(), 8);

        let mut ctx = AlertContext::empty(today());
        ctx.days_old = 10;
        ctx.temperature_celsius = Some(30.0);
        ctx.chick_behavior = Some(ChickBehavior::Normal);
        ctx.feed_level = Some(SupplyLevel::Full);
        ctx.water_level = Some(SupplyLevel::Adequate);
        assert!(engine.evaluate(&ctx).is_empty());
    }

    #[test]
    fn test_outcomes_follow_rule_order() {
        let engine = AlertEngine::with_default_rules();
        let mut ctx = AlertContext::empty(today());
        ctx.days_old = 3;
        ctx.temperature_celsius = Some(28.0);
        ctx.chick_behavior = Some(ChickBehavior::Huddling);
        ctx.water_level = Some(SupplyLevel::Empty);
        ctx.mortality_rate_percent = 1.5;
        ctx.total_deaths = 15;

        let fired: Vec<(AlertType, AlertSeverity)> = engine
            .evaluate(&ctx)
            .into_iter()
            .map(|o| (o.alert_type, o.severity))
            .collect();
        assert_eq!(
            fired,
            vec![
                (AlertType::Temperature, AlertSeverity::Critical),
                (AlertType::Mortality, AlertSeverity::Critical),
                (AlertType::Water, AlertSeverity::Critical),
                (AlertType::Behavior, AlertSeverity::Warning),
            ]
        );
    }
}
