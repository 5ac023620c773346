use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub active_flocks: i64,
    pub current_birds: i64,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    pub mortality_rate: f64,
}

/// One month of the revenue vs. expenses chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotals {
    /// `YYYY-MM`.
    pub month: String,
    /// Short month name, e.g. `Jan`.
    pub name: String,
    pub revenue: f64,
    pub expenses: f64,
}
