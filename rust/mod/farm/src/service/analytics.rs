use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use henhouse_sql::Value;

use crate::model::{DashboardMetrics, MonthlyTotals};
use crate::service::flock::mortality_rate;
use crate::service::{round2, FarmError, FarmService};

/// Months shown on the revenue vs. expenses chart.
const CHART_MONTHS: u32 = 6;

impl FarmService {
    /// Farm-wide headline numbers.
    pub fn dashboard_metrics(&self, farmer_id: &str) -> Result<DashboardMetrics, FarmError> {
        let farmer = [Value::from(farmer_id)];

        let active_flocks = self.scalar_i64(
            "SELECT COUNT(*) FROM flocks WHERE farmer_id = ?1 AND status = 'active'",
            &farmer,
        )?;
        let current_birds = self.scalar_i64(
            "SELECT COALESCE(SUM(MAX(0, f.initial_count
                 - COALESCE((SELECT SUM(m.count) FROM mortality_events m WHERE m.flock_id = f.id), 0)
                 - COALESCE((SELECT SUM(s.quantity) FROM sales s WHERE s.flock_id = f.id), 0))), 0)
             FROM flocks f WHERE f.farmer_id = ?1 AND f.status = 'active'",
            &farmer,
        )?;
        let total_revenue = self.scalar_f64(
            "SELECT COALESCE(SUM(total_amount), 0) FROM sales WHERE farmer_id = ?1",
            &farmer,
        )?;
        let total_expenses = self.scalar_f64(
            "SELECT COALESCE(SUM(amount), 0) FROM expenditures WHERE farmer_id = ?1",
            &farmer,
        )?;
        let all_initial = self.scalar_i64(
            "SELECT COALESCE(SUM(initial_count), 0) FROM flocks WHERE farmer_id = ?1",
            &farmer,
        )?;
        let all_deaths = self.scalar_i64(
            "SELECT COALESCE(SUM(m.count), 0) FROM mortality_events m
             JOIN flocks f ON f.id = m.flock_id WHERE f.farmer_id = ?1",
            &farmer,
        )?;

        Ok(DashboardMetrics {
            active_flocks,
            current_birds,
            total_revenue: round2(total_revenue),
            total_expenses: round2(total_expenses),
            net_profit: round2(total_revenue - total_expenses),
            mortality_rate: mortality_rate(all_deaths, all_initial),
        })
    }

    /// Monthly revenue and expenses for the last six calendar months,
    /// oldest first, current month included.
    pub fn revenue_vs_expenses(&self, farmer_id: &str) -> Result<Vec<MonthlyTotals>, FarmError> {
        self.revenue_vs_expenses_as_of(farmer_id, chrono::Utc::now().date_naive())
    }

    pub(crate) fn revenue_vs_expenses_as_of(
        &self,
        farmer_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<MonthlyTotals>, FarmError> {
        let months = trailing_months(today, CHART_MONTHS);
        let Some(first) = months.first().copied() else {
            return Ok(Vec::new());
        };

        let mut buckets: BTreeMap<String, MonthlyTotals> = months
            .iter()
            .map(|m| {
                let key = m.format("%Y-%m").to_string();
                let totals = MonthlyTotals {
                    month: key.clone(),
                    name: m.format("%b").to_string(),
                    revenue: 0.0,
                    expenses: 0.0,
                };
                (key, totals)
            })
            .collect();

        let params = [Value::from(farmer_id), Value::from(first.to_string())];
        let revenue = self.sql.query(
            "SELECT substr(date, 1, 7) AS month, SUM(total_amount) AS total
             FROM sales WHERE farmer_id = ?1 AND date >= ?2 GROUP BY 1",
            &params,
        )?;
        for row in &revenue {
            if let (Some(month), Some(total)) = (row.get_str("month"), row.get_f64("total")) {
                if let Some(bucket) = buckets.get_mut(month) {
                    bucket.revenue = round2(total);
                }
            }
        }

        let expenses = self.sql.query(
            "SELECT substr(date, 1, 7) AS month, SUM(amount) AS total
             FROM expenditures WHERE farmer_id = ?1 AND date >= ?2 GROUP BY 1",
            &params,
        )?;
        for row in &expenses {
            if let (Some(month), Some(total)) = (row.get_str("month"), row.get_f64("total")) {
                if let Some(bucket) = buckets.get_mut(month) {
                    bucket.expenses = round2(total);
                }
            }
        }

        Ok(buckets.into_values().collect())
    }
}

/// First days of the `count` months ending with `today`'s month, ascending.
fn trailing_months(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    let current = today.year() * 12 + today.month0() as i32;
    (0..count as i32)
        .rev()
        .filter_map(|back| {
            let idx = current - back;
            NaiveDate::from_ymd_opt(idx.div_euclid(12), idx.rem_euclid(12) as u32 + 1, 1)
        })
        .collect()
}
