use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FlockStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a flock. Only `active` flocks count towards plan limits
/// and dashboard bird totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlockStatus {
    #[default]
    Active,
    Completed,
    Sold,
    Culled,
    Terminated,
}

impl FlockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Sold => "sold",
            Self::Culled => "culled",
            Self::Terminated => "terminated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "sold" => Some(Self::Sold),
            "culled" => Some(Self::Culled),
            "terminated" => Some(Self::Terminated),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Flock
// ---------------------------------------------------------------------------

/// A batch of birds tracked from placement to sale or cull.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flock {
    pub id: String,
    pub farmer_id: String,

    pub name: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub hatchery_source: Option<String>,
    #[serde(default)]
    pub source_location: Option<String>,

    /// Placement date; day 0 for age calculations.
    pub start_date: NaiveDate,
    pub initial_count: i64,
    #[serde(default)]
    pub expected_end_date: Option<NaiveDate>,

    #[serde(default)]
    pub cost_per_bird: f64,
    #[serde(default)]
    pub total_acquisition_cost: f64,

    pub status: FlockStatus,
    #[serde(default)]
    pub notes: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

impl Flock {
    /// Age in days on `on`. Placement day is day 0.
    pub fn age_on(&self, on: NaiveDate) -> i64 {
        (on - self.start_date).num_days()
    }
}

/// Input for `POST /flocks`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFlock {
    pub name: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub hatchery_source: Option<String>,
    #[serde(default)]
    pub source_location: Option<String>,
    pub start_date: NaiveDate,
    pub initial_count: i64,
    #[serde(default)]
    pub expected_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub cost_per_bird: f64,
    #[serde(default)]
    pub total_acquisition_cost: f64,
    #[serde(default)]
    pub status: FlockStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input for `PUT /flocks/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFlock {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub hatchery_source: Option<String>,
    pub source_location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub initial_count: Option<i64>,
    pub expected_end_date: Option<NaiveDate>,
    pub cost_per_bird: Option<f64>,
    pub total_acquisition_cost: Option<f64>,
    pub status: Option<FlockStatus>,
    pub notes: Option<String>,
}

/// Query string for `GET /flocks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlockQuery {
    #[serde(default)]
    pub status: Option<FlockStatus>,
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Computed per-flock summary returned by `GET /flocks/{id}/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct FlockStats {
    pub flock_id: String,
    pub age_days: i64,
    pub initial_count: i64,
    pub current_count: i64,
    pub total_deaths: i64,
    pub total_sold: i64,
    pub mortality_rate_percent: f64,
    pub deaths_by_cause: std::collections::BTreeMap<String, i64>,
    pub total_feed_kg: f64,
    pub total_feed_cost: f64,
    pub feed_by_type: std::collections::BTreeMap<String, f64>,
    pub latest_average_weight_grams: Option<f64>,
    pub average_daily_gain_grams: Option<f64>,
    pub upcoming_vaccinations: Vec<super::DueVaccination>,
    pub overdue_vaccinations: Vec<super::DueVaccination>,
}
