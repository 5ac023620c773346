use serde::{Deserialize, Serialize};

/// What an alert is about. Together with the flock this is the
/// deduplication key for active alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Temperature,
    Mortality,
    Feed,
    Water,
    Behavior,
    Vaccination,
    Growth,
    LowStock,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Mortality => "mortality",
            Self::Feed => "feed",
            Self::Water => "water",
            Self::Behavior => "behavior",
            Self::Vaccination => "vaccination",
            Self::Growth => "growth",
            Self::LowStock => "low_stock",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert lifecycle.
///
/// ```text
/// active → acknowledged → resolved
///        → resolved
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Acknowledged => 1,
            Self::Resolved => 2,
        }
    }

    /// Whether moving from `self` to `next` is allowed. Staying put is
    /// allowed; moving backwards is not.
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub farmer_id: String,
    /// Absent for farm-wide alerts such as low stock without a flock.
    #[serde(default)]
    pub flock_id: Option<String>,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub status: AlertStatus,
    #[serde(default)]
    pub alert_metadata: serde_json::Value,
    pub triggered_at: String,
    #[serde(default)]
    pub acknowledged_at: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of `PUT /alerts/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAlert {
    pub status: AlertStatus,
}

/// Query string for `GET /alerts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertQuery {
    #[serde(default)]
    pub status: Option<AlertStatus>,
    #[serde(default)]
    pub flock_id: Option<String>,
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}
