use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{Alert, EventKind};

/// Observed chick behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChickBehavior {
    Normal,
    Huddling,
    Dispersed,
    Panting,
    Lethargic,
}

impl ChickBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Huddling => "huddling",
            Self::Dispersed => "dispersed",
            Self::Panting => "panting",
            Self::Lethargic => "lethargic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LitterCondition {
    Dry,
    Damp,
    Wet,
    Caked,
}

/// Fill level of a feeder or drinker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyLevel {
    Full,
    Adequate,
    Low,
    Empty,
}

impl SupplyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Adequate => "adequate",
            Self::Low => "low",
            Self::Empty => "empty",
        }
    }
}

/// One observation record per flock per day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCheck {
    pub id: String,
    pub flock_id: String,
    pub farmer_id: String,
    pub check_date: NaiveDate,
    #[serde(default)]
    pub check_time: Option<NaiveTime>,
    #[serde(flatten)]
    pub observations: Observations,
    pub recorded_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// The measurable part of a daily check. On resubmission for the same day,
/// only fields that are present overwrite the stored ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observations {
    #[serde(default)]
    pub temperature_celsius: Option<f64>,
    #[serde(default)]
    pub humidity_percent: Option<f64>,
    #[serde(default)]
    pub chick_behavior: Option<ChickBehavior>,
    #[serde(default)]
    pub litter_condition: Option<LitterCondition>,
    #[serde(default)]
    pub feed_level: Option<SupplyLevel>,
    #[serde(default)]
    pub water_level: Option<SupplyLevel>,
    #[serde(default)]
    pub general_notes: Option<String>,
}

impl Observations {
    /// Overlay the present fields of `other` onto `self`.
    pub fn merge_from(&mut self, other: &Observations) {
        if other.temperature_celsius.is_some() {
            self.temperature_celsius = other.temperature_celsius;
        }
        if other.humidity_percent.is_some() {
            self.humidity_percent = other.humidity_percent;
        }
        if other.chick_behavior.is_some() {
            self.chick_behavior = other.chick_behavior;
        }
        if other.litter_condition.is_some() {
            self.litter_condition = other.litter_condition;
        }
        if other.feed_level.is_some() {
            self.feed_level = other.feed_level;
        }
        if other.water_level.is_some() {
            self.water_level = other.water_level;
        }
        if other.general_notes.is_some() {
            self.general_notes = other.general_notes.clone();
        }
    }
}

/// A typed event carried inside a daily check submission.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: serde_json::Value,
}

/// Body of `POST /daily-checks`.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyCheckSubmission {
    pub flock_id: String,
    /// Defaults to today.
    #[serde(default)]
    pub check_date: Option<NaiveDate>,
    #[serde(default)]
    pub check_time: Option<NaiveTime>,
    #[serde(flatten)]
    pub observations: Observations,
    #[serde(default)]
    pub events: Vec<EventEnvelope>,
}

/// Result of a daily check submission.
#[derive(Debug, Clone, Serialize)]
pub struct DailyCheckOutcome {
    pub check_id: String,
    pub flock_id: String,
    pub check_date: NaiveDate,
    /// Events in the submission (new and replayed).
    pub events_processed: usize,
    /// Events that were newly stored.
    pub events_created: usize,
    pub alerts_triggered: Vec<Alert>,
}

/// Query string for `GET /daily-checks/{flock_id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyCheckQuery {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub limit: Option<usize>,
}
