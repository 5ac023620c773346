use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The four kinds of flock events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Mortality,
    FeedConsumption,
    Vaccination,
    WeightMeasurement,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mortality => "mortality",
            Self::FeedConsumption => "feed_consumption",
            Self::Vaccination => "vaccination",
            Self::WeightMeasurement => "weight_measurement",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Envelope shared by every event kind
// ---------------------------------------------------------------------------

/// Identity and placement of an event. `event_id` is the client-generated
/// idempotency key and is unique per event table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHeader {
    pub id: String,
    pub event_id: String,
    pub flock_id: String,
    pub farmer_id: String,
    pub event_date: NaiveDate,
    pub created_at: String,
    pub updated_at: String,
}

/// A stored event: common header plus the kind-specific body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<B> {
    #[serde(flatten)]
    pub header: EventHeader,
    #[serde(flatten)]
    pub body: B,
}

/// Client payload for any event kind. `flock_id` and `event_date` are
/// filled from the daily check when the event arrives inside one.
#[derive(Debug, Clone, Deserialize)]
pub struct EventInput<B> {
    pub event_id: String,
    #[serde(default)]
    pub flock_id: Option<String>,
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub body: B,
}

/// Query string for event listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventQuery {
    #[serde(default)]
    pub flock_id: Option<String>,
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mortality {
    pub count: i64,
    #[serde(default)]
    pub cause: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub action_taken: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedType {
    Starter,
    Grower,
    Finisher,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Grower => "grower",
            Self::Finisher => "finisher",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConsumption {
    pub feed_type: FeedType,
    pub quantity_kg: f64,
    /// Cost in Kenyan shillings.
    #[serde(default)]
    pub cost_ksh: Option<f64>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdministrationMethod {
    DrinkingWater,
    EyeDrop,
    Injection,
    Spray,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vaccination {
    pub vaccine_name: String,
    pub disease_target: String,
    pub administration_method: AdministrationMethod,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub administered_by: Option<String>,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
    /// Generated from the standard schedule rather than recorded by hand.
    #[serde(default)]
    pub planned: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightMeasurement {
    pub sample_size: i64,
    pub average_weight_grams: f64,
    #[serde(default)]
    pub min_weight_grams: Option<f64>,
    #[serde(default)]
    pub max_weight_grams: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub type MortalityEvent = Event<Mortality>;
pub type FeedConsumptionEvent = Event<FeedConsumption>;
pub type VaccinationEvent = Event<Vaccination>;
pub type WeightMeasurementEvent = Event<WeightMeasurement>;

/// A scheduled vaccination that has not been satisfied yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueVaccination {
    pub vaccine_name: String,
    pub disease_target: String,
    pub due_date: NaiveDate,
}
