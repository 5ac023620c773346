use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }
}

/// A vet visit or reported health issue. The flock link is cleared, not
/// cascaded, when the flock is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VetConsultation {
    pub id: String,
    pub farmer_id: String,
    #[serde(default)]
    pub flock_id: Option<String>,
    pub visit_date: NaiveDate,
    /// Main complaint or reason for the visit.
    pub issue: String,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub vet_name: Option<String>,
    #[serde(default)]
    pub vet_phone: Option<String>,
    /// Image URLs or storage paths.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: ConsultationStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateConsultation {
    #[serde(default)]
    pub flock_id: Option<String>,
    pub visit_date: NaiveDate,
    pub issue: String,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub vet_name: Option<String>,
    #[serde(default)]
    pub vet_phone: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: ConsultationStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateConsultation {
    pub flock_id: Option<String>,
    pub visit_date: Option<NaiveDate>,
    pub issue: Option<String>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub vet_name: Option<String>,
    pub vet_phone: Option<String>,
    pub images: Option<Vec<String>>,
    pub status: Option<ConsultationStatus>,
    pub notes: Option<String>,
}

/// Query string for `GET /health/consultations`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsultationQuery {
    #[serde(default)]
    pub flock_id: Option<String>,
    #[serde(default)]
    pub status: Option<ConsultationStatus>,
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}
