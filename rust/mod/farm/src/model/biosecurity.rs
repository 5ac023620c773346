use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One line of a hygiene checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiosecurityTask {
    pub task: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A dated biosecurity checklist: footbaths, visitor log, disinfection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiosecurityCheck {
    pub id: String,
    pub farmer_id: String,
    pub date: NaiveDate,
    pub items: Vec<BiosecurityTask>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl BiosecurityCheck {
    /// Share of completed tasks, 0 to 100. An empty checklist counts as 0.
    pub fn completion_percent(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        let done = self.items.iter().filter(|t| t.completed).count();
        done as f64 * 100.0 / self.items.len() as f64
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBiosecurityCheck {
    pub date: NaiveDate,
    pub items: Vec<BiosecurityTask>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed_by: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBiosecurityCheck {
    pub date: Option<NaiveDate>,
    pub items: Option<Vec<BiosecurityTask>>,
    pub notes: Option<String>,
    pub completed_by: Option<String>,
}
