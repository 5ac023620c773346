use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub farmer_id: String,
    pub name: String,
    /// feed, medicine, equipment or any farmer-defined label.
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub minimum_stock: f64,
    #[serde(default)]
    pub cost_per_unit: f64,
    #[serde(default)]
    pub last_restocked: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.minimum_stock
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInventoryItem {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub minimum_stock: f64,
    #[serde(default)]
    pub cost_per_unit: f64,
    #[serde(default)]
    pub last_restocked: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInventoryItem {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub minimum_stock: Option<f64>,
    pub cost_per_unit: Option<f64>,
    pub last_restocked: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryAction {
    Purchase,
    Consumption,
    Adjustment,
    Restock,
    Return,
}

impl InventoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Consumption => "consumption",
            Self::Adjustment => "adjustment",
            Self::Restock => "restock",
            Self::Return => "return",
        }
    }
}

/// Append-only stock movement log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryHistory {
    pub id: String,
    pub inventory_item_id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub action: InventoryAction,
    pub quantity_change: f64,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
}
