use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expenditure {
    pub id: String,
    pub farmer_id: String,
    #[serde(default)]
    pub flock_id: Option<String>,
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub mpesa_transaction_id: Option<String>,
    /// Stock item this purchase fed into, if any.
    #[serde(default)]
    pub inventory_item_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateExpenditure {
    pub date: NaiveDate,
    pub category: String,
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub mpesa_transaction_id: Option<String>,
    #[serde(default)]
    pub flock_id: Option<String>,
    #[serde(default)]
    pub inventory_item_id: Option<String>,
    #[serde(default)]
    pub create_inventory_item: bool,
    #[serde(default)]
    pub new_inventory_name: Option<String>,
    #[serde(default)]
    pub new_inventory_unit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateExpenditure {
    pub date: Option<NaiveDate>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub mpesa_transaction_id: Option<String>,
    pub flock_id: Option<String>,
    pub inventory_item_id: Option<String>,
    #[serde(default)]
    pub create_inventory_item: bool,
    pub new_inventory_name: Option<String>,
    pub new_inventory_unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub farmer_id: String,
    pub flock_id: String,
    pub date: NaiveDate,
    /// Birds sold.
    pub quantity: i64,
    pub price_per_bird: f64,
    pub total_amount: f64,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub buyer_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub mpesa_transaction_id: Option<String>,
    #[serde(default)]
    pub average_weight_grams: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSale {
    pub flock_id: String,
    pub date: NaiveDate,
    pub quantity: i64,
    pub price_per_bird: f64,
    pub total_amount: f64,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub buyer_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub mpesa_transaction_id: Option<String>,
    #[serde(default)]
    pub average_weight_grams: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSale {
    pub flock_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub quantity: Option<i64>,
    pub price_per_bird: Option<f64>,
    pub total_amount: Option<f64>,
    pub buyer_name: Option<String>,
    pub buyer_phone: Option<String>,
    pub notes: Option<String>,
    pub mpesa_transaction_id: Option<String>,
    pub average_weight_grams: Option<f64>,
}

/// Query string for finance listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinanceQuery {
    #[serde(default)]
    pub flock_id: Option<String>,
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}
