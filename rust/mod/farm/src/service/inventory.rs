use chrono::NaiveDate;
use tracing::info;

use henhouse_core::{new_id, now_rfc3339, ListParams, ListResult};
use henhouse_sql::Value;

use crate::model::{
    CreateInventoryItem, InventoryAction, InventoryHistory, InventoryItem, UpdateInventoryItem,
};
use crate::service::schema::{INVENTORY_HISTORY, INVENTORY_ITEMS};
use crate::service::{validate, FarmError, FarmService};

impl FarmService {
    pub fn create_inventory_item(
        &self,
        farmer_id: &str,
        input: CreateInventoryItem,
    ) -> Result<InventoryItem, FarmError> {
        let now = now_rfc3339();
        let item = InventoryItem {
            id: new_id(),
            farmer_id: farmer_id.to_string(),
            name: input.name.trim().to_string(),
            category: input.category.trim().to_string(),
            quantity: input.quantity,
            unit: input.unit.trim().to_string(),
            minimum_stock: input.minimum_stock,
            cost_per_unit: input.cost_per_unit,
            last_restocked: input.last_restocked,
            notes: input.notes,
            created_at: now.clone(),
            updated_at: now,
        };
        self.insert_inventory_item(&item)?;
        info!(item_id = %item.id, farmer_id, name = %item.name, "created inventory item");
        Ok(item)
    }

    pub(crate) fn insert_inventory_item(&self, item: &InventoryItem) -> Result<(), FarmError> {
        validate_item(item)?;
        let mut indexes = item_indexes(item);
        indexes.push(("created_at", Value::from(item.created_at.clone())));
        self.insert_record(INVENTORY_ITEMS, &item.id, item, &indexes)
    }

    pub(crate) fn save_inventory_item(&self, item: &InventoryItem) -> Result<(), FarmError> {
        validate_item(item)?;
        self.update_record(INVENTORY_ITEMS, &item.id, item, &item_indexes(item))
    }

    pub fn get_inventory_item(&self, farmer_id: &str, id: &str) -> Result<InventoryItem, FarmError> {
        self.get_owned(INVENTORY_ITEMS, id, farmer_id, "Item")
    }

    /// The farmer's stock, alphabetically.
    pub fn list_inventory(
        &self,
        farmer_id: &str,
        page: &ListParams,
    ) -> Result<ListResult<InventoryItem>, FarmError> {
        let (items, total) = self.list_records(
            INVENTORY_ITEMS,
            &[("farmer_id", Value::from(farmer_id))],
            "name COLLATE NOCASE ASC",
            page,
        )?;
        Ok(ListResult { items, total })
    }

    /// Update an item. A quantity change is logged as an adjustment. Any
    /// update that leaves the item at or below its minimum raises a
    /// low-stock alert.
    pub fn update_inventory_item(
        &self,
        farmer_id: &str,
        id: &str,
        input: UpdateInventoryItem,
    ) -> Result<InventoryItem, FarmError> {
        let mut item = self.get_inventory_item(farmer_id, id)?;
        let previous_quantity = item.quantity;

        if let Some(name) = input.name {
            item.name = name.trim().to_string();
        }
        if let Some(category) = input.category {
            item.category = category.trim().to_string();
        }
        if let Some(quantity) = input.quantity {
            item.quantity = quantity;
        }
        if let Some(unit) = input.unit {
            item.unit = unit.trim().to_string();
        }
        if let Some(minimum_stock) = input.minimum_stock {
            item.minimum_stock = minimum_stock;
        }
        if let Some(cost_per_unit) = input.cost_per_unit {
            item.cost_per_unit = cost_per_unit;
        }
        if input.last_restocked.is_some() {
            item.last_restocked = input.last_restocked;
        }
        if input.notes.is_some() {
            item.notes = input.notes;
        }
        item.updated_at = now_rfc3339();
        self.save_inventory_item(&item)?;

        let change = item.quantity - previous_quantity;
        if change != 0.0 {
            self.record_inventory_history(
                &item,
                farmer_id,
                chrono::Utc::now().date_naive(),
                InventoryAction::Adjustment,
                change,
                Some("Manual stock adjustment".to_string()),
            )?;
        }
        self.check_low_stock(&item, None)?;
        Ok(item)
    }

    /// Delete an item together with its history.
    pub fn delete_inventory_item(&self, farmer_id: &str, id: &str) -> Result<(), FarmError> {
        self.delete_owned(INVENTORY_ITEMS, id, farmer_id, "Item")?;
        info!(item_id = id, farmer_id, "deleted inventory item");
        Ok(())
    }

    /// Stock movements for an item, newest first.
    pub fn inventory_history(
        &self,
        farmer_id: &str,
        id: &str,
    ) -> Result<Vec<InventoryHistory>, FarmError> {
        let item = self.get_inventory_item(farmer_id, id)?;
        self.find_all(
            "SELECT data FROM inventory_history WHERE inventory_item_id = ?1
             ORDER BY date DESC, created_at DESC, rowid DESC",
            &[Value::from(item.id)],
        )
    }

    pub(crate) fn record_inventory_history(
        &self,
        item: &InventoryItem,
        user_id: &str,
        date: NaiveDate,
        action: InventoryAction,
        quantity_change: f64,
        notes: Option<String>,
    ) -> Result<InventoryHistory, FarmError> {
        let entry = InventoryHistory {
            id: new_id(),
            inventory_item_id: item.id.clone(),
            user_id: user_id.to_string(),
            date,
            action,
            quantity_change,
            notes,
            created_at: now_rfc3339(),
        };
        self.insert_record(
            INVENTORY_HISTORY,
            &entry.id,
            &entry,
            &[
                ("inventory_item_id", Value::from(entry.inventory_item_id.clone())),
                ("user_id", Value::from(entry.user_id.clone())),
                ("date", Value::from(date.to_string())),
                ("action", Value::from(action.as_str())),
                ("created_at", Value::from(entry.created_at.clone())),
            ],
        )?;
        Ok(entry)
    }
}

fn item_indexes(item: &InventoryItem) -> Vec<(&'static str, Value)> {
    vec![
        ("farmer_id", Value::from(item.farmer_id.clone())),
        ("name", Value::from(item.name.clone())),
        ("category", Value::from(item.category.clone())),
        ("quantity", Value::from(item.quantity)),
        ("minimum_stock", Value::from(item.minimum_stock)),
        ("updated_at", Value::from(item.updated_at.clone())),
    ]
}

fn validate_item(item: &InventoryItem) -> Result<(), FarmError> {
    validate::required_text("name", &item.name, 255)?;
    validate::required_text("category", &item.category, 50)?;
    validate::required_text("unit", &item.unit, 20)?;
    validate::non_negative("quantity", item.quantity)?;
    validate::non_negative("minimum_stock", item.minimum_stock)?;
    validate::non_negative("cost_per_unit", item.cost_per_unit)?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{AlertQuery, AlertSeverity, AlertType};
    use crate::service::testutil;

    pub(crate) fn feed_item(quantity: f64, minimum_stock: f64) -> CreateInventoryItem {
        CreateInventoryItem {
            name: "Broiler Starter Crumbs".into(),
            category: "feed".into(),
            quantity,
            unit: "bags".into(),
            minimum_stock,
            cost_per_unit: 3400.0,
            last_restocked: None,
            notes: None,
        }
    }

    #[test]
    fn test_inventory_crud() {
        let svc = testutil::service();
        let farmer = testutil::farmer(&svc, "stock@example.com");
        let item = svc.create_inventory_item(&farmer.id, feed_item(10.0, 2.0)).unwrap();

        let listed = svc.list_inventory(&farmer.id, &ListParams::default()).unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].name, "Broiler Starter Crumbs");

        let other = testutil::farmer(&svc, "other@example.com");
        assert!(matches!(
            svc.get_inventory_item(&other.id, &item.id),
            Err(FarmError::NotFound(_))
        ));

        svc.delete_inventory_item(&farmer.id, &item.id).unwrap();
        assert!(svc.get_inventory_item(&farmer.id, &item.id).is_err());
    }

    #[test]
    fn test_validation() {
        let svc = testutil::service();
        let farmer = testutil::farmer(&svc, "valid@example.com");
        let mut bad = feed_item(-1.0, 0.0);
        assert!(matches!(
            svc.create_inventory_item(&farmer.id, bad.clone()),
            Err(FarmError::Validation(_))
        ));
        bad.quantity = 1.0;
        bad.unit = "  ".into();
        assert!(svc.create_inventory_item(&farmer.id, bad).is_err());
    }

    #[test]
    fn test_quantity_change_logs_and_alerts() {
        let svc = testutil::service();
        let farmer = testutil::farmer(&svc, "adjust@example.com");
        let item = svc.create_inventory_item(&farmer.id, feed_item(10.0, 3.0)).unwrap();

        // Renaming alone writes no history.
        svc.update_inventory_item(
            &farmer.id,
            &item.id,
            UpdateInventoryItem {
                notes: Some("shed 2".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(svc.inventory_history(&farmer.id, &item.id).unwrap().is_empty());

        let updated = svc
            .update_inventory_item(
                &farmer.id,
                &item.id,
                UpdateInventoryItem {
                    quantity: Some(2.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.quantity, 2.0);

        let history = svc.inventory_history(&farmer.id, &item.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, InventoryAction::Adjustment);
        assert_eq!(history[0].quantity_change, -8.0);

        let alerts = svc.list_alerts(&farmer.id, &AlertQuery::default()).unwrap();
        assert_eq!(alerts.total, 1);
        let alert = &alerts.items[0];
        assert_eq!(alert.alert_type, AlertType::LowStock);
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert_eq!(alert.title, "Low Stock: Broiler Starter Crumbs");
        assert!(alert.flock_id.is_none());

        // Running out escalates the same alert.
        svc.update_inventory_item(
            &farmer.id,
            &item.id,
            UpdateInventoryItem {
                quantity: Some(0.0),
                ..Default::default()
            },
        )
        .unwrap();
        let alerts = svc.list_alerts(&farmer.id, &AlertQuery::default()).unwrap();
        assert_eq!(alerts.total, 1);
        assert_eq!(alerts.items[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_raising_minimum_alerts_without_history() {
        let svc = testutil::service();
        let farmer = testutil::farmer(&svc, "minimum@example.com");
        let item = svc.create_inventory_item(&farmer.id, feed_item(5.0, 0.0)).unwrap();

        let updated = svc
            .update_inventory_item(
                &farmer.id,
                &item.id,
                UpdateInventoryItem {
                    minimum_stock: Some(10.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.quantity, 5.0);
        assert!(svc.inventory_history(&farmer.id, &item.id).unwrap().is_empty());

        let alerts = svc.list_alerts(&farmer.id, &AlertQuery::default()).unwrap();
        assert_eq!(alerts.total, 1);
        assert_eq!(alerts.items[0].alert_type, AlertType::LowStock);
        assert_eq!(alerts.items[0].severity, AlertSeverity::Warning);

        // A later note-only edit keeps the single active alert.
        svc.update_inventory_item(
            &farmer.id,
            &item.id,
            UpdateInventoryItem {
                notes: Some("reorder Friday".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let alerts = svc.list_alerts(&farmer.id, &AlertQuery::default()).unwrap();
        assert_eq!(alerts.total, 1);
    }

    #[test]
    fn test_delete_cascades_history() {
        let svc = testutil::service();
        let farmer = testutil::farmer(&svc, "cascade@example.com");
        let item = svc.create_inventory_item(&farmer.id, feed_item(10.0, 0.0)).unwrap();
        svc.update_inventory_item(
            &farmer.id,
            &item.id,
            UpdateInventoryItem {
                quantity: Some(12.0),
                ..Default::default()
            },
        )
        .unwrap();

        svc.delete_inventory_item(&farmer.id, &item.id).unwrap();
        let left = svc
            .scalar_i64("SELECT COUNT(*) FROM inventory_history", &[])
            .unwrap();
        assert_eq!(left, 0);
    }
}
