use henhouse_sql::SQLStore;

use crate::service::FarmError;

pub const USERS: &str = "users";
pub const FLOCKS: &str = "flocks";
pub const DAILY_CHECKS: &str = "daily_checks";
pub const MORTALITY_EVENTS: &str = "mortality_events";
pub const FEED_EVENTS: &str = "feed_events";
pub const VACCINATION_EVENTS: &str = "vaccination_events";
pub const WEIGHT_EVENTS: &str = "weight_events";
pub const ALERTS: &str = "alerts";
pub const INVENTORY_ITEMS: &str = "inventory_items";
pub const INVENTORY_HISTORY: &str = "inventory_history";
pub const EXPENDITURES: &str = "expenditures";
pub const SALES: &str = "sales";
pub const BIOSECURITY_CHECKS: &str = "biosecurity_checks";
pub const VET_CONSULTATIONS: &str = "vet_consultations";
pub const SUBSCRIPTIONS: &str = "subscriptions";

/// Shared columns of the four event tables. `event_id` is the client
/// idempotency key.
fn event_table(name: &str, extra_columns: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {name} (
            id TEXT PRIMARY KEY,
            event_id TEXT NOT NULL UNIQUE,
            flock_id TEXT NOT NULL REFERENCES flocks(id) ON DELETE CASCADE,
            farmer_id TEXT NOT NULL,
            event_date TEXT NOT NULL,
            {extra_columns}
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{name}_flock_date ON {name}(flock_id, event_date);
        CREATE INDEX IF NOT EXISTS idx_{name}_farmer ON {name}(farmer_id);"
    )
}

/// Initialize the SQLite schema for all farm resources.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), FarmError> {
    let statements = [
        // Users: identity plus credentials
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );"
        .to_string(),

        // Flocks: the central aggregate
        "CREATE TABLE IF NOT EXISTS flocks (
            id TEXT PRIMARY KEY,
            farmer_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            start_date TEXT NOT NULL,
            initial_count INTEGER NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_flocks_farmer_status ON flocks(farmer_id, status);"
        .to_string(),

        // Daily checks: one per flock per day
        "CREATE TABLE IF NOT EXISTS daily_checks (
            id TEXT PRIMARY KEY,
            flock_id TEXT NOT NULL REFERENCES flocks(id) ON DELETE CASCADE,
            farmer_id TEXT NOT NULL,
            check_date TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (flock_id, check_date)
        );"
        .to_string(),

        event_table(MORTALITY_EVENTS, "count INTEGER NOT NULL, cause TEXT,"),
        event_table(
            FEED_EVENTS,
            "feed_type TEXT NOT NULL, quantity_kg REAL NOT NULL, cost_ksh REAL,",
        ),
        event_table(
            VACCINATION_EVENTS,
            "vaccine_name TEXT NOT NULL, disease_target TEXT NOT NULL,
             planned INTEGER NOT NULL DEFAULT 0, next_due_date TEXT,",
        ),
        event_table(WEIGHT_EVENTS, "average_weight_grams REAL NOT NULL,"),

        // Inventory
        "CREATE TABLE IF NOT EXISTS inventory_items (
            id TEXT PRIMARY KEY,
            farmer_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            quantity REAL NOT NULL,
            minimum_stock REAL NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_inventory_farmer ON inventory_items(farmer_id);
        CREATE TABLE IF NOT EXISTS inventory_history (
            id TEXT PRIMARY KEY,
            inventory_item_id TEXT NOT NULL REFERENCES inventory_items(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            date TEXT NOT NULL,
            action TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_inventory_history_item ON inventory_history(inventory_item_id);"
        .to_string(),

        // Alerts: at most one active alert per dedupe key
        "CREATE TABLE IF NOT EXISTS alerts (
            id TEXT PRIMARY KEY,
            farmer_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            flock_id TEXT REFERENCES flocks(id) ON DELETE CASCADE,
            inventory_item_id TEXT REFERENCES inventory_items(id) ON DELETE CASCADE,
            alert_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            status TEXT NOT NULL,
            dedupe_key TEXT NOT NULL,
            triggered_at TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_alerts_active_key
            ON alerts(dedupe_key) WHERE status = 'active';
        CREATE INDEX IF NOT EXISTS idx_alerts_farmer ON alerts(farmer_id, status);"
        .to_string(),

        // Finance
        "CREATE TABLE IF NOT EXISTS expenditures (
            id TEXT PRIMARY KEY,
            farmer_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            flock_id TEXT REFERENCES flocks(id) ON DELETE CASCADE,
            inventory_item_id TEXT,
            date TEXT NOT NULL,
            category TEXT NOT NULL,
            amount REAL NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_expenditures_farmer_date ON expenditures(farmer_id, date);
        CREATE TABLE IF NOT EXISTS sales (
            id TEXT PRIMARY KEY,
            farmer_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            flock_id TEXT NOT NULL REFERENCES flocks(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            total_amount REAL NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sales_farmer_date ON sales(farmer_id, date);"
        .to_string(),

        // Farm health
        "CREATE TABLE IF NOT EXISTS biosecurity_checks (
            id TEXT PRIMARY KEY,
            farmer_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_biosecurity_farmer_date ON biosecurity_checks(farmer_id, date);
        CREATE TABLE IF NOT EXISTS vet_consultations (
            id TEXT PRIMARY KEY,
            farmer_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            flock_id TEXT REFERENCES flocks(id) ON DELETE SET NULL,
            visit_date TEXT NOT NULL,
            status TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_consultations_farmer_date ON vet_consultations(farmer_id, visit_date);"
        .to_string(),

        // Subscriptions
        "CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            plan_type TEXT NOT NULL,
            status TEXT NOT NULL,
            mpesa_reference TEXT UNIQUE,
            checkout_request_id TEXT UNIQUE,
            end_date TEXT,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id, status);"
        .to_string(),
    ];

    for stmt in &statements {
        sql.exec_batch(stmt)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use henhouse_sql::SqliteStore;

    #[test]
    fn test_init_schema_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        init_schema(&store).unwrap();
        init_schema(&store).unwrap();

        let rows = store
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                &[],
            )
            .unwrap();
        let names: Vec<&str> = rows.iter().filter_map(|r| r.get_str("name")).collect();
        for table in [
            USERS, FLOCKS, DAILY_CHECKS, MORTALITY_EVENTS, FEED_EVENTS,
            VACCINATION_EVENTS, WEIGHT_EVENTS, ALERTS, INVENTORY_ITEMS,
            INVENTORY_HISTORY, EXPENDITURES, SALES, BIOSECURITY_CHECKS,
            VET_CONSULTATIONS, SUBSCRIPTIONS,
        ] {
            assert!(names.contains(&table), "missing table {table}");
        }
    }
}
