pub mod schema;
pub mod validate;
pub mod user;
pub mod flock;
pub mod daily_check;
pub mod event;
pub mod alert;
pub mod inventory;
pub mod finance;
pub mod biosecurity;
pub mod health;
pub mod billing;
pub mod analytics;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use henhouse_core::ListParams;
use henhouse_sql::{SQLError, SQLStore, Value};

use crate::alerts::AlertEngine;
use crate::payment::PaymentGateway;

/// Farm service error type.
#[derive(Debug, Error)]
pub enum FarmError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("upstream: {0}")]
    Upstream(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl From<FarmError> for henhouse_core::ServiceError {
    fn from(e: FarmError) -> Self {
        use henhouse_core::ServiceError;
        match e {
            FarmError::NotFound(m) => ServiceError::NotFound(m),
            FarmError::Conflict(m) => ServiceError::Conflict(m),
            FarmError::Validation(m) => ServiceError::Validation(m),
            FarmError::Unauthorized(m) => ServiceError::Unauthorized(m),
            FarmError::Forbidden(m) => ServiceError::PermissionDenied(m),
            FarmError::Upstream(m) => ServiceError::Upstream(m),
            FarmError::Storage(m) => ServiceError::Storage(m),
            FarmError::Internal(m) => ServiceError::Internal(m),
        }
    }
}

impl From<SQLError> for FarmError {
    fn from(e: SQLError) -> Self {
        if e.is_unique_violation() {
            FarmError::Conflict(e.to_string())
        } else {
            FarmError::Storage(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FarmError {
    fn from(e: serde_json::Error) -> Self {
        FarmError::Internal(e.to_string())
    }
}

/// Configuration for the farm service.
#[derive(Debug, Clone)]
pub struct FarmConfig {
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 7 days).
    pub token_ttl: i64,
    /// Active flocks allowed on the free STARTER plan.
    pub starter_active_flock_limit: usize,
    /// Seed the standard vaccination schedule when a flock is created.
    pub generate_vaccination_schedule: bool,
    /// Enable `POST /billing/simulate-callback`.
    pub allow_payment_simulation: bool,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "henhouse-dev-secret-change-me".to_string(),
            token_ttl: 604800,
            starter_active_flock_limit: 2,
            generate_vaccination_schedule: true,
            allow_payment_simulation: false,
        }
    }
}

/// The farm service. Holds storage, the alert engine and the payment gateway.
pub struct FarmService {
    pub(crate) sql: Arc<dyn SQLStore>,
    pub(crate) config: FarmConfig,
    pub(crate) engine: AlertEngine,
    pub(crate) gateway: Arc<dyn PaymentGateway>,
}

impl FarmService {
    /// Create a new FarmService, initializing the DB schema.
    pub fn new(
        sql: Arc<dyn SQLStore>,
        config: FarmConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Arc<Self>, FarmError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self {
            sql,
            config,
            engine: AlertEngine::with_default_rules(),
            gateway,
        }))
    }

    pub fn config(&self) -> &FarmConfig {
        &self.config
    }

    // ── Generic CRUD helpers ──

    /// Insert a record as JSON into a table with indexed columns.
    pub(crate) fn insert_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), FarmError> {
        let json = serde_json::to_string(record)?;

        let mut cols = vec!["id", "data"];
        let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
        let mut params = vec![Value::Text(id.to_string()), Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            cols.push(col);
            placeholders.push(format!("?{}", i + 3));
            params.push(val.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            cols.join(", "),
            placeholders.join(", "),
        );

        self.sql.exec(&sql, &params)?;
        Ok(())
    }

    /// Fetch a record owned by `farmer_id`. Rows belonging to someone else
    /// are reported exactly like missing rows.
    pub(crate) fn get_owned<T: DeserializeOwned>(
        &self,
        table: &str,
        id: &str,
        farmer_id: &str,
        label: &str,
    ) -> Result<T, FarmError> {
        let sql = format!("SELECT data FROM {} WHERE id = ?1 AND farmer_id = ?2", table);
        self.find_one(&sql, &[Value::from(id), Value::from(farmer_id)])?
            .ok_or_else(|| FarmError::NotFound(format!("{} not found", label)))
    }

    /// Run a query selecting a `data` column and decode the first row.
    pub(crate) fn find_one<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<T>, FarmError> {
        let rows = self.sql.query(sql, params)?;
        match rows.first() {
            Some(row) => Ok(Some(decode_row(row)?)),
            None => Ok(None),
        }
    }

    /// Run a query selecting a `data` column and decode every row.
    pub(crate) fn find_all<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<T>, FarmError> {
        let rows = self.sql.query(sql, params)?;
        rows.iter().map(decode_row).collect()
    }

    /// Update a record's JSON data and indexed columns.
    pub(crate) fn update_record<T: Serialize>(
        &self,
        table: &str,
        id: &str,
        record: &T,
        indexes: &[(&str, Value)],
    ) -> Result<(), FarmError> {
        let json = serde_json::to_string(record)?;

        let mut sets = vec!["data = ?1".to_string()];
        let mut params: Vec<Value> = vec![Value::Text(json)];

        for (i, (col, val)) in indexes.iter().enumerate() {
            sets.push(format!("{} = ?{}", col, i + 2));
            params.push(val.clone());
        }

        let id_idx = params.len() + 1;
        params.push(Value::Text(id.to_string()));

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            sets.join(", "),
            id_idx,
        );

        let affected = self.sql.exec(&sql, &params)?;
        if affected == 0 {
            return Err(FarmError::NotFound(format!("{}/{}", table, id)));
        }
        Ok(())
    }

    /// Delete a record owned by `farmer_id`.
    pub(crate) fn delete_owned(
        &self,
        table: &str,
        id: &str,
        farmer_id: &str,
        label: &str,
    ) -> Result<(), FarmError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1 AND farmer_id = ?2", table);
        let affected = self
            .sql
            .exec(&sql, &[Value::from(id), Value::from(farmer_id)])?;
        if affected == 0 {
            return Err(FarmError::NotFound(format!("{} not found", label)));
        }
        Ok(())
    }

    /// List records with filters and pagination.
    ///
    /// A filter key that is a bare column name is an equality test. A key
    /// carrying its own operator (`"check_date >="`) is used as written.
    pub(crate) fn list_records<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, Value)],
        order_by: &str,
        page: &ListParams,
    ) -> Result<(Vec<T>, usize), FarmError> {
        let mut where_clauses = Vec::new();
        let mut params = Vec::new();

        for (i, (col, val)) in filters.iter().enumerate() {
            let idx = i + 1;
            if col.contains(' ') {
                where_clauses.push(format!("{} ?{}", col, idx));
            } else {
                where_clauses.push(format!("{} = ?{}", col, idx));
            }
            params.push(val.clone());
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_clauses.join(" AND "))
        };

        // Count
        let count_sql = format!("SELECT COUNT(*) AS cnt FROM {}{}", table, where_sql);
        let total = self.scalar_i64(&count_sql, &params)? as usize;

        // Items
        let limit_idx = params.len() + 1;
        let offset_idx = params.len() + 2;
        params.push(Value::Integer(page.effective_limit() as i64));
        params.push(Value::Integer(page.skip as i64));

        let sql = format!(
            "SELECT data FROM {}{} ORDER BY {}, rowid DESC LIMIT ?{} OFFSET ?{}",
            table, where_sql, order_by, limit_idx, offset_idx,
        );

        let items = self.find_all(&sql, &params)?;
        Ok((items, total))
    }

    /// First column of the first row as an integer; NULL and no rows are 0.
    pub(crate) fn scalar_i64(&self, sql: &str, params: &[Value]) -> Result<i64, FarmError> {
        let rows = self.sql.query(sql, params)?;
        Ok(rows
            .first()
            .and_then(|r| r.columns.first())
            .map(|(_, v)| match v {
                Value::Integer(i) => *i,
                Value::Real(f) => *f as i64,
                _ => 0,
            })
            .unwrap_or(0))
    }

    /// First column of the first row as a float; NULL and no rows are 0.
    pub(crate) fn scalar_f64(&self, sql: &str, params: &[Value]) -> Result<f64, FarmError> {
        let rows = self.sql.query(sql, params)?;
        Ok(rows
            .first()
            .and_then(|r| r.columns.first())
            .map(|(_, v)| match v {
                Value::Integer(i) => *i as f64,
                Value::Real(f) => *f,
                _ => 0.0,
            })
            .unwrap_or(0.0))
    }
}

/// Build paging parameters from optional `skip`/`limit` query values.
pub fn page(skip: Option<usize>, limit: Option<usize>) -> ListParams {
    let defaults = ListParams::default();
    ListParams::new(skip.unwrap_or(defaults.skip), limit.unwrap_or(defaults.limit))
}

/// Round to two decimal places.
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn decode_row<T: DeserializeOwned>(row: &henhouse_sql::Row) -> Result<T, FarmError> {
    let data = row
        .get_str("data")
        .ok_or_else(|| FarmError::Internal("missing data column".into()))?;
    Ok(serde_json::from_str(data)?)
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use henhouse_sql::SqliteStore;

    use super::{FarmConfig, FarmService};
    use crate::model::{CreateFlock, Flock, FlockStatus, RegisterUser, User};
    use crate::payment::SandboxGateway;

    pub fn service_with(config: FarmConfig) -> Arc<FarmService> {
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        FarmService::new(sql, config, Arc::new(SandboxGateway::new("174379"))).unwrap()
    }

    /// A service without schedule generation, so event tables start empty.
    pub fn service() -> Arc<FarmService> {
        service_with(FarmConfig {
            generate_vaccination_schedule: false,
            ..Default::default()
        })
    }

    pub fn farmer(svc: &FarmService, email: &str) -> User {
        svc.register(RegisterUser {
            email: email.to_string(),
            password: "correct-horse".to_string(),
            full_name: Some("Test Farmer".to_string()),
            phone_number: None,
            location: Some("Nakuru".to_string()),
        })
        .unwrap()
    }

    pub fn new_flock(name: &str, start_date: NaiveDate, initial_count: i64) -> CreateFlock {
        CreateFlock {
            name: name.to_string(),
            breed: Some("Cobb 500".to_string()),
            hatchery_source: None,
            source_location: None,
            start_date,
            initial_count,
            expected_end_date: None,
            cost_per_bird: 80.0,
            total_acquisition_cost: 80.0 * initial_count as f64,
            status: FlockStatus::Active,
            notes: None,
        }
    }

    pub fn flock(svc: &FarmService, farmer: &User, start_date: NaiveDate, initial_count: i64) -> Flock {
        svc.create_flock(&farmer.id, new_flock("Batch A", start_date, initial_count))
            .unwrap()
    }

    pub fn today() -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}
