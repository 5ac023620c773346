//! Idempotent event ingestion.
//!
//! Every event carries a client-generated `event_id`. Storing the same key
//! twice returns the first stored row. Two concurrent submissions race on
//! the table's UNIQUE(event_id) constraint; the loser re-reads the winner.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use henhouse_core::{merge_patch, new_id, now_rfc3339, ListResult};
use henhouse_sql::Value;

use crate::model::{
    DueVaccination, Event, EventHeader, EventInput, EventKind, EventQuery, FeedConsumption,
    Flock, Mortality, Vaccination, WeightMeasurement, WeightMeasurementEvent,
};
use crate::service::schema::{FEED_EVENTS, MORTALITY_EVENTS, VACCINATION_EVENTS, WEIGHT_EVENTS};
use crate::service::{page, round2, validate, FarmError, FarmService};

/// Kind-specific behaviour of an event body.
pub trait EventBody: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EventKind;
    const TABLE: &'static str;

    fn validate(&self) -> Result<(), FarmError>;

    /// Extra indexed columns stored next to the JSON record.
    fn index_columns(&self) -> Vec<(&'static str, Value)>;
}

impl EventBody for Mortality {
    const KIND: EventKind = EventKind::Mortality;
    const TABLE: &'static str = MORTALITY_EVENTS;

    fn validate(&self) -> Result<(), FarmError> {
        validate::positive_count("count", self.count)?;
        validate::optional_text("cause", &self.cause, 100)
    }

    fn index_columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("count", Value::from(self.count)),
            ("cause", Value::from(self.cause.clone())),
        ]
    }
}

impl EventBody for FeedConsumption {
    const KIND: EventKind = EventKind::FeedConsumption;
    const TABLE: &'static str = FEED_EVENTS;

    fn validate(&self) -> Result<(), FarmError> {
        validate::positive("quantity_kg", self.quantity_kg)?;
        if let Some(cost) = self.cost_ksh {
            validate::non_negative("cost_ksh", cost)?;
        }
        validate::optional_text("supplier", &self.supplier, 255)
    }

    fn index_columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("feed_type", Value::from(self.feed_type.as_str())),
            ("quantity_kg", Value::from(self.quantity_kg)),
            ("cost_ksh", Value::from(self.cost_ksh)),
        ]
    }
}

impl EventBody for Vaccination {
    const KIND: EventKind = EventKind::Vaccination;
    const TABLE: &'static str = VACCINATION_EVENTS;

    fn validate(&self) -> Result<(), FarmError> {
        validate::required_text("vaccine_name", &self.vaccine_name, 100)?;
        validate::required_text("disease_target", &self.disease_target, 100)?;
        validate::optional_text("dosage", &self.dosage, 50)?;
        validate::optional_text("administered_by", &self.administered_by, 100)?;
        validate::optional_text("batch_number", &self.batch_number, 50)
    }

    fn index_columns(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("vaccine_name", Value::from(self.vaccine_name.clone())),
            ("disease_target", Value::from(self.disease_target.clone())),
            ("planned", Value::from(self.planned)),
            ("next_due_date", Value::from(self.next_due_date.map(|d| d.to_string()))),
        ]
    }
}

impl EventBody for WeightMeasurement {
    const KIND: EventKind = EventKind::WeightMeasurement;
    const TABLE: &'static str = WEIGHT_EVENTS;

    fn validate(&self) -> Result<(), FarmError> {
        validate::positive_count("sample_size", self.sample_size)?;
        validate::positive("average_weight_grams", self.average_weight_grams)?;
        if let Some(min) = self.min_weight_grams {
            validate::positive("min_weight_grams", min)?;
            if min > self.average_weight_grams {
                return Err(FarmError::Validation(
                    "min_weight_grams must not exceed average_weight_grams".into(),
                ));
            }
        }
        if let Some(max) = self.max_weight_grams {
            validate::positive("max_weight_grams", max)?;
            if max < self.average_weight_grams {
                return Err(FarmError::Validation(
                    "max_weight_grams must not be below average_weight_grams".into(),
                ));
            }
        }
        Ok(())
    }

    fn index_columns(&self) -> Vec<(&'static str, Value)> {
        vec![("average_weight_grams", Value::from(self.average_weight_grams))]
    }
}

impl FarmService {
    /// Turn client input into a validated, not yet stored event on `flock`.
    pub(crate) fn build_event<B: EventBody>(
        &self,
        flock: &Flock,
        input: EventInput<B>,
        default_date: NaiveDate,
    ) -> Result<Event<B>, FarmError> {
        validate::event_key(&input.event_id)?;
        input.body.validate()?;

        let now = now_rfc3339();
        Ok(Event {
            header: EventHeader {
                id: new_id(),
                event_id: input.event_id,
                flock_id: flock.id.clone(),
                farmer_id: flock.farmer_id.clone(),
                event_date: input.event_date.unwrap_or(default_date),
                created_at: now.clone(),
                updated_at: now,
            },
            body: input.body,
        })
    }

    /// Record a standalone event. Returns the stored event and whether it
    /// was newly created.
    pub fn record_event<B: EventBody>(
        &self,
        farmer_id: &str,
        input: EventInput<B>,
    ) -> Result<(Event<B>, bool), FarmError> {
        let flock_id = input
            .flock_id
            .clone()
            .ok_or_else(|| FarmError::Validation("flock_id is required".into()))?;
        let flock = self.get_flock(farmer_id, &flock_id)?;
        let today = chrono::Utc::now().date_naive();
        let event = self.build_event(&flock, input, today)?;
        self.ingest_event(event)
    }

    /// Store `event` unless its idempotency key is already known.
    pub(crate) fn ingest_event<B: EventBody>(
        &self,
        event: Event<B>,
    ) -> Result<(Event<B>, bool), FarmError> {
        if let Some(existing) = self.find_event_by_key::<B>(&event.header.event_id)? {
            return replay(existing, &event);
        }
        self.insert_event(event)
    }

    /// Insert a new event. If the key was stored concurrently since the
    /// caller looked it up, the stored row wins.
    fn insert_event<B: EventBody>(&self, event: Event<B>) -> Result<(Event<B>, bool), FarmError> {
        let mut indexes: Vec<(&str, Value)> = vec![
            ("event_id", Value::from(event.header.event_id.clone())),
            ("flock_id", Value::from(event.header.flock_id.clone())),
            ("farmer_id", Value::from(event.header.farmer_id.clone())),
            ("event_date", Value::from(event.header.event_date.to_string())),
            ("created_at", Value::from(event.header.created_at.clone())),
            ("updated_at", Value::from(event.header.updated_at.clone())),
        ];
        indexes.extend(event.body.index_columns());

        match self.insert_record(B::TABLE, &event.header.id, &event, &indexes) {
            Ok(()) => Ok((event, true)),
            Err(FarmError::Conflict(msg)) => {
                // Lost the race: another request stored this key first.
                debug!(kind = B::KIND.as_str(), event_id = %event.header.event_id, "event key raced");
                match self.find_event_by_key::<B>(&event.header.event_id)? {
                    Some(existing) => replay(existing, &event),
                    None => Err(FarmError::Conflict(msg)),
                }
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) fn find_event_by_key<B: EventBody>(
        &self,
        event_id: &str,
    ) -> Result<Option<Event<B>>, FarmError> {
        self.find_one(
            &format!("SELECT data FROM {} WHERE event_id = ?1", B::TABLE),
            &[Value::from(event_id)],
        )
    }

    pub fn get_event<B: EventBody>(&self, farmer_id: &str, id: &str) -> Result<Event<B>, FarmError> {
        self.get_owned(B::TABLE, id, farmer_id, "Event")
    }

    /// List the farmer's events of one kind, latest `event_date` first.
    pub fn list_events<B: EventBody>(
        &self,
        farmer_id: &str,
        query: &EventQuery,
    ) -> Result<ListResult<Event<B>>, FarmError> {
        let mut filters: Vec<(&str, Value)> = vec![("farmer_id", Value::from(farmer_id))];
        if let Some(flock_id) = &query.flock_id {
            filters.push(("flock_id", Value::from(flock_id.clone())));
        }
        let (items, total) = self.list_records(
            B::TABLE,
            &filters,
            "event_date DESC",
            &page(query.skip, query.limit),
        )?;
        Ok(ListResult { items, total })
    }

    /// Apply a JSON merge patch to an event body and date. Identity fields
    /// cannot change.
    pub fn update_event<B: EventBody>(
        &self,
        farmer_id: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Event<B>, FarmError> {
        let current: Event<B> = self.get_event(farmer_id, id)?;
        if !patch.is_object() {
            return Err(FarmError::Validation("update body must be an object".into()));
        }

        let mut base = serde_json::to_value(&current)?;
        merge_patch(&mut base, &patch);
        let now = now_rfc3339();
        base["id"] = serde_json::json!(current.header.id);
        base["event_id"] = serde_json::json!(current.header.event_id);
        base["flock_id"] = serde_json::json!(current.header.flock_id);
        base["farmer_id"] = serde_json::json!(current.header.farmer_id);
        base["created_at"] = serde_json::json!(current.header.created_at);
        base["updated_at"] = serde_json::json!(now);

        let updated: Event<B> = serde_json::from_value(base)
            .map_err(|e| FarmError::Validation(format!("invalid {} update: {}", B::KIND, e)))?;
        updated.body.validate()?;

        let mut indexes: Vec<(&str, Value)> = vec![
            ("event_date", Value::from(updated.header.event_date.to_string())),
            ("updated_at", Value::from(now)),
        ];
        indexes.extend(updated.body.index_columns());
        self.update_record(B::TABLE, id, &updated, &indexes)?;
        Ok(updated)
    }

    pub fn delete_event<B: EventBody>(&self, farmer_id: &str, id: &str) -> Result<(), FarmError> {
        self.delete_owned(B::TABLE, id, farmer_id, "Event")
    }

    // ── Aggregates ──

    pub(crate) fn total_deaths(&self, flock_id: &str) -> Result<i64, FarmError> {
        self.scalar_i64(
            "SELECT COALESCE(SUM(count), 0) FROM mortality_events WHERE flock_id = ?1",
            &[Value::from(flock_id)],
        )
    }

    pub(crate) fn deaths_by_cause(&self, flock_id: &str) -> Result<BTreeMap<String, i64>, FarmError> {
        let rows = self.sql.query(
            "SELECT COALESCE(NULLIF(cause, ''), 'Unknown') AS cause, SUM(count) AS total
             FROM mortality_events WHERE flock_id = ?1 GROUP BY 1",
            &[Value::from(flock_id)],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| Some((r.get_str("cause")?.to_string(), r.get_i64("total")?)))
            .collect())
    }

    /// Total feed used (kg) and its recorded cost.
    pub(crate) fn feed_totals(&self, flock_id: &str) -> Result<(f64, f64), FarmError> {
        let rows = self.sql.query(
            "SELECT COALESCE(SUM(quantity_kg), 0) AS kg, COALESCE(SUM(cost_ksh), 0) AS cost
             FROM feed_events WHERE flock_id = ?1",
            &[Value::from(flock_id)],
        )?;
        let row = rows.first();
        Ok((
            round2(row.and_then(|r| r.get_f64("kg")).unwrap_or(0.0)),
            round2(row.and_then(|r| r.get_f64("cost")).unwrap_or(0.0)),
        ))
    }

    pub(crate) fn feed_by_type(&self, flock_id: &str) -> Result<BTreeMap<String, f64>, FarmError> {
        let rows = self.sql.query(
            "SELECT feed_type, SUM(quantity_kg) AS kg FROM feed_events
             WHERE flock_id = ?1 GROUP BY feed_type",
            &[Value::from(flock_id)],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| Some((r.get_str("feed_type")?.to_string(), round2(r.get_f64("kg")?))))
            .collect())
    }

    /// Most recent weigh-in, optionally on or before `as_of`.
    pub(crate) fn latest_weight(
        &self,
        flock_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Option<WeightMeasurementEvent>, FarmError> {
        let cutoff = as_of.map(|d| d.to_string()).unwrap_or_else(|| "9999-12-31".into());
        self.find_one(
            "SELECT data FROM weight_events WHERE flock_id = ?1 AND event_date <= ?2
             ORDER BY event_date DESC, created_at DESC LIMIT 1",
            &[Value::from(flock_id), Value::from(cutoff)],
        )
    }

    /// Average daily gain in grams between the first and latest weigh-ins.
    pub(crate) fn growth_rate(&self, flock_id: &str) -> Result<Option<f64>, FarmError> {
        let first: Option<WeightMeasurementEvent> = self.find_one(
            "SELECT data FROM weight_events WHERE flock_id = ?1
             ORDER BY event_date ASC, created_at ASC LIMIT 1",
            &[Value::from(flock_id)],
        )?;
        let latest = self.latest_weight(flock_id, None)?;
        Ok(match (first, latest) {
            (Some(first), Some(latest)) => {
                let days = (latest.header.event_date - first.header.event_date).num_days();
                if days > 0 {
                    let gain = latest.body.average_weight_grams - first.body.average_weight_grams;
                    Some(round2(gain / days as f64))
                } else {
                    None
                }
            }
            _ => None,
        })
    }

    /// Due vaccinations not yet satisfied by a recorded (non-planned)
    /// vaccination against the same disease on or after the due date,
    /// earliest first.
    pub(crate) fn outstanding_vaccinations(
        &self,
        flock_id: &str,
    ) -> Result<Vec<DueVaccination>, FarmError> {
        let rows = self.sql.query(
            "SELECT v.vaccine_name, v.disease_target, v.next_due_date
             FROM vaccination_events v
             WHERE v.flock_id = ?1 AND v.next_due_date IS NOT NULL
               AND NOT EXISTS (
                   SELECT 1 FROM vaccination_events d
                   WHERE d.flock_id = v.flock_id
                     AND d.id != v.id
                     AND d.planned = 0
                     AND d.disease_target = v.disease_target
                     AND d.event_date >= v.next_due_date)
             ORDER BY v.next_due_date ASC, v.vaccine_name ASC",
            &[Value::from(flock_id)],
        )?;

        let mut due = Vec::with_capacity(rows.len());
        for row in &rows {
            let date = row
                .get_str("next_due_date")
                .and_then(|s| s.parse::<NaiveDate>().ok())
                .ok_or_else(|| FarmError::Internal("bad next_due_date column".into()))?;
            due.push(DueVaccination {
                vaccine_name: row.get_str("vaccine_name").unwrap_or_default().to_string(),
                disease_target: row.get_str("disease_target").unwrap_or_default().to_string(),
                due_date: date,
            });
        }
        Ok(due)
    }

    /// Outstanding vaccinations due within `days` of `today` (inclusive).
    pub(crate) fn upcoming_vaccinations(
        &self,
        flock_id: &str,
        today: NaiveDate,
        days: i64,
    ) -> Result<Vec<DueVaccination>, FarmError> {
        let horizon = today + chrono::Duration::days(days);
        Ok(self
            .outstanding_vaccinations(flock_id)?
            .into_iter()
            .filter(|v| v.due_date >= today && v.due_date <= horizon)
            .collect())
    }

    pub(crate) fn overdue_vaccinations(
        &self,
        flock_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<DueVaccination>, FarmError> {
        Ok(self
            .outstanding_vaccinations(flock_id)?
            .into_iter()
            .filter(|v| v.due_date < today)
            .collect())
    }
}

impl FarmService {
    /// Store the standard schedule for a new flock as planned vaccinations.
    pub(crate) fn seed_vaccination_schedule(&self, flock: &Flock) -> Result<(), FarmError> {
        for (due, body) in crate::schedule::planned_doses(flock.start_date) {
            let input = EventInput {
                event_id: uuid::Uuid::new_v4().to_string(),
                flock_id: Some(flock.id.clone()),
                event_date: Some(due),
                body,
            };
            let event = self.build_event(flock, input, due)?;
            self.ingest_event(event)?;
        }
        debug!(flock_id = %flock.id, "seeded vaccination schedule");
        Ok(())
    }
}

/// Resolve a known idempotency key. Reusing a key for another flock is a
/// client error rather than a replay.
pub(crate) fn replay<B>(existing: Event<B>, submitted: &Event<B>) -> Result<(Event<B>, bool), FarmError> {
    if existing.header.flock_id != submitted.header.flock_id {
        return Err(FarmError::Conflict(format!(
            "event_id {} was already used for another flock",
            existing.header.event_id
        )));
    }
    Ok((existing, false))
}

#[cfg(test)]
impl FarmService {
    pub(crate) fn record_test_mortality(
        &self,
        farmer_id: &str,
        flock_id: &str,
        date: NaiveDate,
        count: i64,
        cause: Option<&str>,
    ) -> crate::model::MortalityEvent {
        let (event, created) = self
            .record_event(
                farmer_id,
                EventInput {
                    event_id: uuid::Uuid::new_v4().to_string(),
                    flock_id: Some(flock_id.to_string()),
                    event_date: Some(date),
                    body: Mortality {
                        count,
                        cause: cause.map(str::to_string),
                        symptoms: None,
                        action_taken: None,
                        notes: None,
                    },
                },
            )
            .unwrap();
        assert!(created);
        event
    }
}
