//! Daily check submission.
//!
//! A submission is all-or-nothing at the validation stage: every embedded
//! event is decoded, checked and matched against stored idempotency keys
//! before the check row or any event is written.

use chrono::{Duration, NaiveDate, Utc};
use tracing::{debug, info};

use henhouse_core::{new_id, now_rfc3339};
use henhouse_sql::Value;

use crate::model::{
    DailyCheck, DailyCheckOutcome, DailyCheckQuery, DailyCheckSubmission, Event, EventEnvelope,
    EventInput, EventKind, FeedConsumption, Flock, Mortality, Observations, Vaccination,
    WeightMeasurement,
};
use crate::service::event::{replay, EventBody};
use crate::service::schema::DAILY_CHECKS;
use crate::service::{validate, FarmError, FarmService};

const DEFAULT_WINDOW_DAYS: i64 = 30;
const DEFAULT_LIMIT: usize = 30;

/// An embedded event that passed validation and is ready to store.
enum PreparedEvent {
    Mortality(Event<Mortality>),
    Feed(Event<FeedConsumption>),
    Vaccination(Event<Vaccination>),
    Weight(Event<WeightMeasurement>),
}

impl FarmService {
    /// Record a day's observations for a flock together with any events,
    /// then evaluate alerts.
    pub fn submit_daily_check(
        &self,
        farmer_id: &str,
        submission: DailyCheckSubmission,
    ) -> Result<DailyCheckOutcome, FarmError> {
        let flock = self.get_flock(farmer_id, &submission.flock_id)?;
        let check_date = submission
            .check_date
            .unwrap_or_else(|| Utc::now().date_naive());
        validate_observations(&submission.observations)?;

        let prepared = submission
            .events
            .iter()
            .enumerate()
            .map(|(i, envelope)| self.prepare_event(&flock, check_date, envelope, i))
            .collect::<Result<Vec<_>, _>>()?;

        let check = self.upsert_check(
            &flock,
            farmer_id,
            check_date,
            submission.check_time,
            &submission.observations,
        )?;

        let mut events_created = 0;
        for event in prepared {
            let created = match event {
                PreparedEvent::Mortality(e) => self.ingest_event(e)?.1,
                PreparedEvent::Feed(e) => self.ingest_event(e)?.1,
                PreparedEvent::Vaccination(e) => self.ingest_event(e)?.1,
                PreparedEvent::Weight(e) => self.ingest_event(e)?.1,
            };
            if created {
                events_created += 1;
            }
        }

        let alerts_triggered = self.evaluate_flock_alerts(&flock, &check)?;
        info!(
            flock_id = %flock.id,
            check_date = %check_date,
            events = submission.events.len(),
            events_created,
            alerts = alerts_triggered.len(),
            "daily check recorded"
        );

        Ok(DailyCheckOutcome {
            check_id: check.id,
            flock_id: flock.id,
            check_date,
            events_processed: submission.events.len(),
            events_created,
            alerts_triggered,
        })
    }

    fn prepare_event(
        &self,
        flock: &Flock,
        check_date: NaiveDate,
        envelope: &EventEnvelope,
        index: usize,
    ) -> Result<PreparedEvent, FarmError> {
        let at = |e: FarmError| match e {
            FarmError::Validation(m) => FarmError::Validation(format!("events[{}]: {}", index, m)),
            other => other,
        };
        Ok(match envelope.kind {
            EventKind::Mortality => {
                PreparedEvent::Mortality(self.prepare_one(flock, check_date, envelope).map_err(at)?)
            }
            EventKind::FeedConsumption => {
                PreparedEvent::Feed(self.prepare_one(flock, check_date, envelope).map_err(at)?)
            }
            EventKind::Vaccination => {
                PreparedEvent::Vaccination(self.prepare_one(flock, check_date, envelope).map_err(at)?)
            }
            EventKind::WeightMeasurement => {
                PreparedEvent::Weight(self.prepare_one(flock, check_date, envelope).map_err(at)?)
            }
        })
    }

    fn prepare_one<B: EventBody>(
        &self,
        flock: &Flock,
        check_date: NaiveDate,
        envelope: &EventEnvelope,
    ) -> Result<Event<B>, FarmError> {
        let mut input: EventInput<B> = serde_json::from_value(envelope.data.clone())
            .map_err(|e| FarmError::Validation(format!("invalid {} payload: {}", B::KIND, e)))?;
        // Embedded events always belong to the check's flock and day.
        input.flock_id = Some(flock.id.clone());
        input.event_date = Some(check_date);
        let event = self.build_event(flock, input, check_date)?;
        if let Some(existing) = self.find_event_by_key::<B>(&event.header.event_id)? {
            replay(existing, &event)?;
        }
        Ok(event)
    }

    /// Insert the day's check or overlay the new observations onto it.
    fn upsert_check(
        &self,
        flock: &Flock,
        recorded_by: &str,
        check_date: NaiveDate,
        check_time: Option<chrono::NaiveTime>,
        observations: &Observations,
    ) -> Result<DailyCheck, FarmError> {
        if let Some(existing) = self.find_check(&flock.id, check_date)? {
            return self.merge_check(existing, check_time, observations);
        }
        self.insert_check(flock, recorded_by, check_date, check_time, observations)
    }

    /// Insert the day's first check. A concurrent submission that stored
    /// the row first wins and these observations are merged into it.
    fn insert_check(
        &self,
        flock: &Flock,
        recorded_by: &str,
        check_date: NaiveDate,
        check_time: Option<chrono::NaiveTime>,
        observations: &Observations,
    ) -> Result<DailyCheck, FarmError> {
        let now = now_rfc3339();
        let check = DailyCheck {
            id: new_id(),
            flock_id: flock.id.clone(),
            farmer_id: flock.farmer_id.clone(),
            check_date,
            check_time,
            observations: observations.clone(),
            recorded_by: recorded_by.to_string(),
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        let indexes: Vec<(&str, Value)> = vec![
            ("flock_id", Value::from(check.flock_id.clone())),
            ("farmer_id", Value::from(check.farmer_id.clone())),
            ("check_date", Value::from(check_date.to_string())),
            ("created_at", Value::from(now.clone())),
            ("updated_at", Value::from(now)),
        ];
        match self.insert_record(DAILY_CHECKS, &check.id, &check, &indexes) {
            Ok(()) => Ok(check),
            Err(FarmError::Conflict(msg)) => {
                debug!(flock_id = %flock.id, %check_date, "daily check raced");
                match self.find_check(&flock.id, check_date)? {
                    Some(existing) => self.merge_check(existing, check_time, observations),
                    None => Err(FarmError::Conflict(msg)),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn merge_check(
        &self,
        mut check: DailyCheck,
        check_time: Option<chrono::NaiveTime>,
        observations: &Observations,
    ) -> Result<DailyCheck, FarmError> {
        check.observations.merge_from(observations);
        if check_time.is_some() {
            check.check_time = check_time;
        }
        let now = now_rfc3339();
        check.updated_at = now.clone();
        self.update_record(
            DAILY_CHECKS,
            &check.id,
            &check,
            &[("updated_at", Value::from(now))],
        )?;
        Ok(check)
    }

    fn find_check(
        &self,
        flock_id: &str,
        check_date: NaiveDate,
    ) -> Result<Option<DailyCheck>, FarmError> {
        self.find_one(
            "SELECT data FROM daily_checks WHERE flock_id = ?1 AND check_date = ?2",
            &[Value::from(flock_id), Value::from(check_date.to_string())],
        )
    }

    /// Checks for a flock within a date window, newest first.
    pub fn list_daily_checks(
        &self,
        farmer_id: &str,
        flock_id: &str,
        query: &DailyCheckQuery,
    ) -> Result<Vec<DailyCheck>, FarmError> {
        let flock = self.get_flock(farmer_id, flock_id)?;
        let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());
        let start = query
            .start_date
            .unwrap_or(end - Duration::days(DEFAULT_WINDOW_DAYS));
        let limit = query
            .limit
            .unwrap_or(DEFAULT_LIMIT)
            .min(henhouse_core::types::MAX_LIMIT);

        self.find_all(
            "SELECT data FROM daily_checks
             WHERE flock_id = ?1 AND check_date >= ?2 AND check_date <= ?3
             ORDER BY check_date DESC LIMIT ?4",
            &[
                Value::from(flock.id),
                Value::from(start.to_string()),
                Value::from(end.to_string()),
                Value::from(limit as i64),
            ],
        )
    }

    pub fn get_daily_check(
        &self,
        farmer_id: &str,
        flock_id: &str,
        check_date: NaiveDate,
    ) -> Result<DailyCheck, FarmError> {
        let flock = self.get_flock(farmer_id, flock_id)?;
        self.find_check(&flock.id, check_date)?
            .ok_or_else(|| FarmError::NotFound(format!("No check found for {}", check_date)))
    }
}

fn validate_observations(obs: &Observations) -> Result<(), FarmError> {
    if let Some(t) = obs.temperature_celsius {
        validate::in_range("temperature_celsius", t, -10.0, 50.0)?;
    }
    if let Some(h) = obs.humidity_percent {
        validate::in_range("humidity_percent", h, 0.0, 100.0)?;
    }
    Ok(())
}
