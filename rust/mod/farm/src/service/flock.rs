use henhouse_core::{new_id, now_rfc3339, ListResult};
use henhouse_sql::Value;
use tracing::info;

use crate::model::{
    CreateFlock, Flock, FlockQuery, FlockStats, FlockStatus, PlanType, UpdateFlock,
};
use crate::service::schema::{FLOCKS, SALES};
use crate::service::{page, round2, validate, FarmError, FarmService};

impl FarmService {
    /// Create a flock for `farmer_id`, enforcing the plan limit and seeding
    /// the vaccination schedule.
    pub fn create_flock(&self, farmer_id: &str, input: CreateFlock) -> Result<Flock, FarmError> {
        let now = now_rfc3339();
        let flock = Flock {
            id: new_id(),
            farmer_id: farmer_id.to_string(),
            name: input.name,
            breed: input.breed,
            hatchery_source: input.hatchery_source,
            source_location: input.source_location,
            start_date: input.start_date,
            initial_count: input.initial_count,
            expected_end_date: input.expected_end_date,
            cost_per_bird: input.cost_per_bird,
            total_acquisition_cost: input.total_acquisition_cost,
            status: input.status,
            notes: input.notes,
            created_at: now.clone(),
            updated_at: now,
        };
        validate_flock(&flock)?;

        if flock.status == FlockStatus::Active {
            self.enforce_flock_limit(farmer_id, None)?;
        }

        let mut indexes = flock_indexes(&flock);
        indexes.push(("created_at", Value::from(flock.created_at.clone())));
        self.insert_record(FLOCKS, &flock.id, &flock, &indexes)?;

        if self.config.generate_vaccination_schedule {
            self.seed_vaccination_schedule(&flock)?;
        }
        info!(flock_id = %flock.id, farmer_id, "created flock");
        Ok(flock)
    }

    /// Get a flock owned by `farmer_id`.
    pub fn get_flock(&self, farmer_id: &str, id: &str) -> Result<Flock, FarmError> {
        self.get_owned(FLOCKS, id, farmer_id, "Flock")
    }

    /// List the farmer's flocks, newest first.
    pub fn list_flocks(
        &self,
        farmer_id: &str,
        query: &FlockQuery,
    ) -> Result<ListResult<Flock>, FarmError> {
        let mut filters: Vec<(&str, Value)> = vec![("farmer_id", Value::from(farmer_id))];
        if let Some(status) = query.status {
            filters.push(("status", Value::from(status.as_str())));
        }
        let (items, total) = self.list_records(
            FLOCKS,
            &filters,
            "created_at DESC",
            &page(query.skip, query.limit),
        )?;
        Ok(ListResult { items, total })
    }

    /// Partially update a flock. Re-activating a flock counts against the
    /// plan limit like creating one.
    pub fn update_flock(
        &self,
        farmer_id: &str,
        id: &str,
        input: UpdateFlock,
    ) -> Result<Flock, FarmError> {
        let mut flock = self.get_flock(farmer_id, id)?;
        let was_active = flock.status == FlockStatus::Active;

        if let Some(v) = input.name {
            flock.name = v;
        }
        if let Some(v) = input.breed {
            flock.breed = Some(v);
        }
        if let Some(v) = input.hatchery_source {
            flock.hatchery_source = Some(v);
        }
        if let Some(v) = input.source_location {
            flock.source_location = Some(v);
        }
        if let Some(v) = input.start_date {
            flock.start_date = v;
        }
        if let Some(v) = input.initial_count {
            flock.initial_count = v;
        }
        if let Some(v) = input.expected_end_date {
            flock.expected_end_date = Some(v);
        }
        if let Some(v) = input.cost_per_bird {
            flock.cost_per_bird = v;
        }
        if let Some(v) = input.total_acquisition_cost {
            flock.total_acquisition_cost = v;
        }
        if let Some(v) = input.status {
            flock.status = v;
        }
        if let Some(v) = input.notes {
            flock.notes = Some(v);
        }
        validate_flock(&flock)?;

        if flock.status == FlockStatus::Active && !was_active {
            self.enforce_flock_limit(farmer_id, Some(&flock.id))?;
        }

        flock.updated_at = now_rfc3339();
        self.update_record(FLOCKS, &flock.id, &flock, &flock_indexes(&flock))?;
        Ok(flock)
    }

    /// Delete a flock. Checks, events, alerts and sales cascade. Vet
    /// consultations stay and lose their flock link.
    pub fn delete_flock(&self, farmer_id: &str, id: &str) -> Result<(), FarmError> {
        let flock = self.get_flock(farmer_id, id)?;
        self.detach_consultations(farmer_id, &flock.id)?;
        self.delete_owned(FLOCKS, id, farmer_id, "Flock")?;
        info!(flock_id = id, farmer_id, "deleted flock");
        Ok(())
    }

    /// Production summary for one flock.
    pub fn flock_stats(&self, farmer_id: &str, id: &str) -> Result<FlockStats, FarmError> {
        let flock = self.get_flock(farmer_id, id)?;
        let today = chrono::Utc::now().date_naive();

        let total_deaths = self.total_deaths(&flock.id)?;
        let total_sold = self.birds_sold(&flock.id)?;
        let (total_feed_kg, total_feed_cost) = self.feed_totals(&flock.id)?;

        Ok(FlockStats {
            flock_id: flock.id.clone(),
            age_days: flock.age_on(today),
            initial_count: flock.initial_count,
            current_count: (flock.initial_count - total_deaths - total_sold).max(0),
            total_deaths,
            total_sold,
            mortality_rate_percent: mortality_rate(total_deaths, flock.initial_count),
            deaths_by_cause: self.deaths_by_cause(&flock.id)?,
            total_feed_kg,
            total_feed_cost,
            feed_by_type: self.feed_by_type(&flock.id)?,
            latest_average_weight_grams: self
                .latest_weight(&flock.id, None)?
                .map(|w| w.body.average_weight_grams),
            average_daily_gain_grams: self.growth_rate(&flock.id)?,
            upcoming_vaccinations: self.upcoming_vaccinations(&flock.id, today, 7)?,
            overdue_vaccinations: self.overdue_vaccinations(&flock.id, today)?,
        })
    }

    /// Birds sold out of a flock across all recorded sales.
    pub(crate) fn birds_sold(&self, flock_id: &str) -> Result<i64, FarmError> {
        self.scalar_i64(
            &format!("SELECT COALESCE(SUM(quantity), 0) FROM {} WHERE flock_id = ?1", SALES),
            &[Value::from(flock_id)],
        )
    }

    /// The user's effective plan: their active paid subscription, else STARTER.
    pub fn current_plan(&self, user_id: &str) -> Result<PlanType, FarmError> {
        Ok(self
            .active_subscription(user_id)?
            .map(|s| s.plan_type)
            .unwrap_or(PlanType::Starter))
    }

    fn enforce_flock_limit(&self, farmer_id: &str, exclude: Option<&str>) -> Result<(), FarmError> {
        if self.current_plan(farmer_id)? != PlanType::Starter {
            return Ok(());
        }
        let active = self.scalar_i64(
            "SELECT COUNT(*) FROM flocks WHERE farmer_id = ?1 AND status = 'active' AND id != ?2",
            &[Value::from(farmer_id), Value::from(exclude.unwrap_or(""))],
        )?;
        let limit = self.config.starter_active_flock_limit;
        if active as usize >= limit {
            return Err(FarmError::Forbidden(format!(
                "Starter plan is limited to {} active batches. Please upgrade to create more.",
                limit
            )));
        }
        Ok(())
    }
}

/// Cumulative mortality as a percentage of the placed birds.
pub(crate) fn mortality_rate(deaths: i64, initial_count: i64) -> f64 {
    if initial_count <= 0 {
        return 0.0;
    }
    round2(deaths as f64 / initial_count as f64 * 100.0)
}

fn flock_indexes(flock: &Flock) -> Vec<(&'static str, Value)> {
    vec![
        ("farmer_id", Value::from(flock.farmer_id.clone())),
        ("name", Value::from(flock.name.clone())),
        ("status", Value::from(flock.status.as_str())),
        ("start_date", Value::from(flock.start_date.to_string())),
        ("initial_count", Value::from(flock.initial_count)),
        ("updated_at", Value::from(flock.updated_at.clone())),
    ]
}

fn validate_flock(flock: &Flock) -> Result<(), FarmError> {
    validate::required_text("name", &flock.name, 255)?;
    validate::optional_text("breed", &flock.breed, 100)?;
    validate::optional_text("hatchery_source", &flock.hatchery_source, 255)?;
    validate::optional_text("source_location", &flock.source_location, 255)?;
    validate::positive_count("initial_count", flock.initial_count)?;
    validate::non_negative("cost_per_bird", flock.cost_per_bird)?;
    validate::non_negative("total_acquisition_cost", flock.total_acquisition_cost)?;
    if let Some(end) = flock.expected_end_date {
        if end < flock.start_date {
            return Err(FarmError::Validation(
                "expected_end_date must not be before start_date".to_string(),
            ));
        }
    }
    Ok(())
}
