//! Vet consultations.
//!
//! A consultation may point at one of the farmer's flocks. Deleting the
//! flock keeps the consultation and clears the link.

use tracing::{debug, info};

use henhouse_core::{new_id, now_rfc3339, ListResult};
use henhouse_sql::Value;

use crate::model::{ConsultationQuery, CreateConsultation, UpdateConsultation, VetConsultation};
use crate::service::schema::VET_CONSULTATIONS;
use crate::service::{page, validate, FarmError, FarmService};

impl FarmService {
    pub fn create_consultation(
        &self,
        farmer_id: &str,
        input: CreateConsultation,
    ) -> Result<VetConsultation, FarmError> {
        if let Some(flock_id) = &input.flock_id {
            self.get_flock(farmer_id, flock_id)?;
        }
        let now = now_rfc3339();
        let consultation = VetConsultation {
            id: new_id(),
            farmer_id: farmer_id.to_string(),
            flock_id: input.flock_id,
            visit_date: input.visit_date,
            issue: input.issue.trim().to_string(),
            symptoms: input.symptoms,
            diagnosis: input.diagnosis,
            treatment: input.treatment,
            vet_name: input.vet_name,
            vet_phone: input.vet_phone,
            images: input.images,
            status: input.status,
            notes: input.notes,
            created_at: now.clone(),
            updated_at: now,
        };
        validate_consultation(&consultation)?;
        self.insert_record(
            VET_CONSULTATIONS,
            &consultation.id,
            &consultation,
            &consultation_indexes(&consultation, true),
        )?;
        info!(
            consultation_id = %consultation.id,
            farmer_id,
            flock_id = ?consultation.flock_id,
            issue = %consultation.issue,
            "recorded vet consultation"
        );
        Ok(consultation)
    }

    pub fn get_consultation(&self, farmer_id: &str, id: &str) -> Result<VetConsultation, FarmError> {
        self.get_owned(VET_CONSULTATIONS, id, farmer_id, "Consultation")
    }

    /// The farmer's consultations by visit date, newest first.
    pub fn list_consultations(
        &self,
        farmer_id: &str,
        query: &ConsultationQuery,
    ) -> Result<ListResult<VetConsultation>, FarmError> {
        let mut filters: Vec<(&str, Value)> = vec![("farmer_id", Value::from(farmer_id))];
        if let Some(flock_id) = &query.flock_id {
            filters.push(("flock_id", Value::from(flock_id.clone())));
        }
        if let Some(status) = query.status {
            filters.push(("status", Value::from(status.as_str())));
        }
        let (items, total) = self.list_records(
            VET_CONSULTATIONS,
            &filters,
            "visit_date DESC",
            &page(query.skip, query.limit),
        )?;
        Ok(ListResult { items, total })
    }

    pub fn update_consultation(
        &self,
        farmer_id: &str,
        id: &str,
        input: UpdateConsultation,
    ) -> Result<VetConsultation, FarmError> {
        let mut c = self.get_consultation(farmer_id, id)?;
        if let Some(flock_id) = input.flock_id {
            self.get_flock(farmer_id, &flock_id)?;
            c.flock_id = Some(flock_id);
        }
        if let Some(visit_date) = input.visit_date {
            c.visit_date = visit_date;
        }
        if let Some(issue) = input.issue {
            c.issue = issue.trim().to_string();
        }
        if input.symptoms.is_some() {
            c.symptoms = input.symptoms;
        }
        if input.diagnosis.is_some() {
            c.diagnosis = input.diagnosis;
        }
        if input.treatment.is_some() {
            c.treatment = input.treatment;
        }
        if input.vet_name.is_some() {
            c.vet_name = input.vet_name;
        }
        if input.vet_phone.is_some() {
            c.vet_phone = input.vet_phone;
        }
        if let Some(images) = input.images {
            c.images = images;
        }
        if let Some(status) = input.status {
            c.status = status;
        }
        if input.notes.is_some() {
            c.notes = input.notes;
        }
        validate_consultation(&c)?;

        c.updated_at = now_rfc3339();
        self.update_record(VET_CONSULTATIONS, &c.id, &c, &consultation_indexes(&c, false))?;
        Ok(c)
    }

    pub fn delete_consultation(&self, farmer_id: &str, id: &str) -> Result<(), FarmError> {
        self.delete_owned(VET_CONSULTATIONS, id, farmer_id, "Consultation")
    }

    /// Clear the flock link on the farmer's consultations before the flock
    /// row goes away. The column is also `ON DELETE SET NULL`; this keeps
    /// the stored record in step with it.
    pub(crate) fn detach_consultations(
        &self,
        farmer_id: &str,
        flock_id: &str,
    ) -> Result<(), FarmError> {
        let now = now_rfc3339();
        let detached = self.sql.exec(
            "UPDATE vet_consultations
             SET flock_id = NULL,
                 data = json_set(data, '$.flock_id', NULL, '$.updated_at', ?3),
                 updated_at = ?3
             WHERE flock_id = ?1 AND farmer_id = ?2",
            &[Value::from(flock_id), Value::from(farmer_id), Value::from(now)],
        )?;
        if detached > 0 {
            debug!(flock_id, detached, "detached consultations from flock");
        }
        Ok(())
    }
}

fn validate_consultation(c: &VetConsultation) -> Result<(), FarmError> {
    validate::required_text("issue", &c.issue, 255)?;
    validate::optional_text("vet_name", &c.vet_name, 255)?;
    validate::optional_text("vet_phone", &c.vet_phone, 50)?;
    Ok(())
}

fn consultation_indexes(c: &VetConsultation, with_created: bool) -> Vec<(&'static str, Value)> {
    let mut cols = vec![
        ("farmer_id", Value::from(c.farmer_id.clone())),
        ("flock_id", Value::from(c.flock_id.clone())),
        ("visit_date", Value::from(c.visit_date.to_string())),
        ("status", Value::from(c.status.as_str())),
        ("updated_at", Value::from(c.updated_at.clone())),
    ];
    if with_created {
        cols.push(("created_at", Value::from(c.created_at.clone())));
    }
    cols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConsultationStatus;
    use crate::service::testutil;

    fn visit(flock_id: Option<&str>, date: &str) -> CreateConsultation {
        CreateConsultation {
            flock_id: flock_id.map(str::to_string),
            visit_date: date.parse().unwrap(),
            issue: "Bloody droppings".into(),
            symptoms: Some("Ruffled feathers, low feed intake".into()),
            diagnosis: None,
            treatment: None,
            vet_name: Some("Dr. Otieno".into()),
            vet_phone: Some("0712345678".into()),
            images: vec!["uploads/droppings-1.jpg".into()],
            status: ConsultationStatus::Pending,
            notes: None,
        }
    }

    #[test]
    fn test_consultation_crud_and_filters() {
        let svc = testutil::service();
        let farmer = testutil::farmer(&svc, "vet@example.com");
        let flock = testutil::flock(&svc, &farmer, testutil::today(), 300);

        let linked = svc
            .create_consultation(&farmer.id, visit(Some(&flock.id), "2024-07-01"))
            .unwrap();
        let general = svc
            .create_consultation(&farmer.id, visit(None, "2024-07-05"))
            .unwrap();
        assert_eq!(linked.status, ConsultationStatus::Pending);

        let all = svc
            .list_consultations(&farmer.id, &ConsultationQuery::default())
            .unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].id, general.id);

        let by_flock = svc
            .list_consultations(
                &farmer.id,
                &ConsultationQuery {
                    flock_id: Some(flock.id.clone()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(by_flock.total, 1);
        assert_eq!(by_flock.items[0].id, linked.id);

        let treated = svc
            .update_consultation(
                &farmer.id,
                &linked.id,
                UpdateConsultation {
                    diagnosis: Some("Coccidiosis".into()),
                    treatment: Some("Amprolium in water, 5 days".into()),
                    status: Some(ConsultationStatus::Resolved),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(treated.diagnosis.as_deref(), Some("Coccidiosis"));
        assert_eq!(treated.images.len(), 1);

        let resolved = svc
            .list_consultations(
                &farmer.id,
                &ConsultationQuery {
                    status: Some(ConsultationStatus::Resolved),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(resolved.total, 1);

        svc.delete_consultation(&farmer.id, &general.id).unwrap();
        assert!(matches!(
            svc.get_consultation(&farmer.id, &general.id),
            Err(FarmError::NotFound(_))
        ));
    }

    #[test]
    fn test_flock_must_be_owned() {
        let svc = testutil::service();
        let owner = testutil::farmer(&svc, "vet-owner@example.com");
        let other = testutil::farmer(&svc, "vet-other@example.com");
        let flock = testutil::flock(&svc, &owner, testutil::today(), 300);

        assert!(matches!(
            svc.create_consultation(&other.id, visit(Some(&flock.id), "2024-07-01")),
            Err(FarmError::NotFound(_))
        ));

        let mut blank = visit(None, "2024-07-01");
        blank.issue = " ".into();
        assert!(matches!(
            svc.create_consultation(&owner.id, blank),
            Err(FarmError::Validation(_))
        ));
    }

    #[test]
    fn test_deleting_flock_keeps_consultation() {
        let svc = testutil::service();
        let farmer = testutil::farmer(&svc, "vet-detach@example.com");
        let flock = testutil::flock(&svc, &farmer, testutil::today(), 300);
        let c = svc
            .create_consultation(&farmer.id, visit(Some(&flock.id), "2024-07-01"))
            .unwrap();

        svc.delete_flock(&farmer.id, &flock.id).unwrap();

        let kept = svc.get_consultation(&farmer.id, &c.id).unwrap();
        assert!(kept.flock_id.is_none());
        assert_eq!(kept.issue, "Bloody droppings");
        let unlinked = svc
            .scalar_i64(
                "SELECT COUNT(*) FROM vet_consultations WHERE flock_id IS NULL",
                &[],
            )
            .unwrap();
        assert_eq!(unlinked, 1);
    }
}
