use tracing::info;

use henhouse_core::{new_id, now_rfc3339, ListParams, ListResult};
use henhouse_sql::Value;

use crate::model::{BiosecurityCheck, CreateBiosecurityCheck, UpdateBiosecurityCheck};
use crate::service::schema::BIOSECURITY_CHECKS;
use crate::service::{validate, FarmError, FarmService};

impl FarmService {
    pub fn create_biosecurity_check(
        &self,
        farmer_id: &str,
        input: CreateBiosecurityCheck,
    ) -> Result<BiosecurityCheck, FarmError> {
        let now = now_rfc3339();
        let check = BiosecurityCheck {
            id: new_id(),
            farmer_id: farmer_id.to_string(),
            date: input.date,
            items: input.items,
            notes: input.notes,
            completed_by: input.completed_by,
            created_at: now.clone(),
            updated_at: now,
        };
        validate_check(&check)?;
        self.insert_record(BIOSECURITY_CHECKS, &check.id, &check, &check_indexes(&check, true))?;
        info!(
            check_id = %check.id,
            farmer_id,
            date = %check.date,
            completion = check.completion_percent(),
            "recorded biosecurity check"
        );
        Ok(check)
    }

    pub fn get_biosecurity_check(
        &self,
        farmer_id: &str,
        id: &str,
    ) -> Result<BiosecurityCheck, FarmError> {
        self.get_owned(BIOSECURITY_CHECKS, id, farmer_id, "Biosecurity record")
    }

    /// The farmer's checklists, newest first.
    pub fn list_biosecurity_checks(
        &self,
        farmer_id: &str,
        page: &ListParams,
    ) -> Result<ListResult<BiosecurityCheck>, FarmError> {
        let (items, total) = self.list_records(
            BIOSECURITY_CHECKS,
            &[("farmer_id", Value::from(farmer_id))],
            "date DESC",
            page,
        )?;
        Ok(ListResult { items, total })
    }

    pub fn update_biosecurity_check(
        &self,
        farmer_id: &str,
        id: &str,
        input: UpdateBiosecurityCheck,
    ) -> Result<BiosecurityCheck, FarmError> {
        let mut check = self.get_biosecurity_check(farmer_id, id)?;
        if let Some(date) = input.date {
            check.date = date;
        }
        if let Some(items) = input.items {
            check.items = items;
        }
        if input.notes.is_some() {
            check.notes = input.notes;
        }
        if input.completed_by.is_some() {
            check.completed_by = input.completed_by;
        }
        validate_check(&check)?;

        check.updated_at = now_rfc3339();
        self.update_record(BIOSECURITY_CHECKS, &check.id, &check, &check_indexes(&check, false))?;
        Ok(check)
    }

    pub fn delete_biosecurity_check(&self, farmer_id: &str, id: &str) -> Result<(), FarmError> {
        self.delete_owned(BIOSECURITY_CHECKS, id, farmer_id, "Biosecurity record")
    }
}

fn validate_check(check: &BiosecurityCheck) -> Result<(), FarmError> {
    for (i, item) in check.items.iter().enumerate() {
        validate::required_text("task", &item.task, 255).map_err(|e| match e {
            FarmError::Validation(m) => FarmError::Validation(format!("items[{}]: {}", i, m)),
            other => other,
        })?;
    }
    validate::optional_text("completed_by", &check.completed_by, 255)?;
    Ok(())
}

fn check_indexes(check: &BiosecurityCheck, with_created: bool) -> Vec<(&'static str, Value)> {
    let mut cols = vec![
        ("farmer_id", Value::from(check.farmer_id.clone())),
        ("date", Value::from(check.date.to_string())),
        ("updated_at", Value::from(check.updated_at.clone())),
    ];
    if with_created {
        cols.push(("created_at", Value::from(check.created_at.clone())));
    }
    cols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BiosecurityTask;
    use crate::service::testutil;

    fn task(name: &str, completed: bool) -> BiosecurityTask {
        BiosecurityTask {
            task: name.to_string(),
            completed,
            notes: None,
        }
    }

    fn checklist(date: &str) -> CreateBiosecurityCheck {
        CreateBiosecurityCheck {
            date: date.parse().unwrap(),
            items: vec![
                task("Footbath refreshed", true),
                task("Visitor log signed", true),
                task("Brooder disinfected", false),
                task("Dead birds removed", true),
            ],
            notes: None,
            completed_by: Some("Wanjiku".into()),
        }
    }

    #[test]
    fn test_biosecurity_crud() {
        let svc = testutil::service();
        let farmer = testutil::farmer(&svc, "bio@example.com");

        let older = svc
            .create_biosecurity_check(&farmer.id, checklist("2024-06-01"))
            .unwrap();
        let newer = svc
            .create_biosecurity_check(&farmer.id, checklist("2024-06-02"))
            .unwrap();
        assert_eq!(older.completion_percent(), 75.0);

        let listed = svc
            .list_biosecurity_checks(&farmer.id, &ListParams::default())
            .unwrap();
        assert_eq!(listed.total, 2);
        assert_eq!(listed.items[0].id, newer.id);

        let updated = svc
            .update_biosecurity_check(
                &farmer.id,
                &older.id,
                UpdateBiosecurityCheck {
                    items: Some(vec![task("Footbath refreshed", true)]),
                    notes: Some("Short day".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.completion_percent(), 100.0);
        assert_eq!(updated.completed_by.as_deref(), Some("Wanjiku"));

        let stored = svc.get_biosecurity_check(&farmer.id, &older.id).unwrap();
        assert_eq!(stored.notes.as_deref(), Some("Short day"));

        svc.delete_biosecurity_check(&farmer.id, &older.id).unwrap();
        assert!(matches!(
            svc.delete_biosecurity_check(&farmer.id, &older.id),
            Err(FarmError::NotFound(_))
        ));
    }

    #[test]
    fn test_other_farmer_and_validation() {
        let svc = testutil::service();
        let owner = testutil::farmer(&svc, "bio-owner@example.com");
        let other = testutil::farmer(&svc, "bio-other@example.com");
        let check = svc
            .create_biosecurity_check(&owner.id, checklist("2024-06-01"))
            .unwrap();

        match svc.get_biosecurity_check(&other.id, &check.id) {
            Err(FarmError::NotFound(m)) => assert_eq!(m, "Biosecurity record not found"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(svc
            .update_biosecurity_check(&other.id, &check.id, Default::default())
            .is_err());

        let mut blank = checklist("2024-06-03");
        blank.items.push(task("  ", false));
        match svc.create_biosecurity_check(&owner.id, blank) {
            Err(FarmError::Validation(m)) => assert!(m.starts_with("items[4]:"), "{m}"),
            other => panic!("unexpected {other:?}"),
        }

        let empty = BiosecurityCheck {
            items: Vec::new(),
            ..check
        };
        assert_eq!(empty.completion_percent(), 0.0);
    }
}
