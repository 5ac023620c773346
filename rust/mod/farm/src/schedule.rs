//! Standard broiler vaccination schedule.

use chrono::{Duration, NaiveDate};

use crate::model::{AdministrationMethod, Vaccination};

/// One step of the schedule, `day` counted from placement.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledDose {
    pub day: i64,
    pub vaccine_name: &'static str,
    pub disease_target: &'static str,
    pub method: AdministrationMethod,
    pub notes: &'static str,
}

pub const STANDARD_SCHEDULE: &[ScheduledDose] = &[
    ScheduledDose {
        day: 1,
        vaccine_name: "Marek's Disease",
        disease_target: "Marek's Disease",
        method: AdministrationMethod::Injection,
        notes: "Usually administered at hatchery.",
    },
    ScheduledDose {
        day: 7,
        vaccine_name: "Newcastle Disease (Hitchner B1)",
        disease_target: "Newcastle Disease",
        method: AdministrationMethod::EyeDrop,
        notes: "First dose.",
    },
    ScheduledDose {
        day: 14,
        vaccine_name: "Gumboro (IBD) - Intermediate",
        disease_target: "Infectious Bursal Disease",
        method: AdministrationMethod::DrinkingWater,
        notes: "First dose.",
    },
    ScheduledDose {
        day: 18,
        vaccine_name: "Newcastle Disease (LaSota)",
        disease_target: "Newcastle Disease",
        method: AdministrationMethod::DrinkingWater,
        notes: "Booster dose.",
    },
    ScheduledDose {
        day: 21,
        vaccine_name: "Gumboro (IBD) - Hot",
        disease_target: "Infectious Bursal Disease",
        method: AdministrationMethod::DrinkingWater,
        notes: "Booster dose.",
    },
    ScheduledDose {
        day: 28,
        vaccine_name: "Newcastle Disease (Komarov)",
        disease_target: "Newcastle Disease",
        method: AdministrationMethod::DrinkingWater,
        notes: "Second booster.",
    },
    ScheduledDose {
        day: 35,
        vaccine_name: "Fowl Pox",
        disease_target: "Fowl Pox",
        method: AdministrationMethod::Spray,
        notes: "Wing web stab or spray.",
    },
];

/// Planned vaccinations for a flock placed on `start_date`, paired with
/// their due dates.
pub fn planned_doses(start_date: NaiveDate) -> Vec<(NaiveDate, Vaccination)> {
    STANDARD_SCHEDULE
        .iter()
        .map(|dose| {
            let due = start_date + Duration::days(dose.day);
            let body = Vaccination {
                vaccine_name: dose.vaccine_name.to_string(),
                disease_target: dose.disease_target.to_string(),
                administration_method: dose.method,
                dosage: None,
                administered_by: None,
                batch_number: None,
                next_due_date: Some(due),
                planned: true,
                notes: Some(dose.notes.to_string()),
            };
            (due, body)
        })
        .collect()
}
