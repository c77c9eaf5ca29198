//! Patient models.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Maximum length, in characters, of a first or last name.
pub const MAX_NAME_LEN: usize = 100;

/// A patient record.
///
/// Medical tests are not stored here: the relation is owned by
/// [`MedicalTest::patient_id`](super::MedicalTest::patient_id) and read back
/// with `MedicalTestsRepository::find_all_by_patient_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    /// Storage-generated ID - `None` until first save
    pub id: Option<i64>,
    /// First name (required, at most 100 characters)
    pub first_name: String,
    /// Last name (required, at most 100 characters)
    pub last_name: String,
    /// Date of birth, if known
    pub birthdate: Option<NaiveDate>,
}

impl Patient {
    /// Create a new, unsaved patient with required fields.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            birthdate: None,
        }
    }

    /// Builder-style birthdate setter.
    pub fn with_birthdate(mut self, birthdate: NaiveDate) -> Self {
        self.birthdate = Some(birthdate);
        self
    }

    /// Check if this patient has been persisted.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// First and last name separated by a single space.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years as of today, or `None` without a birthdate.
    pub fn age(&self) -> Option<i32> {
        self.age_on(Local::now().date_naive())
    }

    /// Age in whole years as of `date`.
    ///
    /// Negative when the birthdate lies after `date`.
    pub fn age_on(&self, date: NaiveDate) -> Option<i32> {
        let birthdate = self.birthdate?;
        let mut years = date.year() - birthdate.year();
        if date > birthdate {
            if (date.month(), date.day()) < (birthdate.month(), birthdate.day()) {
                years -= 1;
            }
        } else if (date.month(), date.day()) > (birthdate.month(), birthdate.day()) {
            years += 1;
        }
        Some(years)
    }

    /// Check required fields before persisting.
    pub fn validate(&self) -> Result<(), String> {
        validate_name("first_name", &self.first_name)?;
        validate_name("last_name", &self.last_name)
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    let len = value.chars().count();
    if len > MAX_NAME_LEN {
        return Err(format!(
            "{} is {} characters long, maximum is {}",
            field, len, MAX_NAME_LEN
        ));
    }
    Ok(())
}
