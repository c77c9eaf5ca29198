//! Patient database operations.

use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::debug;

use super::{
    with_savepoint, CrudRepository, DbError, DbResult, Predicate, Query, MEDICAL_TESTS_TABLE,
    PATIENT_ID_COLUMN,
};
use crate::config::DeletePolicy;
use crate::models::Patient;

pub const PATIENTS_TABLE: &str = "patients";

/// Repository over the `patients` table.
pub struct PatientsRepository<'c> {
    conn: &'c Connection,
    delete_policy: DeletePolicy,
}

impl<'c> PatientsRepository<'c> {
    pub fn new(conn: &'c Connection, delete_policy: DeletePolicy) -> Self {
        Self {
            conn,
            delete_policy,
        }
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Patients with exactly this last name.
    pub fn find_all_by_last_name(&self, last_name: &str) -> DbResult<Vec<Patient>> {
        self.fetch(
            &self
                .query()
                .filter(Predicate::equals("last_name", last_name.to_string())),
        )
    }

    /// Patients born strictly after `date`. Unknown birthdates never match.
    pub fn find_all_by_birthdate_after(&self, date: NaiveDate) -> DbResult<Vec<Patient>> {
        self.fetch(
            &self
                .query()
                .filter(Predicate::after("birthdate", date.format("%F").to_string())),
        )
    }

    /// Up to 10 patients with exactly this first name, lowest ids first.
    pub fn find_first_10_by_first_name(&self, first_name: &str) -> DbResult<Vec<Patient>> {
        self.fetch(
            &self
                .query()
                .filter(Predicate::equals("first_name", first_name.to_string()))
                .limit(10),
        )
    }

    pub fn exists_by_first_name_and_last_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> DbResult<bool> {
        self.fetch_exists(
            &self
                .query()
                .filter(Predicate::equals("first_name", first_name.to_string()))
                .filter(Predicate::equals("last_name", last_name.to_string())),
        )
    }

    /// Count patients whose first name starts with `prefix` (case-sensitive).
    pub fn count_by_first_name_starting_with(&self, prefix: &str) -> DbResult<u64> {
        self.fetch_count(
            &self
                .query()
                .filter(Predicate::starting_with("first_name", prefix)),
        )
    }

    /// Delete every patient with this first name, returning how many were removed.
    pub fn delete_all_by_first_name(&self, first_name: &str) -> DbResult<u64> {
        self.delete_matching(
            &self
                .query()
                .filter(Predicate::equals("first_name", first_name.to_string())),
        )
    }

    /// Patients owning at least one medical test whose description contains
    /// `text` (case-sensitive). Each patient appears once.
    pub fn find_all_by_medical_tests_description_containing(
        &self,
        text: &str,
    ) -> DbResult<Vec<Patient>> {
        self.fetch(&self.query().filter(Predicate::related(
            MEDICAL_TESTS_TABLE,
            PATIENT_ID_COLUMN,
            Predicate::containing("description", text),
        )))
    }

    fn insert(&self, patient: &Patient) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO patients (first_name, last_name, birthdate)
            VALUES (?1, ?2, ?3)
            "#,
            params![patient.first_name, patient.last_name, patient.birthdate],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn upsert(&self, id: i64, patient: &Patient) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (id, first_name, last_name, birthdate)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                birthdate = excluded.birthdate
            "#,
            params![id, patient.first_name, patient.last_name, patient.birthdate],
        )?;
        Ok(())
    }

    /// Delete the medical tests owned by patients matching `query`.
    fn delete_owned_tests(&self, query: &Query) -> DbResult<u64> {
        let owners = query.ids();
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            MEDICAL_TESTS_TABLE,
            PATIENT_ID_COLUMN,
            owners.sql
        );
        let rows_affected = self
            .conn
            .execute(&sql, params_from_iter(owners.params.iter()))?;
        Ok(rows_affected as u64)
    }
}

impl CrudRepository for PatientsRepository<'_> {
    type Entity = Patient;

    const TABLE: &'static str = PATIENTS_TABLE;
    const COLUMNS: &'static [&'static str] = &["id", "first_name", "last_name", "birthdate"];

    fn conn(&self) -> &Connection {
        self.conn
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
        Ok(Patient {
            id: Some(row.get(0)?),
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            birthdate: row.get(3)?,
        })
    }

    fn entity_id(patient: &Patient) -> Option<i64> {
        patient.id
    }

    fn save(&self, mut patient: Patient) -> DbResult<Patient> {
        patient.validate().map_err(DbError::Validation)?;

        match patient.id {
            Some(id) => {
                self.upsert(id, &patient)?;
                debug!(id, "updated patient");
            }
            None => {
                let id = self.insert(&patient)?;
                patient.id = Some(id);
                debug!(id, "inserted patient");
            }
        }
        Ok(patient)
    }

    /// Honours the repository's [`DeletePolicy`] for patients that still own
    /// medical tests.
    fn delete_matching(&self, query: &Query) -> DbResult<u64> {
        let rendered = query.delete();
        match self.delete_policy {
            DeletePolicy::Restrict => {
                let deleted = self
                    .conn
                    .execute(&rendered.sql, params_from_iter(rendered.params.iter()))
                    .map_err(DbError::from)
                    .map_err(|e| match e {
                        DbError::ForeignKey(_) => DbError::ForeignKey(
                            "patient still owns medical tests (delete policy is restrict)".into(),
                        ),
                        other => other,
                    })?;
                debug!(deleted, "deleted patients");
                Ok(deleted as u64)
            }
            DeletePolicy::Cascade => with_savepoint(self.conn, || {
                let tests = self.delete_owned_tests(query)?;
                let deleted = self
                    .conn
                    .execute(&rendered.sql, params_from_iter(rendered.params.iter()))?;
                debug!(deleted, tests, "deleted patients with their medical tests");
                Ok(deleted as u64)
            }),
        }
    }
}
