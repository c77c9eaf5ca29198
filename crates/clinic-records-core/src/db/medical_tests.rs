//! Medical test database operations.

use rusqlite::{params, Connection, Row};
use tracing::debug;

use super::{CrudRepository, DbError, DbResult, Predicate};
use crate::models::MedicalTest;

pub const MEDICAL_TESTS_TABLE: &str = "medical_tests";
/// Foreign key from `medical_tests` to `patients(id)`.
pub const PATIENT_ID_COLUMN: &str = "patient_id";

/// Repository over the `medical_tests` table.
pub struct MedicalTestsRepository<'c> {
    conn: &'c Connection,
}

impl<'c> MedicalTestsRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// All tests owned by the given patient.
    pub fn find_all_by_patient_id(&self, patient_id: i64) -> DbResult<Vec<MedicalTest>> {
        self.fetch(
            &self
                .query()
                .filter(Predicate::equals(PATIENT_ID_COLUMN, patient_id)),
        )
    }
}

impl CrudRepository for MedicalTestsRepository<'_> {
    type Entity = MedicalTest;

    const TABLE: &'static str = MEDICAL_TESTS_TABLE;
    const COLUMNS: &'static [&'static str] = &["id", "description", "date_time", "patient_id"];

    fn conn(&self) -> &Connection {
        self.conn
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<MedicalTest> {
        Ok(MedicalTest {
            id: Some(row.get(0)?),
            description: row.get(1)?,
            date_time: row.get(2)?,
            patient_id: Some(row.get(3)?),
        })
    }

    fn entity_id(test: &MedicalTest) -> Option<i64> {
        test.id
    }

    fn save(&self, mut test: MedicalTest) -> DbResult<MedicalTest> {
        test.validate().map_err(DbError::Validation)?;

        match test.id {
            Some(id) => {
                self.conn.execute(
                    r#"
                    INSERT INTO medical_tests (id, description, date_time, patient_id)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(id) DO UPDATE SET
                        description = excluded.description,
                        date_time = excluded.date_time,
                        patient_id = excluded.patient_id
                    "#,
                    params![id, test.description, test.date_time, test.patient_id],
                )?;
                debug!(id, patient_id = test.patient_id, "updated medical test");
            }
            None => {
                self.conn.execute(
                    r#"
                    INSERT INTO medical_tests (description, date_time, patient_id)
                    VALUES (?1, ?2, ?3)
                    "#,
                    params![test.description, test.date_time, test.patient_id],
                )?;
                let id = self.conn.last_insert_rowid();
                test.id = Some(id);
                debug!(id, patient_id = test.patient_id, "inserted medical test");
            }
        }
        Ok(test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::Patient;
    use chrono::NaiveDate;

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        // Create a test patient
        let patient = db.patients().save(Patient::new("Mario", "Rossi")).unwrap();
        (db, patient)
    }

    #[test]
    fn test_insert_and_get() {
        let (db, patient) = setup_db();
        let repo = db.medical_tests();

        let saved = repo
            .save(MedicalTest::new(&patient, "Analisi del sangue"))
            .unwrap();
        assert!(saved.id.is_some());

        let retrieved = repo.find_by_id(saved.id.unwrap()).unwrap().unwrap();
        assert_eq!(retrieved, saved);
    }

    #[test]
    fn test_date_time_round_trips_with_fractional_seconds() {
        let (db, patient) = setup_db();
        let repo = db.medical_tests();

        let when = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_milli_opt(8, 15, 30, 250)
            .unwrap();
        let saved = repo
            .save(MedicalTest::new(&patient, "ECG").with_date_time(when))
            .unwrap();

        let retrieved = repo.get_by_id(saved.id.unwrap()).unwrap();
        assert_eq!(retrieved.date_time, when);
    }

    #[test]
    fn test_update_test() {
        let (db, patient) = setup_db();
        let repo = db.medical_tests();

        let mut test = repo.save(MedicalTest::new(&patient, "ECG")).unwrap();
        test.description = "ECG sotto sforzo".into();
        let updated = repo.save(test.clone()).unwrap();
        assert_eq!(updated.id, test.id);

        let retrieved = repo.get_by_id(test.id.unwrap()).unwrap();
        assert_eq!(retrieved.description, "ECG sotto sforzo");
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_unsaved_patient_is_validation_error() {
        let (db, _) = setup_db();
        let repo = db.medical_tests();

        let err = repo
            .save(MedicalTest::new(&Patient::new("Luigi", "Rossi"), "ECG"))
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[test]
    fn test_unknown_patient_is_foreign_key_error() {
        let (db, _) = setup_db();
        let repo = db.medical_tests();

        let mut ghost = Patient::new("Luigi", "Rossi");
        ghost.id = Some(999);
        let err = repo.save(MedicalTest::new(&ghost, "ECG")).unwrap_err();
        assert!(matches!(err, DbError::ForeignKey(_)), "got {:?}", err);
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_find_all_by_patient_id() {
        let (db, mario) = setup_db();
        let luigi = db.patients().save(Patient::new("Luigi", "Rossi")).unwrap();
        let repo = db.medical_tests();

        repo.save_all(vec![
            MedicalTest::new(&mario, "ECG"),
            MedicalTest::new(&luigi, "Radiografia"),
            MedicalTest::new(&mario, "Analisi del sangue"),
        ])
        .unwrap();

        let descriptions: Vec<String> = repo
            .find_all_by_patient_id(mario.id.unwrap())
            .unwrap()
            .into_iter()
            .map(|t| t.description)
            .collect();
        assert_eq!(descriptions, vec!["ECG", "Analisi del sangue"]);

        assert!(repo.find_all_by_patient_id(12345).unwrap().is_empty());
    }

    #[test]
    fn test_save_all_is_atomic() {
        let (db, patient) = setup_db();
        let repo = db.medical_tests();

        let mut ghost = Patient::new("Luigi", "Rossi");
        ghost.id = Some(999);

        let result = repo.save_all(vec![
            MedicalTest::new(&patient, "ECG"),
            MedicalTest::new(&ghost, "Radiografia"),
        ]);
        assert!(matches!(result, Err(DbError::ForeignKey(_))));
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_crud_helpers() {
        let (db, patient) = setup_db();
        let repo = db.medical_tests();

        let saved = repo
            .save_all(vec![
                MedicalTest::new(&patient, "ECG"),
                MedicalTest::new(&patient, "Radiografia"),
                MedicalTest::new(&patient, "Ecografia"),
            ])
            .unwrap();
        let ids: Vec<i64> = saved.iter().filter_map(|t| t.id).collect();

        assert!(repo.exists_by_id(ids[0]).unwrap());
        assert_eq!(repo.find_all().unwrap(), saved);
        assert_eq!(repo.find_all_by_id(&[ids[2], 999, ids[0]]).unwrap().len(), 2);
        assert!(repo.find_all_by_id(&[]).unwrap().is_empty());

        assert!(repo.delete(&saved[1]).unwrap());
        assert!(!repo.delete(&saved[1]).unwrap());
        assert!(!repo.delete(&MedicalTest::new(&patient, "unsaved")).unwrap());
        assert_eq!(repo.count().unwrap(), 2);

        assert_eq!(repo.delete_all().unwrap(), 2);
        assert_eq!(repo.count().unwrap(), 0);
    }
}
