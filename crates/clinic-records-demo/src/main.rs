//! Scripted walkthrough of the clinic records repositories.
//!
//! Creates a few patients, updates one, searches, records medical tests and
//! deletes, printing what happens at each step.
//!
//! # Environment Variables
//! - `CLINIC_DATABASE_PATH`: SQLite file to use (default: in-memory)
//! - `CLINIC_DELETE_POLICY`: `restrict` (default) or `cascade`
//! - `RUST_LOG`: log filter (default: "clinic_records=info")

use anyhow::Context;
use chrono::NaiveDate;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic_records_core::{Config, CrudRepository, Database, MedicalTest, Patient};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_records=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    info!(delete_policy = %config.delete_policy, "starting demo");
    let db = Database::open_with(&config).context("opening database")?;

    println!("\n=== DATABASE SETUP & TEST ===\n");

    create_patients(&db)?;
    println!();

    find_and_update_example(&db)?;
    println!();

    search_example(&db)?;
    println!();

    medical_tests_example(&db)?;
    println!();

    delete_example(&db)?;
    println!();

    let remaining = db.patients().find_all()?;
    println!("Remaining patients:");
    println!("{}", serde_json::to_string_pretty(&remaining)?);

    Ok(())
}

fn create_patients(db: &Database) -> anyhow::Result<()> {
    let patients = db.patients();

    for patient in [
        Patient::new("Walter", "Paganini"),
        Patient::new("Mario", "Rossi"),
        Patient::new("Luigi", "Rossi"),
        Patient::new("Peter", "Falk"),
    ] {
        println!(
            "ID of {} before saving: {}",
            patient.full_name(),
            display_id(patient.id)
        );
        let patient = patients.save(patient)?;
        println!(
            "ID of {} after saving: {}",
            patient.full_name(),
            display_id(patient.id)
        );
    }
    Ok(())
}

fn find_and_update_example(db: &Database) -> anyhow::Result<()> {
    let patients = db.patients();

    let mut patient = patients.get_by_id(1)?;
    println!(
        "Birthdate of {} before update: {}",
        patient.full_name(),
        display_date(patient.birthdate)
    );

    patient.birthdate = NaiveDate::from_ymd_opt(1992, 10, 11);
    let patient = patients.save(patient)?;

    let id = patient.id.context("saved patient has no id")?;
    let patient = patients.get_by_id(id)?;
    println!(
        "Birthdate of {} after update: {} (age {})",
        patient.full_name(),
        display_date(patient.birthdate),
        patient
            .age()
            .map(|age| age.to_string())
            .unwrap_or_else(|| "unknown".into())
    );
    Ok(())
}

fn search_example(db: &Database) -> anyhow::Result<()> {
    let patients = db.patients();

    println!("Searching all patients with last name Rossi...");
    for patient in patients.find_all_by_last_name("Rossi")? {
        println!(
            "Found: {} (ID: {})",
            patient.full_name(),
            display_id(patient.id)
        );
    }

    println!(
        "Patients whose first name starts with \"M\": {}",
        patients.count_by_first_name_starting_with("M")?
    );
    println!(
        "Mario Rossi exists: {}",
        patients.exists_by_first_name_and_last_name("Mario", "Rossi")?
    );
    let cutoff = NaiveDate::from_ymd_opt(1990, 1, 1).context("invalid cutoff date")?;
    for patient in patients.find_all_by_birthdate_after(cutoff)? {
        println!("Born after {}: {}", cutoff, patient.full_name());
    }
    Ok(())
}

fn medical_tests_example(db: &Database) -> anyhow::Result<()> {
    let patients = db.patients();
    let tests = db.medical_tests();

    let mario = patients
        .find_first_10_by_first_name("Mario")?
        .into_iter()
        .next()
        .context("Mario Rossi is missing")?;
    let luigi = patients
        .find_first_10_by_first_name("Luigi")?
        .into_iter()
        .next()
        .context("Luigi Rossi is missing")?;

    tests.save_all(vec![
        MedicalTest::new(&mario, "Analisi del sangue"),
        MedicalTest::new(&mario, "Emocromo completo (sangue)"),
        MedicalTest::new(&luigi, "Radiografia torace"),
    ])?;
    println!("Medical tests on DB: {}", tests.count()?);

    let mario_id = mario.id.context("saved patient has no id")?;
    for test in tests.find_all_by_patient_id(mario_id)? {
        println!(
            "Test of {}: {} ({})",
            mario.full_name(),
            test.description,
            test.date_time.format("%Y-%m-%d %H:%M")
        );
    }

    println!("Searching patients with a test containing \"sangue\"...");
    for patient in patients.find_all_by_medical_tests_description_containing("sangue")? {
        println!("Found: {}", patient.full_name());
    }
    Ok(())
}

fn delete_example(db: &Database) -> anyhow::Result<()> {
    let patients = db.patients();
    let id_to_delete = 4;

    println!(
        "Number of patients on DB before deletion: {}",
        patients.count()?
    );
    patients.delete_by_id(id_to_delete)?;
    println!(
        "Number of patients on DB after deletion: {}",
        patients.count()?
    );

    println!("Searching for the deleted patient...");
    match patients.get_by_id(id_to_delete) {
        Ok(patient) => println!("Found: {}", patient.full_name()),
        Err(e) => println!("{}", e),
    }
    Ok(())
}

fn display_id(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "none".into())
}

fn display_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "unknown".into())
}
