//! Clinic Records Core Library
//!
//! Entity model and SQLite-backed repositories for patients and the medical
//! tests taken on them.
//!
//! # Architecture
//!
//! ```text
//!   Patient ◄────────── MedicalTest
//!     id                  id
//!     first_name          description
//!     last_name           date_time
//!     birthdate           patient_id  (owning side, NOT NULL FK)
//!
//!   PatientsRepository ─┐
//!                       ├─ CrudRepository ── Query / Predicate ── rusqlite
//!   MedicalTestsRepo ───┘
//! ```
//!
//! A patient's tests are a query (`find_all_by_patient_id`), not a stored
//! collection. Repositories borrow an explicit connection or transaction;
//! there is no ambient session.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer, query builder and repositories
//! - [`models`]: Domain types (Patient, MedicalTest)
//! - [`config`]: Environment configuration and patient delete policy

pub mod config;
pub mod db;
pub mod models;

// Re-export commonly used types
pub use config::{Config, ConfigError, DeletePolicy};
pub use db::{
    CrudRepository, Database, DbError, DbResult, MedicalTestsRepository, PatientsRepository,
    Predicate, Query,
};
pub use models::{MedicalTest, Patient};
