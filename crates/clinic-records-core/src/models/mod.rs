//! Domain models for the clinic records system.

mod patient;

pub use medical_test::*;
pub use patient::*;
