pub mod alert_repo;
pub mod glucose_reading_repo;
pub mod patient_repo;

pub use alert_repo::AlertRepo;
pub use glucose_reading_repo::GlucoseReadingRepo;
pub use patient_repo::PatientRepo;
