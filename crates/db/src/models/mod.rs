pub mod alert;
pub mod glucose_reading;
pub mod patient;
