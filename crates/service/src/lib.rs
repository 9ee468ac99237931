//! Service layer for the survey backend.
//! - Owns the survey response domain type and its validation.
//! - Persists the response collection in a single JSON file.
//! - Generates synthetic responses for admin seeding.
//! - Fits per-question regression models over stored answers.

pub mod errors;
pub mod storage;
pub mod survey;
pub mod file;
pub mod samples;
pub mod regression;

pub use errors::ServiceError;
pub use file::response_store::ResponseStore;
pub use survey::{repository::ResponseRepository, SurveyResponse};
