use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::survey::SurveyResponse;

/// Trait abstraction for survey response persistence.
/// The HTTP layer only sees this; the file-backed store is one implementation.
#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// All stored responses in submission order.
    async fn list(&self) -> Result<Vec<SurveyResponse>, ServiceError>;
    async fn count(&self) -> Result<usize, ServiceError>;
    /// Append one response; returns the new total.
    async fn append(&self, response: SurveyResponse) -> Result<usize, ServiceError>;
    /// Append a batch in order; returns the new total.
    async fn append_many(&self, responses: Vec<SurveyResponse>) -> Result<usize, ServiceError>;
    /// Replace the collection with an empty one.
    async fn clear(&self) -> Result<(), ServiceError>;
}
