use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    Processing,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Provider id, e.g. `pi_123`.
    pub id: String,
    pub booking_id: Uuid,
    /// Cents, written as major units.
    #[serde(with = "crate::money::major_units")]
    pub amount: i64,
    pub currency: String,
    pub method: String,
    pub status: IntentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),
    #[error("payment provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    async fn create_intent(
        &self,
        booking_id: Uuid,
        amount: i64,
        currency: &str,
        method: &str,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Settles the intent immediately.
    async fn process_payment(&self, intent: &PaymentIntent) -> Result<IntentStatus, PaymentError>;
}
