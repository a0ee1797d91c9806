use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use flyeasy_core::models::Booking;
use flyeasy_core::payment::{IntentStatus, PaymentAdapter, PaymentError, PaymentIntent};

/// Method name the mock gateway treats as a provider outage.
pub const MOCK_FAILING_METHOD: &str = "fail-gateway";
/// Method name the mock gateway declines.
pub const MOCK_DECLINED_METHOD: &str = "declined-card";

#[derive(Clone)]
pub struct PaymentOrchestrator {
    adapter: Arc<dyn PaymentAdapter>,
    currency: String,
}

impl PaymentOrchestrator {
    pub fn new(adapter: Arc<dyn PaymentAdapter>, currency: impl Into<String>) -> Self {
        Self {
            adapter,
            currency: currency.into(),
        }
    }

    /// Creates an intent for the booking's total and settles it immediately.
    pub async fn settle(&self, booking: &Booking) -> Result<PaymentIntent, PaymentError> {
        let mut intent = self
            .adapter
            .create_intent(
                booking.id,
                booking.total_price,
                &self.currency,
                &booking.payment_details.method,
            )
            .await?;

        let status = self.adapter.process_payment(&intent).await?;
        intent.status = status;
        match status {
            IntentStatus::Succeeded => Ok(intent),
            other => Err(PaymentError::Declined(format!(
                "payment ended in state {:?}",
                other
            ))),
        }
    }
}

pub struct MockPaymentAdapter;

#[async_trait]
impl PaymentAdapter for MockPaymentAdapter {
    async fn create_intent(
        &self,
        booking_id: Uuid,
        amount: i64,
        currency: &str,
        method: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        if amount < 0 {
            return Err(PaymentError::Provider("negative amount".to_string()));
        }
        Ok(PaymentIntent {
            id: format!("mock_pi_{}", booking_id.simple()),
            booking_id,
            amount,
            currency: currency.to_string(),
            method: method.to_string(),
            status: IntentStatus::RequiresPaymentMethod,
            created_at: chrono::Utc::now(),
        })
    }

    async fn process_payment(&self, intent: &PaymentIntent) -> Result<IntentStatus, PaymentError> {
        match intent.method.as_str() {
            MOCK_FAILING_METHOD => Err(PaymentError::Provider(
                "Simulated payment gateway failure".to_string(),
            )),
            MOCK_DECLINED_METHOD => Ok(IntentStatus::Failed),
            _ => Ok(IntentStatus::Succeeded),
        }
    }
}
