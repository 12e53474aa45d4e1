//! Seams to the services the wizard depends on but does not own: address
//! autocomplete, the pricing backend, the payment provider and lead storage.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{HomeDetails, MoveDetails, MoveTime, SessionId, VendorQuote};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
    #[error("{service} responded with HTTP {status}")]
    Status { service: &'static str, status: u16 },
    #[error("{service} returned an unreadable payload: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
    #[error("{service} rejected the request: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },
}

/// Payload sent to the pricing backend. Home details only carry the fields
/// that belong to the selected home type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub origin: String,
    pub destination: String,
    pub move_date: NaiveDate,
    pub move_time: MoveTime,
    pub origin_details: HomeDetails,
    pub destination_details: HomeDetails,
}

impl QuoteRequest {
    /// `None` while the move date or time is still missing.
    pub fn from_details(details: &MoveDetails) -> Option<Self> {
        Some(Self {
            origin: details.origin.trim().to_string(),
            destination: details.destination.trim().to_string(),
            move_date: details.move_date?,
            move_time: details.move_time?,
            origin_details: details.origin_details.scoped(),
            destination_details: details.destination_details.scoped(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub wizard_session_id: SessionId,
    pub amount_cents: u32,
    pub currency: String,
    pub customer_email: String,
    pub customer_name: String,
    pub vendor_id: String,
    pub vendor_name: String,
    pub description: String,
}

/// Hosted checkout created by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub checkout_session_id: String,
    pub checkout_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub checkout_session_id: String,
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(default)]
    pub amount_cents: u32,
}

/// Booked move handed to lead storage once the deposit clears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    pub wizard_session_id: SessionId,
    pub deposit_cents: u32,
    pub details: MoveDetails,
}

#[async_trait]
pub trait AddressSuggester: Send + Sync {
    async fn suggest(&self, query: &str) -> Result<Vec<String>, GatewayError>;
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quotes(&self, request: &QuoteRequest) -> Result<Vec<VendorQuote>, GatewayError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    async fn confirm(&self, checkout_session_id: &str)
        -> Result<PaymentConfirmation, GatewayError>;
}

#[async_trait]
pub trait LeadSink: Send + Sync {
    /// Stores the lead and returns its identifier.
    async fn record(&self, lead: &LeadRecord) -> Result<String, GatewayError>;
}

/// Bundle of collaborators handed to the wizard service.
#[derive(Clone)]
pub struct WizardGateways {
    pub suggestions: Arc<dyn AddressSuggester>,
    pub quotes: Arc<dyn QuoteProvider>,
    pub payments: Arc<dyn PaymentGateway>,
    pub leads: Arc<dyn LeadSink>,
}

impl fmt::Debug for WizardGateways {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardGateways").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::wizard::domain::{HomeType, MoveDetails};

    #[test]
    fn quote_request_requires_date_and_time() {
        let details = MoveDetails {
            origin: " 123 Main St ".to_string(),
            destination: "456 Oak Ave".to_string(),
            ..MoveDetails::default()
        };
        assert!(QuoteRequest::from_details(&details).is_none());

        let details = MoveDetails {
            move_date: NaiveDate::from_ymd_opt(2025, 3, 14),
            move_time: Some(MoveTime::Afternoon),
            ..details
        };
        let request = QuoteRequest::from_details(&details).expect("request builds");
        assert_eq!(request.origin, "123 Main St");
        assert_eq!(request.move_time, MoveTime::Afternoon);
    }

    #[test]
    fn quote_request_scopes_home_details() {
        let mut details = MoveDetails {
            origin: "123 Main St".to_string(),
            destination: "456 Oak Ave".to_string(),
            move_date: NaiveDate::from_ymd_opt(2025, 3, 14),
            move_time: Some(MoveTime::Morning),
            ..MoveDetails::default()
        };
        details.origin_details.sqft = Some(1800);
        details.destination_details.home_type = Some(HomeType::Commercial);
        details.destination_details.sqft = Some(6000);

        let request = QuoteRequest::from_details(&details).expect("request builds");
        assert_eq!(request.origin_details.sqft, None);
        assert_eq!(request.destination_details.sqft, Some(6000));
    }
}
