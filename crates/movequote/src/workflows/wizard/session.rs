use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::controller::WizardController;
use super::domain::{MoveDetails, SessionId, VendorQuote};
use super::gateway::CheckoutSession;

pub const NO_VENDORS_MESSAGE: &str =
    "No moving companies are available for this route and date. Try another date.";

/// Outcome of the last request to the pricing backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuoteFetchState {
    #[default]
    NotRequested,
    Loaded {
        quotes: Vec<VendorQuote>,
    },
    NoVendors,
    Failed {
        message: String,
    },
}

impl QuoteFetchState {
    pub fn from_quotes(quotes: Vec<VendorQuote>) -> Self {
        if quotes.is_empty() {
            Self::NoVendors
        } else {
            Self::Loaded { quotes }
        }
    }

    pub fn quotes(&self) -> &[VendorQuote] {
        match self {
            Self::Loaded { quotes } => quotes,
            _ => &[],
        }
    }

    pub fn find(&self, vendor_id: &str) -> Option<&VendorQuote> {
        self.quotes()
            .iter()
            .find(|quote| quote.vendor_id == vendor_id)
    }

    /// Message for the error panel, if the step should show one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::NoVendors => Some(NO_VENDORS_MESSAGE),
            Self::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotRequested => "not_requested",
            Self::Loaded { .. } => "loaded",
            Self::NoVendors => "no_vendors",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Repository record for one customer walking through the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    pub id: SessionId,
    pub details: MoveDetails,
    pub controller: WizardController,
    #[serde(default)]
    pub quotes: QuoteFetchState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout: Option<CheckoutSession>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WizardSession {
    pub fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            details: MoveDetails::default(),
            controller: WizardController::new(),
            quotes: QuoteFetchState::NotRequested,
            checkout: None,
            payment_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_booked(&self) -> bool {
        self.details.payment.completed
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Pulls the position back to the furthest reachable step after an edit
    /// re-opened an earlier one.
    pub(crate) fn clamp_position(&mut self) {
        let reachable = WizardController::furthest_reachable(&self.details);
        if self.controller.current() > reachable {
            self.controller = WizardController::at(reachable);
        }
    }

    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.updated_at < cutoff
    }

    /// Drops the fetched quotes and any chosen vendor after a pricing-relevant edit.
    pub(crate) fn invalidate_quotes(&mut self) {
        self.quotes = QuoteFetchState::NotRequested;
        self.details.selected_quote = None;
        self.checkout = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_quote_list_is_distinct_from_failure() {
        let state = QuoteFetchState::from_quotes(Vec::new());
        assert_eq!(state, QuoteFetchState::NoVendors);
        assert_eq!(state.message(), Some(NO_VENDORS_MESSAGE));
        assert!(state.quotes().is_empty());
    }

    #[test]
    fn fetch_state_serializes_with_status_tag() {
        let state = QuoteFetchState::Failed {
            message: "pricing backend offline".to_string(),
        };
        let value = serde_json::to_value(&state).expect("serializes");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["message"], "pricing backend offline");
    }
}
