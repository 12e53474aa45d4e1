//! Moving-quote wizard: a seven step flow that collects move details, fetches
//! vendor quotes, takes a deposit and confirms the booking.

pub mod actions;
pub mod cache;
pub mod controller;
pub mod domain;
pub mod footer;
pub mod gateway;
pub mod http;
pub mod report;
pub mod repository;
pub mod resume;
pub mod router;
pub mod service;
pub mod session;
pub mod steps;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use actions::MoveAction;
pub use cache::{CachedSuggester, SuggestionCache};
pub use controller::{NavigationError, WizardController};
pub use domain::{
    AdditionalService, ContactInfo, HeavyItem, HomeDetails, HomeField, HomeType, MoveDetails,
    MoveSide, MoveTime, PaymentState, SessionId, VendorQuote,
};
pub use footer::{FooterView, ProgressEntry};
pub use gateway::{
    AddressSuggester, CheckoutRequest, CheckoutSession, GatewayError, LeadRecord, LeadSink,
    PaymentConfirmation, PaymentGateway, QuoteProvider, QuoteRequest, WizardGateways,
};
pub use http::{MapboxGeocoder, RemoteBackend};
pub use report::FunnelReport;
pub use repository::{RepositoryError, SessionRepository};
pub use resume::{PaymentReturn, ResumeError, ResumeToken};
pub use router::wizard_router;
pub use service::{QuoteWizardService, WizardServiceError, WizardSettings};
pub use session::{QuoteFetchState, WizardSession};
pub use steps::WizardStep;
pub use views::{StepView, WizardSnapshot};
