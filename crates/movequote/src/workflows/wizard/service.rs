use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::actions::MoveAction;
use super::controller::NavigationError;
use super::domain::{PaymentState, SessionId};
use super::gateway::{
    CheckoutRequest, GatewayError, LeadRecord, QuoteRequest, WizardGateways,
};
use super::report::FunnelReport;
use super::repository::{RepositoryError, SessionRepository};
use super::resume::{PaymentReturn, ResumeError, ResumeToken};
use super::session::{QuoteFetchState, WizardSession};
use super::steps::WizardStep;
use super::validation;
use super::views::WizardSnapshot;

/// Shortest query forwarded to the address suggester.
pub const MIN_SUGGESTION_QUERY: usize = 3;

pub const PAYMENT_NOT_COMPLETED: &str =
    "Your payment was not completed. Review your details and try again.";

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Checkout and retention parameters shared by every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardSettings {
    pub deposit_cents: u32,
    /// Sessions untouched for longer than this are discarded. `None` keeps them.
    pub session_ttl: Option<Duration>,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            deposit_cents: 5_000,
            session_ttl: Some(DEFAULT_SESSION_TTL),
        }
    }
}

/// Service composing the session repository, the wizard controller and the
/// outbound gateways.
pub struct QuoteWizardService<R> {
    repository: Arc<R>,
    gateways: WizardGateways,
    settings: WizardSettings,
    writes: Mutex<()>,
}

impl<R> QuoteWizardService<R>
where
    R: SessionRepository + 'static,
{
    pub fn new(repository: Arc<R>, gateways: WizardGateways, settings: WizardSettings) -> Self {
        Self {
            repository,
            gateways,
            settings,
            writes: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> WizardSettings {
        self.settings
    }

    pub fn snapshot(&self, session: &WizardSession) -> WizardSnapshot {
        WizardSnapshot::of(session, self.settings.deposit_cents)
    }

    /// Opens a new session with an empty store on the first step. Idle
    /// sessions are swept first.
    pub fn start(&self) -> Result<WizardSession, WizardServiceError> {
        self.expire_idle(Utc::now())?;
        let session = WizardSession::new(SessionId::generate(), Utc::now());
        let stored = self.repository.insert(session)?;
        info!(session_id = %stored.id, "quote wizard session started");
        Ok(stored)
    }

    /// Loads a session. One idle past the retention window is removed and
    /// reported as missing.
    pub fn get(&self, id: &SessionId) -> Result<WizardSession, WizardServiceError> {
        let session = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        if self
            .idle_cutoff(Utc::now())
            .is_some_and(|cutoff| session.is_idle_since(cutoff))
        {
            self.repository.remove(id)?;
            info!(session_id = %id, "idle wizard session expired");
            return Err(RepositoryError::NotFound.into());
        }
        Ok(session)
    }

    /// Deletes a session and its store.
    pub fn discard(&self, id: &SessionId) -> Result<(), WizardServiceError> {
        let _guard = self.writes.lock().expect("session write lock poisoned");
        self.repository
            .remove(id)?
            .ok_or(RepositoryError::NotFound)?;
        info!(session_id = %id, "wizard session discarded");
        Ok(())
    }

    /// Removes every session untouched since the retention window opened.
    pub fn expire_idle(&self, now: DateTime<Utc>) -> Result<usize, WizardServiceError> {
        let Some(cutoff) = self.idle_cutoff(now) else {
            return Ok(0);
        };

        let _guard = self.writes.lock().expect("session write lock poisoned");
        let mut expired = 0;
        for session in self.repository.list()? {
            if session.is_idle_since(cutoff) && self.repository.remove(&session.id)?.is_some() {
                expired += 1;
            }
        }
        if expired > 0 {
            info!(expired, "idle wizard sessions expired");
        }
        Ok(expired)
    }

    fn idle_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.settings.session_ttl?).ok()?;
        now.checked_sub_signed(ttl)
    }

    /// Read, transform and write one session while holding the write lock, so
    /// results of outbound calls merge into the latest stored record.
    fn transform<F>(&self, id: &SessionId, change: F) -> Result<WizardSession, WizardServiceError>
    where
        F: FnOnce(&mut WizardSession) -> Result<(), WizardServiceError>,
    {
        let _guard = self.writes.lock().expect("session write lock poisoned");
        let mut session = self.get(id)?;
        change(&mut session)?;
        session.touch();
        self.repository.update(session.clone())?;
        Ok(session)
    }

    /// Applies field edits in order. Edits to anything the quotes were priced
    /// against discard the fetched quotes and the chosen vendor, and the
    /// position falls back to the first step the edits left incomplete.
    pub fn apply(
        &self,
        id: &SessionId,
        actions: &[MoveAction],
    ) -> Result<WizardSession, WizardServiceError> {
        self.transform(id, |session| {
            if session.is_booked() {
                return Err(WizardServiceError::AlreadyPaid);
            }

            session.details = session.details.clone().reduce_all(actions);
            let repriced = actions.iter().any(MoveAction::affects_pricing);
            if repriced && !matches!(session.quotes, QuoteFetchState::NotRequested) {
                session.invalidate_quotes();
            }
            session.clamp_position();
            Ok(())
        })
    }

    pub fn next(&self, id: &SessionId) -> Result<WizardSession, WizardServiceError> {
        self.navigate(id, |session| session.controller.go_next(&session.details))
    }

    pub fn back(&self, id: &SessionId) -> Result<WizardSession, WizardServiceError> {
        self.navigate(id, |session| session.controller.go_back())
    }

    pub fn go_to(&self, id: &SessionId, index: usize) -> Result<WizardSession, WizardServiceError> {
        self.navigate(id, |session| session.controller.go_to_step(index))
    }

    fn navigate<F>(&self, id: &SessionId, transition: F) -> Result<WizardSession, WizardServiceError>
    where
        F: FnOnce(&mut WizardSession) -> Result<WizardStep, NavigationError>,
    {
        self.transform(id, |session| {
            session.clamp_position();
            let from = session.controller.current();
            let to = transition(session)?;
            if from != to {
                info!(session_id = %session.id, from = ?from, to = ?to, "wizard step changed");
            }
            Ok(())
        })
    }

    /// Re-syncs the session with a browser location. A payment redirect is
    /// confirmed with the provider before the wizard moves to confirmation.
    pub async fn resume(
        &self,
        id: &SessionId,
        location: &str,
    ) -> Result<WizardSession, WizardServiceError> {
        let token = ResumeToken::parse(location)?;
        let session = self.get(id)?;

        if let Some(payment_return) = &token.payment_return {
            if session.is_booked() {
                let booked_with = session.details.payment.checkout_session_id.as_deref();
                if booked_with != Some(payment_return.checkout_session_id.as_str()) {
                    warn!(
                        session_id = %session.id,
                        returned = %payment_return.checkout_session_id,
                        booked_with = ?booked_with,
                        "payment return does not match the booked checkout"
                    );
                }
            } else {
                self.settle_payment(&session, payment_return).await?;
            }
        }

        self.transform(id, |session| {
            let step = session.controller.resume(&token, &session.details);
            info!(session_id = %session.id, step = ?step, "wizard resumed");
            Ok(())
        })
    }

    /// Confirms a returned checkout. Only the checkout this session opened,
    /// on a session complete up to the payment step, can book it.
    async fn settle_payment(
        &self,
        session: &WizardSession,
        payment_return: &PaymentReturn,
    ) -> Result<(), WizardServiceError> {
        let checkout_session_id = payment_return.checkout_session_id.as_str();
        if !opened_checkout(session, checkout_session_id) {
            return Err(WizardServiceError::CheckoutMismatch(
                checkout_session_id.to_string(),
            ));
        }
        if let Some(step) =
            validation::first_incomplete_before(WizardStep::ReviewAndPay, &session.details)
        {
            return Err(WizardServiceError::Incomplete(step));
        }

        let outcome = self.gateways.payments.confirm(checkout_session_id).await;

        let mut paid = false;
        let session = self.transform(&session.id, |current| {
            if current.is_booked() {
                return Ok(());
            }
            if !opened_checkout(current, checkout_session_id) {
                warn!(
                    session_id = %current.id,
                    checkout_session_id,
                    "checkout was replaced while its payment was being confirmed"
                );
                return Err(WizardServiceError::CheckoutMismatch(
                    checkout_session_id.to_string(),
                ));
            }

            match &outcome {
                Err(err) => {
                    warn!(session_id = %current.id, error = %err, "payment confirmation failed");
                    current.payment_error = Some(err.to_string());
                }
                Ok(confirmation) if !confirmation.paid => {
                    info!(session_id = %current.id, checkout_session_id, "checkout returned unpaid");
                    current.payment_error = Some(PAYMENT_NOT_COMPLETED.to_string());
                }
                Ok(confirmation) => {
                    let booking_id = confirmation.booking_id.clone().or_else(|| {
                        current
                            .checkout
                            .as_ref()
                            .and_then(|checkout| checkout.booking_id.clone())
                    });
                    let payment = PaymentState {
                        booking_id,
                        checkout_session_id: Some(checkout_session_id.to_string()),
                        lead_id: payment_return.lead_id.clone(),
                        completed: true,
                    };
                    current.details = current.details.clone().with_payment(payment);
                    current.payment_error = None;
                    paid = true;
                }
            }
            Ok(())
        })?;

        if !paid {
            return Ok(());
        }
        info!(
            session_id = %session.id,
            booking_id = ?session.details.payment.booking_id,
            "deposit confirmed"
        );

        let lead = LeadRecord {
            lead_id: payment_return.lead_id.clone(),
            wizard_session_id: session.id.clone(),
            deposit_cents: self.settings.deposit_cents,
            details: session.details.clone(),
        };
        match self.gateways.leads.record(&lead).await {
            Ok(lead_id) => {
                self.transform(&session.id, |current| {
                    current.details.payment.lead_id = Some(lead_id);
                    Ok(())
                })?;
            }
            Err(err) => {
                warn!(session_id = %session.id, error = %err, "lead could not be stored after payment");
            }
        }
        Ok(())
    }

    /// Requests quotes for the accumulated move. Also serves the "Try Again"
    /// action after a failure; the outcome is stored on the session either way.
    /// A result priced against details edited while the request was in flight
    /// is dropped.
    pub async fn fetch_quotes(&self, id: &SessionId) -> Result<WizardSession, WizardServiceError> {
        let session = self.get(id)?;
        if session.is_booked() {
            return Err(WizardServiceError::AlreadyPaid);
        }
        if let Some(step) =
            validation::first_incomplete_before(WizardStep::ChooseMover, &session.details)
        {
            return Err(WizardServiceError::Incomplete(step));
        }
        let request = QuoteRequest::from_details(&session.details)
            .ok_or(WizardServiceError::Incomplete(WizardStep::MoveDetails))?;

        let outcome = self.gateways.quotes.quotes(&request).await;

        self.transform(id, |session| {
            if session.is_booked() {
                return Err(WizardServiceError::AlreadyPaid);
            }
            if QuoteRequest::from_details(&session.details).as_ref() != Some(&request) {
                info!(session_id = %session.id, "move details changed while quotes were requested");
                return Ok(());
            }

            session.quotes = match outcome {
                Ok(quotes) => {
                    info!(session_id = %session.id, count = quotes.len(), "vendor quotes received");
                    QuoteFetchState::from_quotes(quotes)
                }
                Err(err) => {
                    warn!(session_id = %session.id, error = %err, "vendor quote request failed");
                    QuoteFetchState::Failed {
                        message: err.to_string(),
                    }
                }
            };

            let still_offered = session
                .details
                .selected_quote
                .as_ref()
                .and_then(|selected| session.quotes.find(&selected.vendor_id))
                .cloned();
            if still_offered.is_none() {
                session.checkout = None;
            }
            session.details = session.details.clone().with_selected_quote(still_offered);
            session.clamp_position();
            Ok(())
        })
    }

    pub fn select_quote(
        &self,
        id: &SessionId,
        vendor_id: &str,
    ) -> Result<WizardSession, WizardServiceError> {
        self.transform(id, |session| {
            if session.is_booked() {
                return Err(WizardServiceError::AlreadyPaid);
            }

            let quote = session
                .quotes
                .find(vendor_id)
                .cloned()
                .ok_or_else(|| WizardServiceError::QuoteNotOffered(vendor_id.to_string()))?;
            session.details = session.details.clone().with_selected_quote(Some(quote));
            session.checkout = None;
            Ok(())
        })
    }

    /// Creates a hosted checkout for the deposit. Provider failures are kept
    /// on the session for the payment step's error panel. A checkout opened
    /// for a vendor the customer switched away from meanwhile is not kept.
    pub async fn start_checkout(&self, id: &SessionId) -> Result<WizardSession, WizardServiceError> {
        let session = self.get(id)?;
        if session.is_booked() {
            return Err(WizardServiceError::AlreadyPaid);
        }
        if let Some(step) =
            validation::first_incomplete_before(WizardStep::ReviewAndPay, &session.details)
        {
            return Err(WizardServiceError::Incomplete(step));
        }
        let quote = session
            .details
            .selected_quote
            .clone()
            .ok_or(WizardServiceError::Incomplete(WizardStep::ChooseMover))?;

        let contact = &session.details.contact;
        let request = CheckoutRequest {
            wizard_session_id: session.id.clone(),
            amount_cents: self.settings.deposit_cents,
            currency: "usd".to_string(),
            customer_email: contact.email.trim().to_string(),
            customer_name: contact.full_name(),
            vendor_id: quote.vendor_id.clone(),
            vendor_name: quote.vendor_name.clone(),
            description: format!("Moving deposit with {}", quote.vendor_name),
        };

        let outcome = self.gateways.payments.create_checkout(&request).await;

        self.transform(id, |session| {
            if session.is_booked() {
                return Err(WizardServiceError::AlreadyPaid);
            }
            if session.details.selected_quote.as_ref() != Some(&quote) {
                warn!(session_id = %session.id, "vendor changed while the checkout was created");
                return Ok(());
            }

            match outcome {
                Ok(checkout) => {
                    info!(
                        session_id = %session.id,
                        checkout_session_id = %checkout.checkout_session_id,
                        "checkout created"
                    );
                    session.checkout = Some(checkout);
                    session.payment_error = None;
                }
                Err(err) => {
                    warn!(session_id = %session.id, error = %err, "checkout creation failed");
                    session.checkout = None;
                    session.payment_error = Some(err.to_string());
                }
            }
            Ok(())
        })
    }

    /// Autocomplete for the address inputs. Short queries return nothing.
    pub async fn suggest_addresses(&self, query: &str) -> Result<Vec<String>, WizardServiceError> {
        let query = query.trim();
        if query.chars().count() < MIN_SUGGESTION_QUERY {
            return Ok(Vec::new());
        }
        Ok(self.gateways.suggestions.suggest(query).await?)
    }

    pub fn report(&self) -> Result<FunnelReport, WizardServiceError> {
        self.expire_idle(Utc::now())?;
        let sessions = self.repository.list()?;
        Ok(FunnelReport::from_sessions(
            &sessions,
            self.settings.deposit_cents,
        ))
    }
}

fn opened_checkout(session: &WizardSession, checkout_session_id: &str) -> bool {
    session
        .checkout
        .as_ref()
        .is_some_and(|checkout| checkout.checkout_session_id == checkout_session_id)
}

/// Error raised by the wizard service.
#[derive(Debug, thiserror::Error)]
pub enum WizardServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Resume(#[from] ResumeError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("{} must be completed first", .0.label())]
    Incomplete(WizardStep),
    #[error("vendor {0} is not among the fetched quotes")]
    QuoteNotOffered(String),
    #[error("the deposit for this move has already been paid")]
    AlreadyPaid,
    #[error("checkout session {0} does not belong to this quote")]
    CheckoutMismatch(String),
}
