use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use tokio::sync::Notify;

use crate::workflows::wizard::domain::{HomeType, MoveSide, MoveTime, SessionId, VendorQuote};
use crate::workflows::wizard::gateway::{
    AddressSuggester, CheckoutRequest, CheckoutSession, GatewayError, LeadRecord, LeadSink,
    PaymentConfirmation, PaymentGateway, QuoteProvider, QuoteRequest, WizardGateways,
};
use crate::workflows::wizard::repository::{RepositoryError, SessionRepository};
use crate::workflows::wizard::session::WizardSession;
use crate::workflows::wizard::{MoveAction, QuoteWizardService, WizardSettings};

pub(super) const DEPOSIT_CENTS: u32 = 5_000;

pub(super) fn quote(vendor_id: &str, vendor_name: &str, price: f64) -> VendorQuote {
    VendorQuote {
        vendor_id: vendor_id.to_string(),
        vendor_name: vendor_name.to_string(),
        total_price: price,
        crew_size: 3,
        truck_count: 1,
        hourly_rate: Some(150.0),
        estimated_hours: Some(5.0),
        travel_minutes: Some(25),
        extra: Map::new(),
    }
}

pub(super) fn move_details_actions() -> Vec<MoveAction> {
    vec![
        MoveAction::SetOrigin("123 Main St, Austin, TX".to_string()),
        MoveAction::SetDestination("456 Oak Ave, Austin, TX".to_string()),
        MoveAction::SetMoveDate(NaiveDate::from_ymd_opt(2025, 6, 14)),
        MoveAction::SetMoveTime(Some(MoveTime::Morning)),
    ]
}

pub(super) fn home_actions() -> Vec<MoveAction> {
    vec![
        MoveAction::SetHomeType {
            side: MoveSide::Origin,
            home_type: HomeType::House,
        },
        MoveAction::SetRooms {
            side: MoveSide::Origin,
            rooms: Some(3),
        },
        MoveAction::SetHomeType {
            side: MoveSide::Destination,
            home_type: HomeType::Apartment,
        },
        MoveAction::SetFloor {
            side: MoveSide::Destination,
            floor: Some(4),
        },
    ]
}

pub(super) fn contact_actions() -> Vec<MoveAction> {
    vec![
        MoveAction::SetFirstName("Dana".to_string()),
        MoveAction::SetLastName("Reyes".to_string()),
        MoveAction::SetEmail("dana@example.com".to_string()),
        MoveAction::SetPhone("5125550100".to_string()),
    ]
}

pub(super) async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) sessions: Arc<Mutex<HashMap<SessionId, WizardSession>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, session: WizardSession) -> Result<WizardSession, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn update(&self, session: WizardSession) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        guard.insert(session.id.clone(), session);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<WizardSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<WizardSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn remove(&self, id: &SessionId) -> Result<Option<WizardSession>, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.remove(id))
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _session: WizardSession) -> Result<WizardSession, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn update(&self, _session: WizardSession) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<WizardSession>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn list(&self) -> Result<Vec<WizardSession>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn remove(&self, _id: &SessionId) -> Result<Option<WizardSession>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }
}

/// Quote desk whose answer can be swapped between calls.
#[derive(Default)]
pub(super) struct ScriptedQuotes {
    response: Mutex<Option<Result<Vec<VendorQuote>, u16>>>,
    requests: Mutex<Vec<QuoteRequest>>,
}

impl ScriptedQuotes {
    pub(super) fn offering(quotes: Vec<VendorQuote>) -> Self {
        let desk = Self::default();
        desk.respond_with(Ok(quotes));
        desk
    }

    pub(super) fn respond_with(&self, response: Result<Vec<VendorQuote>, u16>) {
        *self.response.lock().expect("quotes mutex poisoned") = Some(response);
    }

    pub(super) fn requests(&self) -> Vec<QuoteRequest> {
        self.requests.lock().expect("quotes mutex poisoned").clone()
    }
}

#[async_trait]
impl QuoteProvider for ScriptedQuotes {
    async fn quotes(&self, request: &QuoteRequest) -> Result<Vec<VendorQuote>, GatewayError> {
        self.requests
            .lock()
            .expect("quotes mutex poisoned")
            .push(request.clone());
        match self.response.lock().expect("quotes mutex poisoned").clone() {
            Some(Ok(quotes)) => Ok(quotes),
            Some(Err(status)) => Err(GatewayError::Status {
                service: "quote backend",
                status,
            }),
            None => Ok(Vec::new()),
        }
    }
}

/// Quote desk that parks every request until the test releases it.
pub(super) struct GatedQuotes {
    quotes: Vec<VendorQuote>,
    pub(super) entered: Notify,
    pub(super) release: Notify,
}

impl GatedQuotes {
    pub(super) fn offering(quotes: Vec<VendorQuote>) -> Self {
        Self {
            quotes,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl QuoteProvider for GatedQuotes {
    async fn quotes(&self, _request: &QuoteRequest) -> Result<Vec<VendorQuote>, GatewayError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.quotes.clone())
    }
}

#[derive(Default)]
pub(super) struct ScriptedPayments {
    pub(super) fail_checkout: Mutex<bool>,
    pub(super) paid: Mutex<bool>,
    pub(super) checkouts: Mutex<Vec<CheckoutRequest>>,
}

impl ScriptedPayments {
    pub(super) fn paying() -> Self {
        let payments = Self::default();
        *payments.paid.lock().expect("payments mutex poisoned") = true;
        payments
    }

    pub(super) fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.checkouts.lock().expect("payments mutex poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedPayments {
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        if *self.fail_checkout.lock().expect("payments mutex poisoned") {
            return Err(GatewayError::Transport {
                service: "payments",
                message: "connection reset".to_string(),
            });
        }
        self.checkouts
            .lock()
            .expect("payments mutex poisoned")
            .push(request.clone());
        Ok(CheckoutSession {
            checkout_session_id: "cs_test_1".to_string(),
            checkout_url: "https://checkout.example.com/pay/cs_test_1".to_string(),
            booking_id: Some("bk-100".to_string()),
        })
    }

    async fn confirm(
        &self,
        checkout_session_id: &str,
    ) -> Result<PaymentConfirmation, GatewayError> {
        Ok(PaymentConfirmation {
            checkout_session_id: checkout_session_id.to_string(),
            paid: *self.paid.lock().expect("payments mutex poisoned"),
            booking_id: None,
            amount_cents: DEPOSIT_CENTS,
        })
    }
}

#[derive(Default)]
pub(super) struct MemoryLeads {
    pub(super) fail: bool,
    leads: Mutex<Vec<LeadRecord>>,
}

impl MemoryLeads {
    pub(super) fn failing() -> Self {
        Self {
            fail: true,
            leads: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn leads(&self) -> Vec<LeadRecord> {
        self.leads.lock().expect("leads mutex poisoned").clone()
    }
}

#[async_trait]
impl LeadSink for MemoryLeads {
    async fn record(&self, lead: &LeadRecord) -> Result<String, GatewayError> {
        if self.fail {
            return Err(GatewayError::Status {
                service: "lead storage",
                status: 500,
            });
        }
        let mut leads = self.leads.lock().expect("leads mutex poisoned");
        leads.push(lead.clone());
        Ok(format!("lead-{}", leads.len()))
    }
}

pub(super) struct StaticAddresses;

#[async_trait]
impl AddressSuggester for StaticAddresses {
    async fn suggest(&self, query: &str) -> Result<Vec<String>, GatewayError> {
        Ok(vec![
            format!("{query}, Austin, Texas"),
            format!("{query}, Dallas, Texas"),
        ])
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<QuoteWizardService<MemoryRepository>>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) quotes: Arc<ScriptedQuotes>,
    pub(super) payments: Arc<ScriptedPayments>,
    pub(super) leads: Arc<MemoryLeads>,
}

pub(super) fn build_harness() -> Harness {
    build_harness_with(ScriptedPayments::paying(), MemoryLeads::default())
}

pub(super) fn build_harness_with(payments: ScriptedPayments, leads: MemoryLeads) -> Harness {
    let repository = Arc::new(MemoryRepository::default());
    let quotes = Arc::new(ScriptedQuotes::offering(vec![
        quote("atlas", "Atlas Van Lines", 1_240.0),
        quote("bluebird", "Bluebird Movers", 980.0),
    ]));
    let payments = Arc::new(payments);
    let leads = Arc::new(leads);

    let gateways = WizardGateways {
        suggestions: Arc::new(StaticAddresses),
        quotes: quotes.clone(),
        payments: payments.clone(),
        leads: leads.clone(),
    };
    let service = Arc::new(QuoteWizardService::new(
        repository.clone(),
        gateways,
        WizardSettings {
            deposit_cents: DEPOSIT_CENTS,
            ..WizardSettings::default()
        },
    ));

    Harness {
        service,
        repository,
        quotes,
        payments,
        leads,
    }
}

/// Service over a fresh memory repository with a custom quote desk and settings.
pub(super) fn service_with(
    quotes: Arc<dyn QuoteProvider>,
    settings: WizardSettings,
) -> (Arc<QuoteWizardService<MemoryRepository>>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let gateways = WizardGateways {
        suggestions: Arc::new(StaticAddresses),
        quotes,
        payments: Arc::new(ScriptedPayments::paying()),
        leads: Arc::new(MemoryLeads::default()),
    };
    let service = Arc::new(QuoteWizardService::new(
        repository.clone(),
        gateways,
        settings,
    ));
    (service, repository)
}

/// Walks a fresh session up to the review step with `vendor_id` selected.
pub(super) async fn session_at_review(harness: &Harness, vendor_id: &str) -> SessionId {
    let service = &harness.service;
    let id = service.start().expect("session starts").id;

    service
        .apply(&id, &move_details_actions())
        .expect("details apply");
    service.apply(&id, &home_actions()).expect("homes apply");
    service.next(&id).expect("to origin home");
    service.next(&id).expect("to destination");
    service.next(&id).expect("to choose mover");
    service.fetch_quotes(&id).await.expect("quotes fetched");
    service.select_quote(&id, vendor_id).expect("quote selected");
    service.next(&id).expect("to contact info");
    service
        .apply(&id, &contact_actions())
        .expect("contact applies");
    service.next(&id).expect("to review");
    id
}
