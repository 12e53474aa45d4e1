use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use metrics_exporter_prometheus::PrometheusHandle;
use movequote::config::AppConfig;
use movequote::workflows::wizard::{
    AddressSuggester, CachedSuggester, CheckoutRequest, CheckoutSession, GatewayError,
    HeavyItem, LeadRecord, LeadSink, MapboxGeocoder, PaymentConfirmation, PaymentGateway,
    QuoteProvider, QuoteRequest, RemoteBackend, RepositoryError, SessionId, SessionRepository,
    VendorQuote, WizardGateways, WizardSession,
};
use serde_json::Map;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, WizardSession>>>,
}

impl SessionRepository for InMemorySessionRepository {
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
        if guard.contains_key(&session.id) {
            guard.insert(session.id.clone(), session);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<WizardSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<WizardSession>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        let mut sessions: Vec<_> = guard.values().cloned().collect();
        sessions.sort_by_key(|session| session.created_at);
        Ok(sessions)
    }

    fn remove(&self, id: &SessionId) -> Result<Option<WizardSession>, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.remove(id))
    }
}

struct DemoVendor {
    id: &'static str,
    name: &'static str,
    hourly_rate: f64,
    crew_size: u8,
}

const DEMO_VENDORS: [DemoVendor; 3] = [
    DemoVendor {
        id: "atlas-van-lines",
        name: "Atlas Van Lines",
        hourly_rate: 165.0,
        crew_size: 3,
    },
    DemoVendor {
        id: "bluebird-movers",
        name: "Bluebird Movers",
        hourly_rate: 139.0,
        crew_size: 2,
    },
    DemoVendor {
        id: "two-brothers",
        name: "Two Brothers Moving",
        hourly_rate: 149.0,
        crew_size: 2,
    },
];

/// Local pricing desk used when no quote backend is configured. Crews do not
/// work Sundays, so those dates return no vendors.
#[derive(Default)]
pub(crate) struct DemoQuoteDesk;

impl DemoQuoteDesk {
    fn estimated_hours(request: &QuoteRequest) -> f64 {
        let rooms = f64::from(request.origin_details.rooms.unwrap_or(2));
        let stairs = f64::from(
            u16::from(request.origin_details.stairs.unwrap_or(0))
                + u16::from(request.destination_details.stairs.unwrap_or(0)),
        );
        let heavy = request
            .origin_details
            .heavy_items
            .iter()
            .map(|item| match item {
                HeavyItem::Piano | HeavyItem::HotTub => 1.5,
                HeavyItem::Safe | HeavyItem::PoolTable => 1.0,
                HeavyItem::GymEquipment => 0.5,
            })
            .sum::<f64>();
        let services = request.origin_details.services.len() as f64;

        2.0 + rooms * 1.25 + stairs * 0.5 + heavy + services
    }
}

#[async_trait]
impl QuoteProvider for DemoQuoteDesk {
    async fn quotes(&self, request: &QuoteRequest) -> Result<Vec<VendorQuote>, GatewayError> {
        if request.move_date.weekday() == Weekday::Sun {
            return Ok(Vec::new());
        }

        let hours = Self::estimated_hours(request);
        Ok(DEMO_VENDORS
            .iter()
            .map(|vendor| {
                let labour = hours * vendor.hourly_rate;
                VendorQuote {
                    vendor_id: vendor.id.to_string(),
                    vendor_name: vendor.name.to_string(),
                    total_price: (labour * 100.0).round() / 100.0,
                    crew_size: vendor.crew_size,
                    truck_count: 1,
                    hourly_rate: Some(vendor.hourly_rate),
                    estimated_hours: Some(hours),
                    travel_minutes: Some(30),
                    extra: Map::new(),
                }
            })
            .collect())
    }
}

/// Checkout stand-in that treats every session it created as paid.
#[derive(Default)]
pub(crate) struct DemoPayments {
    issued: Mutex<HashSet<String>>,
    sequence: AtomicU64,
}

#[async_trait]
impl PaymentGateway for DemoPayments {
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let number = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let checkout_session_id = format!("cs_demo_{number:04}");
        self.issued
            .lock()
            .expect("payments mutex poisoned")
            .insert(checkout_session_id.clone());

        info!(
            checkout_session_id = %checkout_session_id,
            amount_cents = request.amount_cents,
            "demo checkout issued"
        );
        Ok(CheckoutSession {
            checkout_url: format!("https://checkout.demo.invalid/pay/{checkout_session_id}"),
            booking_id: Some(format!("BK-{number:05}")),
            checkout_session_id,
        })
    }

    async fn confirm(
        &self,
        checkout_session_id: &str,
    ) -> Result<PaymentConfirmation, GatewayError> {
        let paid = self
            .issued
            .lock()
            .expect("payments mutex poisoned")
            .contains(checkout_session_id);
        Ok(PaymentConfirmation {
            checkout_session_id: checkout_session_id.to_string(),
            paid,
            booking_id: None,
            amount_cents: 0,
        })
    }
}

#[derive(Default)]
pub(crate) struct DemoLeads {
    sequence: AtomicU64,
    leads: Mutex<Vec<LeadRecord>>,
}

impl DemoLeads {
    pub(crate) fn leads(&self) -> Vec<LeadRecord> {
        self.leads.lock().expect("leads mutex poisoned").clone()
    }
}

#[async_trait]
impl LeadSink for DemoLeads {
    async fn record(&self, lead: &LeadRecord) -> Result<String, GatewayError> {
        let number = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.leads
            .lock()
            .expect("leads mutex poisoned")
            .push(lead.clone());
        Ok(format!("lead-{number:06}"))
    }
}

const DEMO_ADDRESSES: [&str; 8] = [
    "123 Main St, Austin, Texas 78701",
    "125 Main St, Austin, Texas 78701",
    "456 Oak Ave, Round Rock, Texas 78664",
    "742 Evergreen Ter, Springfield, Oregon 97477",
    "88 Pine St, Denver, Colorado 80202",
    "12 Elm St, Boulder, Colorado 80302",
    "1600 Lake Shore Dr, Chicago, Illinois 60611",
    "9 Harbor Rd, Seattle, Washington 98101",
];

/// Autocomplete backed by a fixed address list.
pub(crate) struct DemoAddressBook;

#[async_trait]
impl AddressSuggester for DemoAddressBook {
    async fn suggest(&self, query: &str) -> Result<Vec<String>, GatewayError> {
        let needle = query.trim().to_lowercase();
        Ok(DEMO_ADDRESSES
            .iter()
            .filter(|address| address.to_lowercase().contains(&needle))
            .take(MapboxGeocoder::SUGGESTION_LIMIT)
            .map(|address| address.to_string())
            .collect())
    }
}

/// Remote collaborators when configured, the demo desk otherwise. Suggestions
/// always go through the cache.
pub(crate) fn build_gateways(config: &AppConfig) -> Result<WizardGateways, GatewayError> {
    let integrations = &config.integrations;
    let timeout = integrations.http_timeout();

    let quotes: Arc<dyn QuoteProvider>;
    let payments: Arc<dyn PaymentGateway>;
    let leads: Arc<dyn LeadSink>;
    match &integrations.quote_api_url {
        Some(url) => {
            let backend = Arc::new(RemoteBackend::new(url, timeout)?);
            info!(quote_api_url = %url, "using remote quote backend");
            quotes = backend.clone();
            payments = backend.clone();
            leads = backend;
        }
        None => {
            info!("no quote backend configured; using demo desk");
            quotes = Arc::new(DemoQuoteDesk);
            payments = Arc::new(DemoPayments::default());
            leads = Arc::new(DemoLeads::default());
        }
    }

    let geocoder: Arc<dyn AddressSuggester> = match &integrations.mapbox_token {
        Some(token) => Arc::new(MapboxGeocoder::new(
            &integrations.mapbox_base_url,
            token,
            timeout,
        )?),
        None => Arc::new(DemoAddressBook),
    };
    let ttl = chrono::Duration::from_std(std::time::Duration::from_secs(
        config.wizard.suggestion_ttl_secs,
    ))
    .unwrap_or_else(|_| chrono::Duration::minutes(5));

    Ok(WizardGateways {
        suggestions: Arc::new(CachedSuggester::new(geocoder, ttl)),
        quotes,
        payments,
        leads,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
