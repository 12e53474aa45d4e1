use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::footer::format_usd;
use super::session::{QuoteFetchState, WizardSession};
use super::steps::WizardStep;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepCountEntry {
    pub step: WizardStep,
    pub step_label: &'static str,
    pub sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorBookingEntry {
    pub vendor_id: String,
    pub vendor_name: String,
    pub bookings: usize,
    pub booked_value: f64,
}

/// Funnel overview across stored sessions: where customers are parked, which
/// movers get booked and how often pricing came back empty or failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelReport {
    pub total_sessions: usize,
    pub steps: Vec<StepCountEntry>,
    pub quotes_requested: usize,
    pub no_vendor_sessions: usize,
    pub quote_failures: usize,
    pub checkouts_started: usize,
    pub bookings: usize,
    pub deposits_collected_cents: u64,
    pub deposits_collected: String,
    pub vendors: Vec<VendorBookingEntry>,
}

impl FunnelReport {
    pub fn from_sessions(sessions: &[WizardSession], deposit_cents: u32) -> Self {
        let mut by_step: HashMap<WizardStep, usize> = HashMap::new();
        let mut vendors: BTreeMap<String, VendorBookingEntry> = BTreeMap::new();
        let mut quotes_requested = 0;
        let mut no_vendor_sessions = 0;
        let mut quote_failures = 0;
        let mut checkouts_started = 0;
        let mut bookings = 0;

        for session in sessions {
            *by_step.entry(session.controller.current()).or_default() += 1;

            match session.quotes {
                QuoteFetchState::NotRequested => {}
                QuoteFetchState::Loaded { .. } => quotes_requested += 1,
                QuoteFetchState::NoVendors => {
                    quotes_requested += 1;
                    no_vendor_sessions += 1;
                }
                QuoteFetchState::Failed { .. } => {
                    quotes_requested += 1;
                    quote_failures += 1;
                }
            }

            if session.checkout.is_some() || session.is_booked() {
                checkouts_started += 1;
            }

            if !session.is_booked() {
                continue;
            }
            bookings += 1;
            if let Some(quote) = &session.details.selected_quote {
                let entry = vendors
                    .entry(quote.vendor_id.clone())
                    .or_insert_with(|| VendorBookingEntry {
                        vendor_id: quote.vendor_id.clone(),
                        vendor_name: quote.vendor_name.clone(),
                        bookings: 0,
                        booked_value: 0.0,
                    });
                entry.bookings += 1;
                entry.booked_value += quote.total_price;
            }
        }

        let steps = WizardStep::ordered()
            .into_iter()
            .map(|step| StepCountEntry {
                step,
                step_label: step.label(),
                sessions: by_step.get(&step).copied().unwrap_or(0),
            })
            .collect();

        let mut vendors: Vec<_> = vendors.into_values().collect();
        vendors.sort_by(|a, b| b.bookings.cmp(&a.bookings));

        let deposits_collected_cents = bookings as u64 * u64::from(deposit_cents);
        let deposits_collected = u32::try_from(deposits_collected_cents)
            .map(format_usd)
            .unwrap_or_else(|_| format!("${}", deposits_collected_cents / 100));

        Self {
            total_sessions: sessions.len(),
            steps,
            quotes_requested,
            no_vendor_sessions,
            quote_failures,
            checkouts_started,
            bookings,
            deposits_collected_cents,
            deposits_collected,
            vendors,
        }
    }

    /// Share of sessions that ended in a paid deposit.
    pub fn conversion_rate(&self) -> f64 {
        if self.total_sessions == 0 {
            return 0.0;
        }
        self.bookings as f64 / self.total_sessions as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::wizard::controller::WizardController;
    use crate::workflows::wizard::domain::{SessionId, VendorQuote};
    use chrono::Utc;
    use serde_json::Map;

    fn quote(vendor_id: &str, price: f64) -> VendorQuote {
        VendorQuote {
            vendor_id: vendor_id.to_string(),
            vendor_name: format!("{vendor_id} Movers"),
            total_price: price,
            crew_size: 2,
            truck_count: 1,
            hourly_rate: None,
            estimated_hours: None,
            travel_minutes: None,
            extra: Map::new(),
        }
    }

    fn session(id: &str, step: WizardStep) -> WizardSession {
        let mut session = WizardSession::new(SessionId(id.to_string()), Utc::now());
        session.controller = WizardController::at(step);
        session
    }

    fn booked(id: &str, vendor: VendorQuote) -> WizardSession {
        let mut session = session(id, WizardStep::Confirmation);
        session.quotes = QuoteFetchState::from_quotes(vec![vendor.clone()]);
        session.details.selected_quote = Some(vendor);
        session.details.payment.completed = true;
        session
    }

    #[test]
    fn counts_sessions_per_step_and_bookings_per_vendor() {
        let mut failed = session("s-3", WizardStep::ChooseMover);
        failed.quotes = QuoteFetchState::Failed {
            message: "quote backend responded with HTTP 503".to_string(),
        };
        let mut empty = session("s-4", WizardStep::ChooseMover);
        empty.quotes = QuoteFetchState::NoVendors;

        let sessions = vec![
            session("s-1", WizardStep::MoveDetails),
            session("s-2", WizardStep::OriginHome),
            failed,
            empty,
            booked("s-5", quote("atlas", 900.0)),
            booked("s-6", quote("atlas", 1_100.0)),
            booked("s-7", quote("bluebird", 750.0)),
        ];

        let report = FunnelReport::from_sessions(&sessions, 5_000);

        assert_eq!(report.total_sessions, 7);
        assert_eq!(report.steps.len(), WizardStep::COUNT);
        assert_eq!(report.steps[3].sessions, 2);
        assert_eq!(report.steps[6].sessions, 3);
        assert_eq!(report.quotes_requested, 5);
        assert_eq!(report.quote_failures, 1);
        assert_eq!(report.no_vendor_sessions, 1);
        assert_eq!(report.bookings, 3);
        assert_eq!(report.deposits_collected_cents, 15_000);
        assert_eq!(report.deposits_collected, "$150");

        assert_eq!(report.vendors[0].vendor_id, "atlas");
        assert_eq!(report.vendors[0].bookings, 2);
        assert!((report.vendors[0].booked_value - 2_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_store_has_zero_conversion() {
        let report = FunnelReport::from_sessions(&[], 5_000);
        assert_eq!(report.conversion_rate(), 0.0);
        assert!(report.vendors.is_empty());
    }
}
