use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{
    ContactInfo, HomeDetails, HomeField, MoveSide, MoveTime, PaymentState, SessionId, VendorQuote,
};
use super::footer::{format_usd, FooterView};
use super::session::{QuoteFetchState, WizardSession};
use super::steps::WizardStep;
use super::validation;

/// Form state for one home details step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeStepView {
    pub side: MoveSide,
    pub address: String,
    pub visible_fields: Vec<HomeField>,
    pub details: HomeDetails,
}

impl HomeStepView {
    fn new(side: MoveSide, address: &str, details: &HomeDetails) -> Self {
        Self {
            side,
            address: address.to_string(),
            visible_fields: details.visible_fields(),
            details: details.clone(),
        }
    }
}

/// What the active step renders, seeded from the shared store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepView {
    MoveDetails {
        origin: String,
        destination: String,
        move_date: Option<NaiveDate>,
        move_time: Option<MoveTime>,
        time_options: Vec<TimeOption>,
    },
    OriginHome(HomeStepView),
    Destination(HomeStepView),
    ChooseMover {
        origin: String,
        destination: String,
        move_date: Option<NaiveDate>,
        quotes: QuoteFetchState,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        selected_vendor_id: Option<String>,
    },
    ContactInfo {
        contact: ContactInfo,
        email_valid: bool,
        phone_valid: bool,
    },
    ReviewAndPay {
        origin: String,
        destination: String,
        move_date: Option<NaiveDate>,
        move_time: Option<MoveTime>,
        quote: Option<VendorQuote>,
        contact: ContactInfo,
        deposit_cents: u32,
        deposit_label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        checkout_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        payment_error: Option<String>,
    },
    Confirmation {
        payment: PaymentState,
        quote: Option<VendorQuote>,
        move_date: Option<NaiveDate>,
        contact: ContactInfo,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeOption {
    pub value: MoveTime,
    pub label: &'static str,
}

impl StepView {
    pub fn render(step: WizardStep, session: &WizardSession, deposit_cents: u32) -> Self {
        let details = &session.details;
        match step {
            WizardStep::MoveDetails => Self::MoveDetails {
                origin: details.origin.clone(),
                destination: details.destination.clone(),
                move_date: details.move_date,
                move_time: details.move_time,
                time_options: MoveTime::ordered()
                    .into_iter()
                    .map(|value| TimeOption {
                        value,
                        label: value.label(),
                    })
                    .collect(),
            },
            WizardStep::OriginHome => Self::OriginHome(HomeStepView::new(
                MoveSide::Origin,
                &details.origin,
                &details.origin_details,
            )),
            WizardStep::Destination => Self::Destination(HomeStepView::new(
                MoveSide::Destination,
                &details.destination,
                &details.destination_details,
            )),
            WizardStep::ChooseMover => Self::ChooseMover {
                origin: details.origin.clone(),
                destination: details.destination.clone(),
                move_date: details.move_date,
                quotes: session.quotes.clone(),
                error: session.quotes.message().map(str::to_string),
                selected_vendor_id: details
                    .selected_quote
                    .as_ref()
                    .map(|quote| quote.vendor_id.clone()),
            },
            WizardStep::ContactInfo => Self::ContactInfo {
                contact: details.contact.clone(),
                email_valid: validation::is_valid_email(&details.contact.email),
                phone_valid: validation::is_valid_phone(&details.contact.phone),
            },
            WizardStep::ReviewAndPay => Self::ReviewAndPay {
                origin: details.origin.clone(),
                destination: details.destination.clone(),
                move_date: details.move_date,
                move_time: details.move_time,
                quote: details.selected_quote.clone(),
                contact: details.contact.clone(),
                deposit_cents,
                deposit_label: format_usd(deposit_cents),
                checkout_url: session
                    .checkout
                    .as_ref()
                    .map(|checkout| checkout.checkout_url.clone()),
                payment_error: session.payment_error.clone(),
            },
            WizardStep::Confirmation => Self::Confirmation {
                payment: details.payment.clone(),
                quote: details.selected_quote.clone(),
                move_date: details.move_date,
                contact: details.contact.clone(),
            },
        }
    }
}

/// Everything a client needs to draw the current screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardSnapshot {
    pub session_id: SessionId,
    pub step: WizardStep,
    pub step_index: usize,
    pub fragment: String,
    pub view: StepView,
    pub footer: FooterView,
}

impl WizardSnapshot {
    pub fn of(session: &WizardSession, deposit_cents: u32) -> Self {
        let step = session.controller.current();
        Self {
            session_id: session.id.clone(),
            step,
            step_index: step.index(),
            fragment: step.fragment(),
            view: StepView::render(step, session, deposit_cents),
            footer: FooterView::build(&session.controller, &session.details, deposit_cents),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::wizard::controller::WizardController;
    use crate::workflows::wizard::domain::HomeType;
    use crate::workflows::wizard::session::NO_VENDORS_MESSAGE;
    use chrono::Utc;

    fn session() -> WizardSession {
        WizardSession::new(SessionId("s-1".to_string()), Utc::now())
    }

    #[test]
    fn home_step_lists_fields_for_the_selected_type() {
        let mut session = session();
        session.details.destination = "9 Harbor Rd".to_string();
        session.details.destination_details.home_type = Some(HomeType::Apartment);

        match StepView::render(WizardStep::Destination, &session, 5_000) {
            StepView::Destination(view) => {
                assert_eq!(view.side, MoveSide::Destination);
                assert_eq!(view.address, "9 Harbor Rd");
                assert!(view.visible_fields.contains(&HomeField::Floor));
                assert!(!view.visible_fields.contains(&HomeField::Sqft));
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn mover_step_surfaces_no_vendor_message() {
        let mut session = session();
        session.quotes = QuoteFetchState::NoVendors;

        match StepView::render(WizardStep::ChooseMover, &session, 5_000) {
            StepView::ChooseMover { error, .. } => {
                assert_eq!(error.as_deref(), Some(NO_VENDORS_MESSAGE));
            }
            other => panic!("unexpected view {other:?}"),
        }
    }

    #[test]
    fn snapshot_tags_the_view_with_its_step() {
        let mut session = session();
        session.controller = WizardController::at(WizardStep::ContactInfo);
        session.details.contact.email = "bob@@example".to_string();

        let snapshot = WizardSnapshot::of(&session, 5_000);
        assert_eq!(snapshot.fragment, "#/step5");

        let value = serde_json::to_value(&snapshot).expect("serializes");
        assert_eq!(value["view"]["step"], "contact_info");
        assert_eq!(value["view"]["email_valid"], false);
        assert_eq!(value["footer"]["continue_enabled"], false);
    }
}
