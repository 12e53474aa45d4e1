//! Per-step gate checks. Each check only decides whether Continue is enabled.

use std::sync::OnceLock;

use regex::Regex;

use super::domain::{ContactInfo, HomeDetails, MoveDetails};
use super::steps::WizardStep;

pub const MIN_PHONE_LENGTH: usize = 10;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

pub fn step_satisfied(step: WizardStep, details: &MoveDetails) -> bool {
    match step {
        WizardStep::MoveDetails => move_details_complete(details),
        WizardStep::OriginHome => home_selected(&details.origin_details),
        WizardStep::Destination => home_selected(&details.destination_details),
        WizardStep::ChooseMover => details.selected_quote.is_some(),
        WizardStep::ContactInfo => contact_complete(&details.contact),
        WizardStep::ReviewAndPay => details.payment.completed,
        WizardStep::Confirmation => true,
    }
}

/// First step, in wizard order, whose check fails. `None` once everything passes.
pub fn first_incomplete(details: &MoveDetails) -> Option<WizardStep> {
    WizardStep::ordered()
        .into_iter()
        .find(|step| !step_satisfied(*step, details))
}

/// First incomplete step strictly before `step`, if any.
pub fn first_incomplete_before(step: WizardStep, details: &MoveDetails) -> Option<WizardStep> {
    first_incomplete(details).filter(|blocking| *blocking < step)
}

pub fn move_details_complete(details: &MoveDetails) -> bool {
    !details.origin.trim().is_empty()
        && !details.destination.trim().is_empty()
        && details.move_date.is_some()
        && details.move_time.is_some()
}

/// Type-specific fields are optional, so only the type itself is checked.
pub fn home_selected(home: &HomeDetails) -> bool {
    home.home_type.is_some()
}

pub fn contact_complete(contact: &ContactInfo) -> bool {
    !contact.first_name.trim().is_empty()
        && !contact.last_name.trim().is_empty()
        && is_valid_email(&contact.email)
        && is_valid_phone(&contact.phone)
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email.trim())
}

pub fn is_valid_phone(phone: &str) -> bool {
    let phone = phone.trim();
    !phone.is_empty() && phone.chars().count() >= MIN_PHONE_LENGTH
}
