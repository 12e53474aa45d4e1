use serde::Serialize;

use super::controller::WizardController;
use super::domain::MoveDetails;
use super::steps::WizardStep;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
    pub index: usize,
    pub step: WizardStep,
    pub label: &'static str,
    pub fragment: String,
    pub clickable: bool,
    pub current: bool,
}

/// Continue/Back controls and the clickable progress list under every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FooterView {
    pub steps: Vec<ProgressEntry>,
    pub back_enabled: bool,
    pub continue_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_label: Option<String>,
}

impl FooterView {
    pub fn build(controller: &WizardController, details: &MoveDetails, deposit_cents: u32) -> Self {
        let current = controller.current();
        let steps = WizardStep::ordered()
            .into_iter()
            .map(|step| ProgressEntry {
                index: step.index(),
                step,
                label: step.label(),
                fragment: step.fragment(),
                clickable: step <= current,
                current: step == current,
            })
            .collect();

        Self {
            steps,
            back_enabled: controller.can_go_back(),
            continue_enabled: controller.can_continue(details),
            continue_label: continue_label(current, details, deposit_cents),
        }
    }
}

pub fn continue_label(step: WizardStep, details: &MoveDetails, deposit_cents: u32) -> Option<String> {
    match step {
        WizardStep::ChooseMover => Some(match &details.selected_quote {
            Some(quote) => format!("Continue with {} →", quote.vendor_name),
            None => "Select a Moving Company".to_string(),
        }),
        WizardStep::ReviewAndPay => Some(format!("Pay {} Deposit", format_usd(deposit_cents))),
        WizardStep::Confirmation => None,
        _ => Some("Continue →".to_string()),
    }
}

/// `$50` for whole dollars, `$49.99` otherwise.
pub fn format_usd(cents: u32) -> String {
    let dollars = cents / 100;
    match cents % 100 {
        0 => format!("${dollars}"),
        remainder => format!("${dollars}.{remainder:02}"),
    }
}
