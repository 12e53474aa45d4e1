use serde::{Deserialize, Serialize};

use super::domain::MoveDetails;
use super::resume::ResumeToken;
use super::steps::WizardStep;
use super::validation;

/// Reasons a navigation request leaves the wizard where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("{} is not complete yet", .0.label())]
    StepIncomplete(WizardStep),
    #[error("already at the first step")]
    AtFirstStep,
    #[error("step index {requested} has not been reached yet (current index {current})")]
    AheadOfProgress { requested: usize, current: usize },
    #[error("there is no step with index {0}")]
    UnknownStep(usize),
}

/// Tracks the active step. Every refused transition leaves the position untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardController {
    current: WizardStep,
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardController {
    pub fn new() -> Self {
        Self::at(WizardStep::first())
    }

    pub fn at(step: WizardStep) -> Self {
        Self { current: step }
    }

    pub fn current(&self) -> WizardStep {
        self.current
    }

    pub fn index(&self) -> usize {
        self.current.index()
    }

    pub fn fragment(&self) -> String {
        self.current.fragment()
    }

    /// Mirrors the Continue control: the active step passes and a later step exists.
    pub fn can_continue(&self, details: &MoveDetails) -> bool {
        self.current.next().is_some() && validation::step_satisfied(self.current, details)
    }

    pub fn can_go_back(&self) -> bool {
        self.current.previous().is_some()
    }

    pub fn go_next(&mut self, details: &MoveDetails) -> Result<WizardStep, NavigationError> {
        if !validation::step_satisfied(self.current, details) {
            return Err(NavigationError::StepIncomplete(self.current));
        }

        if let Some(next) = self.current.next() {
            self.current = next;
        }
        Ok(self.current)
    }

    pub fn go_back(&mut self) -> Result<WizardStep, NavigationError> {
        let previous = self.current.previous().ok_or(NavigationError::AtFirstStep)?;
        self.current = previous;
        Ok(self.current)
    }

    /// Jumps to an already reached step. Forward jumps are refused.
    pub fn go_to_step(&mut self, index: usize) -> Result<WizardStep, NavigationError> {
        let target = WizardStep::from_index(index).ok_or(NavigationError::UnknownStep(index))?;
        if index > self.index() {
            return Err(NavigationError::AheadOfProgress {
                requested: index,
                current: self.index(),
            });
        }

        self.current = target;
        Ok(self.current)
    }

    /// Furthest step a customer may stand on given the collected data.
    pub fn furthest_reachable(details: &MoveDetails) -> WizardStep {
        validation::first_incomplete(details).unwrap_or_else(WizardStep::last)
    }

    /// Re-syncs with a browser location (reload, back/forward, deep link, or
    /// payment redirect). The requested step is clamped to the furthest
    /// reachable one so a URL can never skip an incomplete step.
    pub fn resume(&mut self, token: &ResumeToken, details: &MoveDetails) -> WizardStep {
        let requested = if token.payment_return.is_some() {
            WizardStep::Confirmation
        } else {
            token.step
        };

        self.current = requested.min(Self::furthest_reachable(details));
        self.current
    }
}
