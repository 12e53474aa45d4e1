use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::steps::WizardStep;

const RESUME_BASE: &str = "http://wizard.invalid/";

/// Query parameters the payment provider appends when it redirects back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReturn {
    pub checkout_session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
}

/// Position decoded from a browser location: the requested step plus any
/// payment redirect parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeToken {
    pub step: WizardStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_return: Option<PaymentReturn>,
}

#[derive(Debug, thiserror::Error)]
#[error("could not read resume location '{location}': {reason}")]
pub struct ResumeError {
    location: String,
    reason: String,
}

fn resolve(base: &Url, location: &str) -> Result<Url, ResumeError> {
    base.join(location).map_err(|err| ResumeError {
        location: location.to_string(),
        reason: err.to_string(),
    })
}

impl ResumeToken {
    pub fn for_step(step: WizardStep) -> Self {
        Self {
            step,
            payment_return: None,
        }
    }

    /// Accepts a full URL, a path with query/fragment, or a bare fragment such
    /// as `#/step4`. Unknown fragments resume at the first step.
    pub fn parse(location: &str) -> Result<Self, ResumeError> {
        let base = Url::parse(RESUME_BASE).map_err(|err| ResumeError {
            location: RESUME_BASE.to_string(),
            reason: err.to_string(),
        })?;
        let url = resolve(&base, location.trim())?;

        let fragment = url.fragment().unwrap_or_default();
        let step = WizardStep::from_fragment(fragment).unwrap_or_else(WizardStep::first);

        let mut checkout_session_id = None;
        let mut lead_id = None;
        let mut collect = |key: &str, value: String| match key {
            "session_id" if !value.is_empty() => checkout_session_id = Some(value),
            "lead_id" if !value.is_empty() => lead_id = Some(value),
            _ => {}
        };

        for (key, value) in url.query_pairs() {
            collect(&key, value.into_owned());
        }

        // Some providers append their parameters after the hash route instead.
        if let Some((_, query)) = fragment.split_once('?') {
            let hash_query = resolve(&base, &format!("?{query}"))?;
            for (key, value) in hash_query.query_pairs() {
                collect(&key, value.into_owned());
            }
        }

        let payment_return = checkout_session_id.map(|checkout_session_id| PaymentReturn {
            checkout_session_id,
            lead_id,
        });

        Ok(Self {
            step,
            payment_return,
        })
    }

    pub fn fragment(&self) -> String {
        self.step.fragment()
    }
}
