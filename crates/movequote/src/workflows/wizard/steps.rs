use serde::{Deserialize, Serialize};

/// Screens of the quote wizard, in the order a customer walks through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    MoveDetails,
    OriginHome,
    Destination,
    ChooseMover,
    ContactInfo,
    ReviewAndPay,
    Confirmation,
}

impl WizardStep {
    pub const COUNT: usize = 7;

    pub const fn ordered() -> [Self; Self::COUNT] {
        [
            Self::MoveDetails,
            Self::OriginHome,
            Self::Destination,
            Self::ChooseMover,
            Self::ContactInfo,
            Self::ReviewAndPay,
            Self::Confirmation,
        ]
    }

    pub const fn first() -> Self {
        Self::MoveDetails
    }

    pub const fn last() -> Self {
        Self::Confirmation
    }

    pub const fn index(self) -> usize {
        match self {
            Self::MoveDetails => 0,
            Self::OriginHome => 1,
            Self::Destination => 2,
            Self::ChooseMover => 3,
            Self::ContactInfo => 4,
            Self::ReviewAndPay => 5,
            Self::Confirmation => 6,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ordered().get(index).copied()
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::MoveDetails => "Move Details",
            Self::OriginHome => "Current Home",
            Self::Destination => "New Home",
            Self::ChooseMover => "Choose Mover",
            Self::ContactInfo => "Contact Info",
            Self::ReviewAndPay => "Review & Pay",
            Self::Confirmation => "Confirmation",
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    /// URL fragment the front end shows for this step: `#/` then `#/step2` .. `#/step7`.
    pub fn fragment(self) -> String {
        match self {
            Self::MoveDetails => "#/".to_string(),
            other => format!("#/step{}", other.index() + 1),
        }
    }

    /// Parses a fragment with or without the leading `#`. Returns `None` for
    /// anything that does not name a step.
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        let path = fragment.trim().trim_start_matches('#');
        let path = path.split('?').next().unwrap_or_default();
        let path = path.trim_matches('/');

        if path.is_empty() {
            return Some(Self::first());
        }

        let number = path.strip_prefix("step")?.parse::<usize>().ok()?;
        number.checked_sub(1).and_then(Self::from_index)
    }
}
