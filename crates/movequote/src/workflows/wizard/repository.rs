use super::domain::SessionId;
use super::session::WizardSession;

/// Storage abstraction so the service module can be exercised in isolation.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, session: WizardSession) -> Result<WizardSession, RepositoryError>;
    fn update(&self, session: WizardSession) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<WizardSession>, RepositoryError>;
    fn list(&self) -> Result<Vec<WizardSession>, RepositoryError>;
    fn remove(&self, id: &SessionId) -> Result<Option<WizardSession>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}
