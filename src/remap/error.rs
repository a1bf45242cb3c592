//! Remap errors and outcomes

/// A built-in action or editor command failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for ActionError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{:#}", err))
    }
}

/// Errors that abort remap expansion
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemapError {
    /// Expansion nested as deep as the configured maximum
    #[error("E223: Recursive mapping")]
    RecursiveMapping,
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// How handling a key ended, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The user stopped a recursive expansion
    Aborted,
}

impl Outcome {
    pub fn is_aborted(self) -> bool {
        self == Outcome::Aborted
    }
}
