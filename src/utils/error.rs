use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("selection came back empty for {subject}")]
    EmptySelection { subject: String },

    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Host(String),

    #[error("{0}")]
    Wrapped(Box<WrappedError>),
}

impl CoreError {
    /// Kind name as rendered in flattened cause chains.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "ValidationError",
            CoreError::EmptySelection { .. } => "EmptySelectionError",
            CoreError::Parse(_) => "ParseError",
            CoreError::Host(_) => "HostError",
            CoreError::Wrapped(_) => "WrappedError",
        }
    }

    pub fn wrapped(error: CoreError) -> CoreError {
        CoreError::Wrapped(Box::new(WrappedError::wrap(error)))
    }
}

/// One already-materialized link of a cause chain. Links are snapshots,
/// not live references; traversal is bounded by the list length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorLink {
    pub name: String,
    pub message: String,
    pub extra: Option<String>,
}

impl ErrorLink {
    pub fn of(error: &CoreError) -> Self {
        let extra = match error {
            CoreError::Wrapped(inner) => inner.extra.clone(),
            _ => None,
        };
        Self {
            name: error.kind().to_string(),
            message: error.to_string(),
            extra,
        }
    }
}

/// Envelope created at every wrapper boundary. The message equals the
/// immediate cause's message; `causes` holds the full prior chain,
/// outermost first.
#[derive(Debug, Default)]
pub struct WrappedError {
    pub message: String,
    pub extra: Option<String>,
    pub causes: Vec<ErrorLink>,
}

impl WrappedError {
    pub fn wrap(cause: CoreError) -> Self {
        let mut causes = vec![ErrorLink::of(&cause)];
        if let CoreError::Wrapped(inner) = &cause {
            causes.extend(inner.causes.iter().cloned());
        }
        Self {
            message: cause.to_string(),
            extra: None,
            causes,
        }
    }

    /// Envelope with no prior chain, for failures that originate at the
    /// boundary itself.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extra: None,
            causes: Vec::new(),
        }
    }
}

impl std::fmt::Display for WrappedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WrappedError {}
