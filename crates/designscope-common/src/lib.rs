use serde::{Deserialize, Serialize};

/// Errors surfaced to the caller of an analysis attempt.
///
/// Every variant renders a message that can be shown to a user as-is.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Please select at least one layer to analyze")]
    NoSelection,

    #[error("Extraction failed at node {node_id}: {reason}")]
    Extraction { node_id: String, reason: String },

    #[error("Invalid API key format. Keys start with \"sk-ant-\" and are longer than 20 characters")]
    InvalidCredential,

    #[error("Network error{}: {reason}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Network { status: Option<u16>, reason: String },

    #[error("No JSON found in model response")]
    NoStructuredContent,

    #[error("Malformed JSON in model response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    pub fn network(reason: impl Into<String>) -> Self {
        AnalysisError::Network {
            status: None,
            reason: reason.into(),
        }
    }

    /// Stable tag for the error kind, used in JSON output and progress events.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::NoSelection => ErrorKind::NoSelection,
            AnalysisError::Extraction { .. } => ErrorKind::Extraction,
            AnalysisError::InvalidCredential => ErrorKind::InvalidCredential,
            AnalysisError::Network { .. } => ErrorKind::Network,
            AnalysisError::NoStructuredContent => ErrorKind::NoStructuredContent,
            AnalysisError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            AnalysisError::Config(_) => ErrorKind::Config,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NoSelection,
    Extraction,
    InvalidCredential,
    Network,
    NoStructuredContent,
    MalformedResponse,
    Config,
}

/// Serializable form of an [`AnalysisError`] for display surfaces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AnalysisError> for ErrorReport {
    fn from(err: &AnalysisError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
