use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid exclude pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Git error: {0}")]
    Git(String),

    /// The git layer could not produce a diff for the request. Callers decide
    /// whether to fall back to a full run; this is never an empty change set.
    #[error("Diff unavailable for {request}: {reason}")]
    DiffUnavailable { request: String, reason: String },

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl AtlasError {
    pub fn diff_unavailable(request: impl Into<String>, reason: impl Into<String>) -> Self {
        AtlasError::DiffUnavailable {
            request: request.into(),
            reason: reason.into(),
        }
    }

    pub fn is_diff_unavailable(&self) -> bool {
        matches!(self, AtlasError::DiffUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
