use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Registry
    #[error("duplicate extension registration: {name}")]
    DuplicateExtension { name: String },

    #[error("unknown extension '{name}' (available: {available})")]
    UnknownExtension { name: String, available: String },
}
