use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Rule '{name}' failed validation: {}", .errors.join("; "))]
    Invalid { name: String, errors: Vec<String> },

    #[error("No rule with id {0}")]
    NotFound(String),

    #[error("Rule import failed: {0}")]
    Import(String),

    #[error("Rule export failed: {0}")]
    Export(#[from] serde_json::Error),
}

impl From<tally_core::CoreError> for RuleError {
    fn from(e: tally_core::CoreError) -> Self {
        match e {
            tally_core::CoreError::InvalidRule { name, errors } => {
                RuleError::Invalid { name, errors }
            }
            other => RuleError::Import(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
