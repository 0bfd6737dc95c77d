use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("No Anthropic API key configured; run: tally auth paste-anthropic-key")]
    MissingApiKey,

    #[error(
        "No categorized transactions to learn rules from; \
         categorize at least one transaction first"
    )]
    NoCategorizedData,

    #[error(
        "Invalid response format from AI during {operation}: {reason}. \
         Response preview: {preview}"
    )]
    InvalidAiResponse {
        operation: &'static str,
        reason: String,
        preview: String,
    },

    #[error("{operation} failed: API returned {status}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AiError>;
