use serde::{Deserialize, Serialize};

/// Input handed to the next-action oracle: the deal's stage plus flattened
/// summaries of the contact history and the deal itself.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionRequest {
    pub stage: String,
    #[serde(rename = "contactHistory")]
    pub contact_history: String,
    #[serde(rename = "dealDetails")]
    pub deal_details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionResponse {
    #[serde(rename = "nextAction")]
    pub next_action: String,
    pub timing: String,
}

#[derive(Debug)]
pub enum OracleError {
    Unavailable(String),
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleError::Unavailable(reason) => write!(f, "suggestion oracle unavailable: {}", reason),
        }
    }
}

impl std::error::Error for OracleError {}

/// External text-generation collaborator. Failures degrade to an error the
/// caller surfaces as a banner; they never block the rest of the view.
#[async_trait::async_trait]
pub trait SuggestionOracle: Send + Sync {
    async fn suggest(&self, request: SuggestionRequest) -> Result<SuggestionResponse, OracleError>;
}

/// Stand-in used when no oracle endpoint is configured.
#[derive(Debug, Default)]
pub struct DisabledOracle;

#[async_trait::async_trait]
impl SuggestionOracle for DisabledOracle {
    async fn suggest(&self, _request: SuggestionRequest) -> Result<SuggestionResponse, OracleError> {
        Err(OracleError::Unavailable("no endpoint configured".into()))
    }
}
