/// Failure modes of a recommendation request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecommendationError {
    #[error("ranking service unreachable: {0}")]
    Network(String),
    #[error("ranking service responded with status {status}: {message}")]
    Service { status: u16, message: String },
    #[error("ranking service returned an unexpected payload: {0}")]
    Schema(String),
    #[error("a recommendation request for this session is already in progress")]
    InFlight,
}

impl RecommendationError {
    /// Whether the respondent can retry the same submission later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::InFlight => true,
            Self::Service { status, .. } => *status >= 500,
            Self::Schema(_) => false,
        }
    }
}
