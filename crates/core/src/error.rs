use serde::Serialize;
use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Control group missing: {0}")]
    ControlGroupMissing(String),

    #[error("No champion concepts in the waiting line")]
    QueueEmpty,

    #[error("Invalid campaign: {0}")]
    InvalidCampaign(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Stable, transport-independent error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    ControlGroupMissing,
    QueueEmpty,
    InvalidCampaign,
    Validation,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::ControlGroupMissing => "control_group_missing",
            ErrorKind::QueueEmpty => "queue_empty",
            ErrorKind::InvalidCampaign => "invalid_campaign",
            ErrorKind::Validation => "validation",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CampaignError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CampaignError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CampaignError::NotFound { .. } => ErrorKind::NotFound,
            CampaignError::InvalidState(_) => ErrorKind::InvalidState,
            CampaignError::ControlGroupMissing(_) => ErrorKind::ControlGroupMissing,
            CampaignError::QueueEmpty => ErrorKind::QueueEmpty,
            CampaignError::InvalidCampaign(_) => ErrorKind::InvalidCampaign,
            CampaignError::Validation(_) => ErrorKind::Validation,
            CampaignError::Config(_) => ErrorKind::Config,
            CampaignError::Serialization(_) | CampaignError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_entity() {
        let err = CampaignError::not_found("Campaign", "regular_campaign_c");
        assert_eq!(err.to_string(), "Campaign 'regular_campaign_c' not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_kind_codes_are_snake_case() {
        assert_eq!(CampaignError::QueueEmpty.kind().as_str(), "queue_empty");
        assert_eq!(
            CampaignError::ControlGroupMissing("x".into()).kind().to_string(),
            "control_group_missing"
        );
        let json = serde_json::to_string(&ErrorKind::InvalidCampaign).unwrap();
        assert_eq!(json, "\"invalid_campaign\"");
    }
}
