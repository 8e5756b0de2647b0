//! Wire-level error taxonomy.
//!
//! Every failure a tool can report is a [`ToolError`] carrying one
//! [`ErrorCode`]. Layer-specific errors (`ProviderError`, `RepositoryError`,
//! checkout rule violations) convert into it at the service boundary.

use bazaar_core::{AddressError, CheckoutRuleError, ProviderId};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::providers::ProviderError;
use crate::registry::RegistryError;

/// Error category reported in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or out-of-range input.
    ValidationError,
    /// A provider is disabled, missing, or lacks the capability for the call.
    ProviderError,
    NotFound,
    Timeout,
    /// Produced upstream of the gateway; listed so clients share one taxonomy.
    RateLimit,
    InternalError,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::RateLimit => "RATE_LIMIT",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body of a failed tool response.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{code}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
}

impl ToolError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            provider: None,
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Validation failure pinned to one input field.
    #[must_use]
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::validation(message).with_details(serde_json::json!({ "field": field }))
    }

    #[must_use]
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderError, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Attribute a provider failure to the provider that raised it.
    #[must_use]
    pub fn from_provider(provider: &ProviderId, err: ProviderError) -> Self {
        Self::from(err).with_provider(provider.clone())
    }
}

impl From<ProviderError> for ToolError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unsupported { .. } => Self::provider(err.to_string()),
            ProviderError::NotFound(_) => Self::not_found(err.to_string()),
            ProviderError::Timeout(_) => Self::new(ErrorCode::Timeout, err.to_string()),
            ProviderError::InvalidInput(_) => Self::validation(err.to_string()),
            ProviderError::Http(_) | ProviderError::InvalidPayload(_) | ProviderError::Upstream(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<RepositoryError> for ToolError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::not_found("Record not found"),
            RepositoryError::Conflict(message) => Self::validation(message)
                .with_details(serde_json::json!({ "reason": "version_conflict" })),
            RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<RegistryError> for ToolError {
    fn from(err: RegistryError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<CheckoutRuleError> for ToolError {
    fn from(err: CheckoutRuleError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<AddressError> for ToolError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::MissingField(field) => Self::invalid_field(field, err.to_string()),
        }
    }
}
