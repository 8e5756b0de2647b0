//! Postal address captured during checkout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Address validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address field `{0}` is required")]
    MissingField(&'static str),
}

/// A delivery or billing address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub pincode: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "IN".to_string()
}

impl Address {
    /// Check that the fields needed for delivery are present.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::MissingField` for the first blank required field.
    pub fn validate(&self) -> Result<(), AddressError> {
        if self.line1.trim().is_empty() {
            return Err(AddressError::MissingField("line1"));
        }
        if self.city.trim().is_empty() {
            return Err(AddressError::MissingField("city"));
        }
        if self.pincode.trim().is_empty() {
            return Err(AddressError::MissingField("pincode"));
        }
        Ok(())
    }
}
