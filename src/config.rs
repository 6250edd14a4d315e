//! Inbox configuration.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default refresh interval in seconds (5 minutes).
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// Longest accepted refresh interval (one day).
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 86_400;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest accepted request timeout.
pub const MAX_TIMEOUT_SECS: u64 = 600;

/// Sender whose messages get the billing ("recharge") action.
pub const DEFAULT_BILLING_SENDER: &str = "Debt-System";

/// Installed-app key of the cost center application.
pub const DEFAULT_BILLING_APP_KEY: &str = "system-costcenter";

/// Inbox engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    /// Base URL of the desktop API (e.g., `https://cloud.example.com`).
    pub base_url: String,

    /// Value of the `Authorization` header, if the API requires one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,

    /// Refresh interval in seconds.
    pub interval_secs: u64,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Initial locale (language code).
    pub locale: String,

    /// Sender name that classifies a message as billing-related.
    pub billing_sender: String,

    /// App key opened by the billing action.
    pub billing_app_key: String,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            authorization: None,
            interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            locale: "en".to_string(),
            billing_sender: DEFAULT_BILLING_SENDER.to_string(),
            billing_app_key: DEFAULT_BILLING_APP_KEY.to_string(),
        }
    }
}

impl InboxConfig {
    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| AppError::config(format!("Invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the engine cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.interval_secs == 0 || self.interval_secs > MAX_REFRESH_INTERVAL_SECS {
            return Err(AppError::invalid_input_field(
                format!(
                    "Refresh interval must be between 1 and {} seconds",
                    MAX_REFRESH_INTERVAL_SECS
                ),
                "interval_secs",
            ));
        }
        if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(AppError::invalid_input_field(
                format!("Timeout must be between 1 and {} seconds", MAX_TIMEOUT_SECS),
                "timeout_secs",
            ));
        }
        if self.locale.trim().is_empty() {
            return Err(AppError::invalid_input_field("Locale is empty", "locale"));
        }
        Ok(())
    }
}
