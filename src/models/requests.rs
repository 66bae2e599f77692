//! Request DTOs for the HTTP API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Longest accepted custom short key
pub const MAX_SHORT_KEY_LENGTH: usize = 64;

/// Request body for POST /short
///
/// # Fields
/// - `longUrl`: the URL the short link redirects to
/// - `shortKey`: optional custom key; a random one is generated when absent
#[derive(Debug, Clone, Deserialize)]
pub struct ShortenRequest {
    #[serde(rename = "longUrl")]
    pub long_url: String,
    #[serde(rename = "shortKey", default)]
    pub short_key: Option<String>,
}

impl ShortenRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.long_url.trim().is_empty() {
            return Some("longUrl cannot be empty".to_string());
        }
        if let Some(key) = self.custom_key() {
            if key.len() > MAX_SHORT_KEY_LENGTH {
                return Some(format!(
                    "shortKey exceeds maximum length of {} characters",
                    MAX_SHORT_KEY_LENGTH
                ));
            }
            if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return Some("shortKey may only contain letters, digits, '-' and '_'".to_string());
            }
        }
        None
    }

    /// The requested key, treating an empty string as "generate one".
    pub fn custom_key(&self) -> Option<&str> {
        self.short_key.as_deref().filter(|k| !k.is_empty())
    }
}
