//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate to prevent accidental logging of sensitive values.
//! Tokens pasted through shells and dashboards often arrive with stray
//! whitespace or a leading `y\n` from an interactive prompt; they are
//! sanitized before use.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

use crate::error::{SecurityError, SecurityResult};

/// A secret string that won't be logged or displayed.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    /// Create a new secret string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(Box::from(value.into().as_str())))
    }

    /// Expose the secret value for use.
    ///
    /// Only call this when actually using the secret (e.g., in an API request).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Clean a raw token: drop a leading `y\n`, then every whitespace character.
pub fn sanitize_token(raw: &str) -> String {
    raw.strip_prefix("y\n")
        .unwrap_or(raw)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Sanitize a token and reject it if nothing is left.
pub fn validated_token(raw: &str) -> SecurityResult<SecretString> {
    let token = sanitize_token(raw);
    if token.is_empty() {
        return Err(SecurityError::EmptyCredential);
    }
    Ok(SecretString::new(token))
}

/// Configuration for an AI service with secure credential handling.
#[derive(Clone)]
pub struct AICredentials {
    /// API key (secret, sanitized)
    pub api_key: SecretString,

    /// Model identifier
    pub model: String,

    /// API base URL (optional)
    pub base_url: Option<String>,
}

impl AICredentials {
    /// Create credentials from a raw token.
    ///
    /// The token is sanitized; an empty result is rejected.
    pub fn new(api_key: &str, model: impl Into<String>) -> SecurityResult<Self> {
        Ok(Self {
            api_key: validated_token(api_key)?,
            model: model.into(),
            base_url: None,
        })
    }

    /// Read the token from an environment variable.
    pub fn from_env_var(var: &str, model: impl Into<String>) -> SecurityResult<Self> {
        let raw =
            std::env::var(var).map_err(|_| SecurityError::MissingCredential(var.to_string()))?;
        Self::new(&raw, model)
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

impl fmt::Debug for AICredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AICredentials")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_not_in_debug_or_display() {
        let secret = SecretString::new("sk-super-secret-key");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "sk-super-secret-key");
    }

    #[test]
    fn test_sanitize_token() {
        assert_eq!(sanitize_token("y\nsk-abc\n"), "sk-abc");
        assert_eq!(sanitize_token(" sk-a b\tc\r\n"), "sk-abc");
        // Only a leading prompt answer is stripped.
        assert_eq!(sanitize_token("sk-y\nabc"), "sk-yabc");
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            validated_token("y\n  \n"),
            Err(SecurityError::EmptyCredential)
        ));
        assert!(AICredentials::new("", "gpt-4o").is_err());
    }

    #[test]
    fn test_ai_credentials_debug() {
        let creds = AICredentials::new("sk-secret", "gpt-4o").unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("gpt-4o"));
    }
}
