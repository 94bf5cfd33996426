//! Credential handling.

pub mod credentials;

pub use credentials::{sanitize_token, validated_token, AICredentials, SecretString};
