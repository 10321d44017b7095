//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Services never read environment variables themselves; the binary
//! resolves flags, `.env` and process environment into a [`BridgeConfig`] before any request is
//! made.

use crate::constants::{ACCESS_TOKEN_FILENAME, PATIENT_REF_FILENAME};
use crate::{BridgeError, BridgeResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    source_base_url: String,
    destination_base_url: String,
    terminology_base_url: String,
    data_dir: PathBuf,
}

impl BridgeConfig {
    /// Create a new `BridgeConfig`.
    ///
    /// Base URLs are normalised by trimming any trailing `/`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidInput`] if any base URL is empty or does not use the
    /// `http` or `https` scheme.
    pub fn new(
        source_base_url: &str,
        destination_base_url: &str,
        terminology_base_url: &str,
        data_dir: PathBuf,
    ) -> BridgeResult<Self> {
        Ok(Self {
            source_base_url: normalise_base_url("source", source_base_url)?,
            destination_base_url: normalise_base_url("destination", destination_base_url)?,
            terminology_base_url: normalise_base_url("terminology", terminology_base_url)?,
            data_dir,
        })
    }

    pub fn source_base_url(&self) -> &str {
        &self.source_base_url
    }

    pub fn destination_base_url(&self) -> &str {
        &self.destination_base_url
    }

    pub fn terminology_base_url(&self) -> &str {
        &self.terminology_base_url
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Location of the `{"access_token": ...}` file.
    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join(ACCESS_TOKEN_FILENAME)
    }

    /// Location of the destination patient id relay file.
    pub fn patient_ref_path(&self) -> PathBuf {
        self.data_dir.join(PATIENT_REF_FILENAME)
    }
}

/// Resolve a base URL from an optional configured value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn base_url_from_value(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn normalise_base_url(which: &str, raw: &str) -> BridgeResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(BridgeError::InvalidInput(format!(
            "{which} base URL cannot be empty"
        )));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(BridgeError::InvalidInput(format!(
            "{which} base URL must start with http:// or https:// (got '{trimmed}')"
        )));
    }
    Ok(trimmed.to_string())
}
