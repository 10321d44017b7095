//! Bearer token for the source EHR server.
//!
//! The token is obtained outside this toolkit and dropped into the data directory as
//! `access_token.json`:
//!
//! ```json
//! {"access_token": "eyJ0eXAiOiJKV1Qi..."}
//! ```
//!
//! There is no refresh or expiry handling. When the file is missing or unreadable the
//! source calls go out without an `Authorization` header and the server's rejection is
//! reported like any other failed request.

use crate::config::BridgeConfig;
use crate::{BridgeError, BridgeResult};
use carebridge_types::NonEmptyText;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// An opaque bearer token. `Debug` output never includes the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(NonEmptyText);

impl AccessToken {
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidInput`] for a blank token.
    pub fn new(raw: impl AsRef<str>) -> BridgeResult<Self> {
        NonEmptyText::new(raw)
            .map(Self)
            .map_err(|_| BridgeError::InvalidInput("access token cannot be empty".into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Deserialize)]
struct TokenFile {
    #[serde(default)]
    access_token: Option<String>,
}

/// Reads the bearer token from the data directory.
#[derive(Clone, Debug)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn from_config(cfg: &BridgeConfig) -> Self {
        Self::new(cfg.credentials_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the `access_token` field from the token file.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::CredentialMissing`] if the file does not exist
    /// - [`BridgeError::CredentialUnparseable`] if it is not JSON, lacks `access_token`,
    ///   or the token is blank
    /// - [`BridgeError::StorageIo`] for any other read failure
    pub fn load_token(&self) -> BridgeResult<AccessToken> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BridgeError::CredentialMissing {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(BridgeError::StorageIo {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let unparseable = |reason: String| BridgeError::CredentialUnparseable {
            path: self.path.clone(),
            reason,
        };

        let file: TokenFile =
            serde_json::from_str(&contents).map_err(|e| unparseable(e.to_string()))?;
        let raw = file
            .access_token
            .ok_or_else(|| unparseable("missing field `access_token`".into()))?;
        let token = NonEmptyText::new(raw).map_err(|e| unparseable(e.to_string()))?;

        Ok(AccessToken(token))
    }

    /// Like [`load_token`](Self::load_token), but logs the failure and carries on
    /// without a credential.
    pub fn load_token_or_warn(&self) -> Option<AccessToken> {
        match self.load_token() {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!("continuing without source credential: {e}");
                None
            }
        }
    }
}
