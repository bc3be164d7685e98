//! Credential resolution for the bucket and the cluster API.
//!
//! A credential can be written inline in the config file, read from a file
//! (mounted secrets, `~/.kube/token`-style files) or taken from an
//! environment variable. The first non-empty source wins, in that order.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No credential source configured for {0}")]
    NoSourceProvided(String),

    #[error("Failed to read credential file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Where a single credential comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
}

impl SecretSource {
    pub fn inline(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn from_env(name: impl Into<String>) -> Self {
        Self {
            env_var: Some(name.into()),
            ..Self::default()
        }
    }

    /// True when at least one non-empty source is set.
    pub fn is_configured(&self) -> bool {
        [&self.value, &self.file, &self.env_var]
            .iter()
            .any(|s| s.as_deref().is_some_and(|v| !v.is_empty()))
    }

    /// Resolves the credential; `what` names it in the error message.
    pub fn resolve(&self, what: &str) -> Result<SecretString> {
        resolve_secret(
            self.value.as_deref(),
            self.file.as_deref(),
            self.env_var.as_deref(),
        )
        .map_err(|e| match e {
            SecretError::NoSourceProvided(_) => SecretError::NoSourceProvided(what.to_string()),
            other => other,
        })
    }

    /// Like [`resolve`](Self::resolve) but an unconfigured source is `None`.
    pub fn resolve_optional(&self) -> Result<Option<SecretString>> {
        if !self.is_configured() {
            return Ok(None);
        }
        self.resolve("optional credential").map(Some)
    }
}

/// Resolves a credential from the first configured source, in this order:
/// 1. Inline value (if non-empty)
/// 2. File contents, trimmed (a leading `~` is expanded)
/// 3. Environment variable, trimmed
///
/// # Arguments
///
/// * `direct` - Optional inline value
/// * `file_path` - Optional path to a file holding the credential
/// * `env_var` - Optional name of an environment variable holding it
///
/// # Returns
///
/// The credential as a `SecretString`. A source that is set but unreadable
/// is an error; later sources are not consulted.
///
/// # Examples
///
/// ```ignore
/// use devsync::secrets::resolve_secret;
///
/// // MinIO root user from the environment
/// let access_key = resolve_secret(None, None, Some("MINIO_ROOT_USER"))?;
///
/// // Mounted secret file wins over the env var
/// let secret_key = resolve_secret(
///     None,
///     Some("~/.minio/secret"),
///     Some("MINIO_ROOT_PASSWORD"),
/// )?;
/// ```
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        return fs::read_to_string(&expanded)
            .map(|content| SecretString::from(content.trim().to_string()))
            .map_err(|source| SecretError::FileReadError {
                path: expanded,
                source,
            });
    }

    if let Some(name) = env_var.filter(|n| !n.is_empty()) {
        return match std::env::var(name) {
            Ok(value) => Ok(SecretString::from(value.trim())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided("credential".to_string()))
}

/// Expands a leading `~` to the home directory. `~user` is not supported.
fn expand_home(path: &str) -> String {
    if path != "~" && !path.starts_with("~/") {
        return path.to_string();
    }
    match std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        Some(home) => path.replacen('~', &home.to_string_lossy(), 1),
        None => path.to_string(),
    }
}
