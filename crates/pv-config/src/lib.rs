//! Provider configuration: the user's pre-finalization selections and the
//! committed, capability-checked active configuration.
//!
//! Readers get immutable `Arc<ProviderConfig>` snapshots; only
//! [`ConfigStore::finalize`] replaces the active configuration, and the
//! replacement is wholesale, never a field-by-field merge.

use pv_api_types::{Network, ProviderCapabilities};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_WAB_URL: &str = "https://wab.palmvault.app";
pub const DEFAULT_STORAGE_URL: &str = "https://storage.palmvault.app";
pub const DEFAULT_NETWORK: Network = Network::Main;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("provider capabilities missing or empty")]
    InvalidCapabilities,
    #[error("auth method {0:?} is not offered by the provider")]
    UnsupportedMethod(String),
}

/// The user's provider choices before any capability fetch has happened.
///
/// Replaced wholesale when the user reconfigures providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSelection {
    pub wab_url: String,
    pub method: Option<String>,
    pub network: Network,
    pub storage_url: String,
}

impl Default for ProviderSelection {
    fn default() -> Self {
        Self {
            wab_url: DEFAULT_WAB_URL.to_owned(),
            method: None,
            network: DEFAULT_NETWORK,
            storage_url: DEFAULT_STORAGE_URL.to_owned(),
        }
    }
}

impl ProviderSelection {
    /// Merge fetched capabilities into this selection, producing the
    /// candidate handed to [`ConfigStore::finalize`].
    pub fn with_capabilities(self, wab_info: Option<ProviderCapabilities>) -> ConfigCandidate {
        ConfigCandidate {
            wab_url: self.wab_url,
            wab_info,
            method: self.method,
            network: self.network,
            storage_url: self.storage_url,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigCandidate {
    pub wab_url: String,
    pub wab_info: Option<ProviderCapabilities>,
    pub method: Option<String>,
    pub network: Network,
    pub storage_url: String,
}

/// A finalized provider configuration.
///
/// `wab_info` and `method` are non-optional: an unfinalized configuration is
/// unrepresentable, and `method` is always a member of
/// `wab_info.supported_auth_methods`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub wab_url: String,
    pub wab_info: ProviderCapabilities,
    pub method: String,
    pub network: Network,
    pub storage_url: String,
}

/// Process-wide configuration store, injected at composition time.
pub struct ConfigStore {
    selection: RwLock<ProviderSelection>,
    active: RwLock<Option<Arc<ProviderConfig>>>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(ProviderSelection::default())
    }
}

impl ConfigStore {
    pub fn new(selection: ProviderSelection) -> Self {
        Self {
            selection: RwLock::new(selection),
            active: RwLock::new(None),
        }
    }

    pub fn selection(&self) -> ProviderSelection {
        read_guard(&self.selection).clone()
    }

    /// Replace the pre-finalization selection wholesale. The active
    /// configuration, if any, stays committed until the next `finalize`.
    pub fn reconfigure(&self, selection: ProviderSelection) {
        info!(wab_url = %selection.wab_url, network = %selection.network, "provider selection replaced");
        *write_guard(&self.selection) = selection;
    }

    pub fn active(&self) -> Option<Arc<ProviderConfig>> {
        read_guard(&self.active).clone()
    }

    /// Validate a candidate against its fetched capabilities and commit it
    /// as the active configuration.
    ///
    /// The commit is a total replacement under one write lock. In-flight
    /// operations that captured the previous `Arc` keep operating against
    /// their captured value. On error nothing is committed.
    pub fn finalize(&self, candidate: ConfigCandidate) -> Result<Arc<ProviderConfig>, ConfigError> {
        let wab_info = candidate.wab_info.ok_or(ConfigError::InvalidCapabilities)?;
        if wab_info.supported_auth_methods.is_empty() {
            return Err(ConfigError::InvalidCapabilities);
        }

        let method = match candidate.method {
            Some(requested) => {
                if !wab_info.supports(&requested) {
                    return Err(ConfigError::UnsupportedMethod(requested));
                }
                requested
            }
            None => wab_info
                .first_method()
                .ok_or(ConfigError::InvalidCapabilities)?
                .to_owned(),
        };

        let config = Arc::new(ProviderConfig {
            wab_url: candidate.wab_url,
            wab_info,
            method,
            network: candidate.network,
            storage_url: candidate.storage_url,
        });

        *write_guard(&self.active) = Some(Arc::clone(&config));
        info!(wab_url = %config.wab_url, method = %config.method, "provider configuration committed");

        Ok(config)
    }
}

fn read_guard<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
