#![forbid(unsafe_code)]

//! Binding configuration.
//!
//! Configuration is a plain TOML table. Every key is optional; missing keys
//! take the defaults shown below. Unknown keys are rejected so typos surface
//! at load time.
//!
//! ```toml
//! reset_on_rebind = true
//! replay_on_subscribe = true
//! trace_payloads = false
//! ```
//!
//! Environment variables override file values when
//! [`NodeStateConfig::with_env_overrides`] is applied:
//!
//! | Variable                        | Field                 |
//! |---------------------------------|-----------------------|
//! | `NODESTATE_RESET_ON_REBIND`     | `reset_on_rebind`     |
//! | `NODESTATE_REPLAY_ON_SUBSCRIBE` | `replay_on_subscribe` |
//! | `NODESTATE_TRACE_PAYLOADS`      | `trace_payloads`      |

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NodeStateError, Result};

pub const ENV_RESET_ON_REBIND: &str = "NODESTATE_RESET_ON_REBIND";
pub const ENV_REPLAY_ON_SUBSCRIBE: &str = "NODESTATE_REPLAY_ON_SUBSCRIBE";
pub const ENV_TRACE_PAYLOADS: &str = "NODESTATE_TRACE_PAYLOADS";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeStateConfig {
    /// Clear the bound store when the binding moves to a different node id,
    /// so fields of the previous node never show up under the new one.
    pub reset_on_rebind: bool,
    /// Deliver a node's committed fields to a listener as soon as it
    /// registers. Honored by the in-memory graph client.
    pub replay_on_subscribe: bool,
    /// Log full payload bodies at trace level. Off by default since payloads
    /// may carry user data.
    pub trace_payloads: bool,
}

impl Default for NodeStateConfig {
    fn default() -> Self {
        Self {
            reset_on_rebind: true,
            replay_on_subscribe: true,
            trace_payloads: false,
        }
    }
}

impl NodeStateConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`NodeStateError::Config`] on malformed TOML or unknown keys.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        toml::from_str(src).map_err(|e| NodeStateError::config(e.to_string()))
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// I/O failures and parse failures.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&src)?;
        tracing::debug!(message = "config.loaded", path = %path.display());
        Ok(config)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`NodeStateError::Config`] when a variable is set to something
    /// other than a recognized boolean.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(ENV_RESET_ON_REBIND) {
            self.reset_on_rebind = parse_bool(ENV_RESET_ON_REBIND, &raw)?;
        }
        if let Some(raw) = lookup(ENV_REPLAY_ON_SUBSCRIBE) {
            self.replay_on_subscribe = parse_bool(ENV_REPLAY_ON_SUBSCRIBE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TRACE_PAYLOADS) {
            self.trace_payloads = parse_bool(ENV_TRACE_PAYLOADS, &raw)?;
        }
        Ok(self)
    }

    /// Serialize back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`NodeStateError::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| NodeStateError::config(e.to_string()))
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(NodeStateError::config(format!(
            "{key}: expected a boolean, got {other:?}"
        ))),
    }
}
