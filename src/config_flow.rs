use crate::channel::validate_host;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Config key holding the device address
pub const CONF_HOST: &str = "host";

/// Stored configuration for one PlantCare device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: Uuid,
    pub version: u32,
    pub title: String,

    /// Deduplication key, the configured host
    pub unique_id: String,

    pub data: EntryData,
}

/// Data collected by the user step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    pub host: String,
}

impl ConfigEntry {
    pub fn host(&self) -> &str {
        &self.data.host
    }
}

/// Input submitted on the user form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInput {
    pub host: String,
}

/// Outcome of a flow step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowResult {
    ShowForm {
        step_id: &'static str,
        fields: Vec<&'static str>,
        /// Field name to error key
        errors: BTreeMap<&'static str, &'static str>,
    },
    Abort {
        reason: &'static str,
    },
    CreateEntry(ConfigEntry),
}

/// Config flow turning a user-supplied host into a [`ConfigEntry`]
///
/// Tracks the unique ids it has created so the same host cannot be added twice.
#[derive(Debug, Default)]
pub struct ConfigFlow {
    configured: BTreeSet<String>,
}

impl ConfigFlow {
    pub const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the flow with entries restored by the host
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = &'a ConfigEntry>) -> Self {
        Self {
            configured: entries.into_iter().map(|e| e.unique_id.clone()).collect(),
        }
    }

    pub fn is_configured(&self, host: &str) -> bool {
        self.configured.contains(host)
    }

    /// Forget an entry so its host can be configured again
    pub fn remove(&mut self, entry: &ConfigEntry) -> bool {
        self.configured.remove(&entry.unique_id)
    }

    /// The single user step: show the form, or validate and create an entry
    pub fn step_user(&mut self, user_input: Option<UserInput>) -> FlowResult {
        let Some(input) = user_input else {
            return Self::form(BTreeMap::new());
        };

        let host = input.host.trim().to_string();
        if let Err(e) = validate_host(&host) {
            tracing::debug!("Rejected host {:?}: {}", input.host, e);
            let mut errors = BTreeMap::new();
            errors.insert(CONF_HOST, "invalid_host");
            return Self::form(errors);
        }

        if !self.configured.insert(host.clone()) {
            tracing::info!("PlantCare {} is already configured", host);
            return FlowResult::Abort {
                reason: "already_configured",
            };
        }

        tracing::info!("Creating config entry for PlantCare {}", host);
        FlowResult::CreateEntry(ConfigEntry {
            entry_id: Uuid::new_v4(),
            version: Self::VERSION,
            title: format!("PlantCare {}", host),
            unique_id: host.clone(),
            data: EntryData { host },
        })
    }

    fn form(errors: BTreeMap<&'static str, &'static str>) -> FlowResult {
        FlowResult::ShowForm {
            step_id: "user",
            fields: vec![CONF_HOST],
            errors,
        }
    }
}
