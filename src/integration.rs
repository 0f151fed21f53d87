use crate::channel::{http_client, PowerChannel};
use crate::config_flow::ConfigEntry;
use crate::entity::{Entity, PlantLight, WaterPumpLevel, WaterPumpSwitch};
use crate::error::{PlantCareError, Result};
use crate::types::ChannelRole;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Entity platforms a config entry is forwarded to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Light,
    Switch,
}

pub const PLATFORMS: [Platform; 2] = [Platform::Light, Platform::Switch];

/// Entities created for one configured appliance
#[derive(Clone)]
pub struct PlantCareDevice {
    pub entry_id: Uuid,
    pub host: String,
    pub light: Arc<PlantLight>,
    pub pump: Arc<WaterPumpSwitch>,

    /// Slider view of the pump, not forwarded to any platform by default
    pub pump_level: Arc<WaterPumpLevel>,
}

impl PlantCareDevice {
    /// Entities registered on `platform`
    pub fn platform_entities(&self, platform: Platform) -> Vec<Arc<dyn Entity>> {
        match platform {
            Platform::Light => vec![self.light.clone() as Arc<dyn Entity>],
            Platform::Switch => vec![self.pump.clone() as Arc<dyn Entity>],
        }
    }

    /// Entities of every forwarded platform
    pub fn entities(&self) -> Vec<Arc<dyn Entity>> {
        PLATFORMS
            .iter()
            .flat_map(|p| self.platform_entities(*p))
            .collect()
    }
}

/// Set up and tear down PlantCare appliances from their config entries
///
/// # Example
///
/// ```no_run
/// use plant_care::{ConfigFlow, FlowResult, PlantCareIntegration, SwitchEntity, UserInput};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut flow = ConfigFlow::new();
///     let FlowResult::CreateEntry(entry) = flow.step_user(Some(UserInput {
///         host: "192.168.1.50".to_string(),
///     })) else {
///         return Ok(());
///     };
///
///     let mut integration = PlantCareIntegration::new();
///     let device = integration.setup_entry(&entry)?;
///     device.pump.turn_on()?;
///     Ok(())
/// }
/// ```
#[derive(Default)]
pub struct PlantCareIntegration {
    devices: BTreeMap<Uuid, PlantCareDevice>,
}

impl PlantCareIntegration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the channels and entities for `entry`
    ///
    /// Both channels share one HTTP client. No request is sent.
    pub fn setup_entry(&mut self, entry: &ConfigEntry) -> Result<PlantCareDevice> {
        if self.devices.contains_key(&entry.entry_id) {
            return Err(PlantCareError::InvalidRequest(format!(
                "entry {} is already set up",
                entry.entry_id
            )));
        }

        let host = entry.host();
        let http = http_client()?;
        let light_channel = Arc::new(PowerChannel::with_client(
            http.clone(),
            host,
            ChannelRole::Light.index(),
        )?);
        let pump_channel = Arc::new(PowerChannel::with_client(
            http,
            host,
            ChannelRole::WaterPump.index(),
        )?);

        let device = PlantCareDevice {
            entry_id: entry.entry_id,
            host: host.to_string(),
            light: Arc::new(PlantLight::new(light_channel)),
            pump: Arc::new(WaterPumpSwitch::new(pump_channel.clone())),
            pump_level: Arc::new(WaterPumpLevel::new(pump_channel)),
        };

        for platform in PLATFORMS {
            for entity in device.platform_entities(platform) {
                tracing::info!("{:?} entity {} created for {}", platform, entity.unique_id(), host);
            }
        }

        self.devices.insert(entry.entry_id, device.clone());
        Ok(device)
    }

    /// Drop the device created for `entry_id`
    ///
    /// Returns `false` if the entry was not set up.
    pub fn unload_entry(&mut self, entry_id: Uuid) -> bool {
        match self.devices.remove(&entry_id) {
            Some(device) => {
                tracing::info!("Unloaded PlantCare {}", device.host);
                true
            }
            None => false,
        }
    }

    pub fn device(&self, entry_id: Uuid) -> Option<&PlantCareDevice> {
        self.devices.get(&entry_id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &PlantCareDevice> {
        self.devices.values()
    }
}
