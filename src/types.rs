use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Index of a power resource on the device (`/power/{index}`)
pub type ChannelIndex = u32;

/// Raw power level as reported by the device, 0..=255 by convention
pub type PowerLevel = i64;

/// Conventional maximum power level
pub const MAX_POWER: PowerLevel = 255;

/// Integration domain, used as the unique id prefix
pub const DOMAIN: &str = "plant_care";

/// Role of a power channel on the appliance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    Light,
    WaterPump,
}

impl ChannelRole {
    /// Channel index the firmware uses for this role
    pub fn index(self) -> ChannelIndex {
        match self {
            ChannelRole::Light => 0,
            ChannelRole::WaterPump => 1,
        }
    }

    /// Suffix appended to the device's base unique id
    pub fn unique_id_suffix(self) -> &'static str {
        match self {
            ChannelRole::Light => "light",
            ChannelRole::WaterPump => "water_pump",
        }
    }
}

/// Base unique id for every entity of one device: `plant_care.{host}` with dots
/// replaced by underscores
pub fn base_unique_id(host: &str) -> String {
    format!("{}.{}", DOMAIN, host.replace('.', "_"))
}

/// Derived on/off state of a power level
pub fn is_on(power: PowerLevel) -> bool {
    power != 0
}

/// Device registry information shared by all entities of one appliance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// `(namespace, id)` pairs identifying the device
    pub identifiers: BTreeSet<(String, String)>,

    /// Display name, `PlantCare [{host}]`
    pub name: String,
}

impl DeviceInfo {
    pub fn for_host(host: &str) -> Self {
        let mut identifiers = BTreeSet::new();
        identifiers.insert(("id".to_string(), base_unique_id(host)));
        Self {
            identifiers,
            name: format!("PlantCare [{}]", host),
        }
    }
}
