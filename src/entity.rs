use crate::channel::PowerChannel;
use crate::error::{PlantCareError, Result};
use crate::types::{base_unique_id, is_on, ChannelRole, DeviceInfo, PowerLevel, MAX_POWER};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Snapshot of an entity's cached state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityState {
    pub unique_id: String,

    /// Last power level acknowledged by the device, `None` until the first
    /// successful call
    pub power: Option<PowerLevel>,

    pub is_on: Option<bool>,
}

/// Color modes a light can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Brightness,
}

/// Presentation mode of a number entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberMode {
    Slider,
}

/// Behavior shared by every entity the integration registers
///
/// All methods that touch the device block the calling thread for one HTTP
/// exchange. Async callers should go through [`crate::Poller`] or offload
/// the call themselves.
pub trait Entity: Send + Sync {
    /// Stable registry key
    fn unique_id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    fn device_info(&self) -> &DeviceInfo;

    fn icon(&self) -> Option<&'static str> {
        None
    }

    /// Refresh the cache from the device
    fn update(&self) -> Result<EntityState>;

    /// Cached state, no I/O
    fn state(&self) -> EntityState;
}

/// Light capability: on/off plus brightness
pub trait LightEntity: Entity {
    fn color_mode(&self) -> ColorMode {
        ColorMode::Brightness
    }

    fn brightness(&self) -> Option<u8>;

    fn is_on(&self) -> Option<bool>;

    /// Switch on at `brightness`, or full power when `None`
    fn turn_on(&self, brightness: Option<u8>) -> Result<()>;

    fn turn_off(&self) -> Result<()>;
}

/// Switch capability: on/off only
pub trait SwitchEntity: Entity {
    fn is_on(&self) -> Option<bool>;

    fn turn_on(&self) -> Result<()>;

    fn turn_off(&self) -> Result<()>;
}

/// Number capability: a bounded value
pub trait NumberEntity: Entity {
    fn value(&self) -> Option<f64>;

    fn set_value(&self, value: f64) -> Result<()>;

    fn min_value(&self) -> f64 {
        0.0
    }

    fn max_value(&self) -> f64 {
        MAX_POWER as f64
    }

    fn step(&self) -> f64 {
        1.0
    }

    fn mode(&self) -> NumberMode {
        NumberMode::Slider
    }
}

/// Identity and cache shared by the adapters below
///
/// `in_flight` is held for the whole request, so one adapter never has more
/// than one request outstanding against its channel. The cache lock is only
/// taken to read or store a value.
struct ChannelEntity {
    channel: Arc<PowerChannel>,
    unique_id: String,
    name: String,
    device_info: DeviceInfo,
    in_flight: Mutex<()>,
    last_power: Mutex<Option<PowerLevel>>,
}

impl ChannelEntity {
    fn new(channel: Arc<PowerChannel>, unique_id_suffix: &str, name: String) -> Self {
        let host = channel.host();
        Self {
            unique_id: format!("{}.{}", base_unique_id(host), unique_id_suffix),
            device_info: DeviceInfo::for_host(host),
            name,
            channel,
            in_flight: Mutex::new(()),
            last_power: Mutex::new(None),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Option<PowerLevel>> {
        self.last_power.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn power(&self) -> Option<PowerLevel> {
        *self.cache()
    }

    fn request(&self) -> MutexGuard<'_, ()> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self) -> Result<EntityState> {
        let _request = self.request();
        let power = self.channel.get_power()?;
        *self.cache() = Some(power);
        Ok(self.snapshot(Some(power)))
    }

    fn apply(&self, value: PowerLevel) -> Result<PowerLevel> {
        let _request = self.request();
        let acknowledged = self.channel.set_power(value)?;
        *self.cache() = Some(acknowledged);
        Ok(acknowledged)
    }

    fn snapshot(&self, power: Option<PowerLevel>) -> EntityState {
        EntityState {
            unique_id: self.unique_id.clone(),
            power,
            is_on: power.map(is_on),
        }
    }
}

macro_rules! delegate_entity {
    ($ty:ty) => {
        impl Entity for $ty {
            fn unique_id(&self) -> &str {
                &self.inner.unique_id
            }

            fn name(&self) -> &str {
                &self.inner.name
            }

            fn device_info(&self) -> &DeviceInfo {
                &self.inner.device_info
            }

            fn icon(&self) -> Option<&'static str> {
                Self::ICON
            }

            fn update(&self) -> Result<EntityState> {
                self.inner.refresh()
            }

            fn state(&self) -> EntityState {
                self.inner.snapshot(self.inner.power())
            }
        }
    };
}

/// The LED grow light on channel 0
pub struct PlantLight {
    inner: ChannelEntity,
}

impl PlantLight {
    const ICON: Option<&'static str> = None;

    pub fn new(channel: Arc<PowerChannel>) -> Self {
        let name = format!("{} LED", channel.host());
        Self {
            inner: ChannelEntity::new(channel, ChannelRole::Light.unique_id_suffix(), name),
        }
    }

    pub fn channel(&self) -> &PowerChannel {
        &self.inner.channel
    }
}

delegate_entity!(PlantLight);

impl LightEntity for PlantLight {
    fn brightness(&self) -> Option<u8> {
        self.inner.power().map(|p| p.clamp(0, MAX_POWER) as u8)
    }

    fn is_on(&self) -> Option<bool> {
        self.inner.power().map(is_on)
    }

    fn turn_on(&self, brightness: Option<u8>) -> Result<()> {
        let target = brightness.map_or(MAX_POWER, PowerLevel::from);
        self.inner.apply(target)?;
        Ok(())
    }

    fn turn_off(&self) -> Result<()> {
        self.inner.apply(0)?;
        Ok(())
    }
}

/// The water pump on channel 1, exposed as an on/off switch
pub struct WaterPumpSwitch {
    inner: ChannelEntity,
}

impl WaterPumpSwitch {
    const ICON: Option<&'static str> = Some("mdi:water-pump");

    pub fn new(channel: Arc<PowerChannel>) -> Self {
        let name = format!("{} water pump", channel.host());
        Self {
            inner: ChannelEntity::new(channel, ChannelRole::WaterPump.unique_id_suffix(), name),
        }
    }

    pub fn channel(&self) -> &PowerChannel {
        &self.inner.channel
    }
}

delegate_entity!(WaterPumpSwitch);

impl SwitchEntity for WaterPumpSwitch {
    fn is_on(&self) -> Option<bool> {
        self.inner.power().map(is_on)
    }

    fn turn_on(&self) -> Result<()> {
        self.inner.apply(MAX_POWER)?;
        Ok(())
    }

    fn turn_off(&self) -> Result<()> {
        self.inner.apply(0)?;
        Ok(())
    }
}

/// The water pump on channel 1, exposed as a 0..=255 slider
pub struct WaterPumpLevel {
    inner: ChannelEntity,
}

impl WaterPumpLevel {
    const ICON: Option<&'static str> = Some("mdi:water-pump");

    pub fn new(channel: Arc<PowerChannel>) -> Self {
        let name = format!("{} water pump level", channel.host());
        let suffix = format!("{}_level", ChannelRole::WaterPump.unique_id_suffix());
        Self {
            inner: ChannelEntity::new(channel, &suffix, name),
        }
    }
}

delegate_entity!(WaterPumpLevel);

impl NumberEntity for WaterPumpLevel {
    fn value(&self) -> Option<f64> {
        self.inner.power().map(|p| p as f64)
    }

    fn set_value(&self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(PlantCareError::InvalidRequest(format!(
                "pump level must be a finite number, got {}",
                value
            )));
        }
        let level = value.round().clamp(self.min_value(), self.max_value()) as PowerLevel;
        self.inner.apply(level)?;
        Ok(())
    }
}
