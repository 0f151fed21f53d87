//! Rust library for controlling PlantCare networked plant care appliances
//!
//! A PlantCare device is a small embedded HTTP server with numbered power
//! channels: channel 0 drives the LED grow light, channel 1 the water pump.
//! Each channel is a plain-text resource at `http://{host}/power/{index}`:
//! GET returns the current power level, PUT sets it and returns the level the
//! device acknowledged (0..=255, 0 meaning off).
//!
//! This crate provides:
//!
//! - A blocking power channel client
//! - Light, switch and number entity adapters with cached state
//! - A config flow and integration setup for home-automation hosts
//! - An async poller that refreshes entities on tokio's blocking pool
//!
//! # Quick Start
//!
//! ```no_run
//! use plant_care::PowerChannel;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let light = PowerChannel::new("192.168.1.50", 0)?;
//!
//!     // The acknowledged level is authoritative
//!     let level = light.set_power(128)?;
//!     println!("Light at {}", level);
//!
//!     let current = light.get_power()?;
//!     println!("Light is {}", if current != 0 { "on" } else { "off" });
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Channel**: one blocking GET/PUT client per power resource
//! - **Entity**: light/switch/number adapters sharing a channel by composition
//! - **Config flow**: user step turning a host into a config entry
//! - **Integration**: entry setup/unload and platform forwarding
//! - **Subscription**: periodic polling and state update broadcast
//! - **Types**: ids, roles and device registry info

mod channel;
mod config_flow;
mod entity;
mod error;
mod integration;
mod subscription;
mod types;

// Public exports
pub use channel::{http_client, validate_host, PowerChannel, REQUEST_TIMEOUT};
pub use config_flow::{ConfigEntry, ConfigFlow, EntryData, FlowResult, UserInput, CONF_HOST};
pub use entity::{
    ColorMode, Entity, EntityState, LightEntity, NumberEntity, NumberMode, PlantLight,
    SwitchEntity, WaterPumpLevel, WaterPumpSwitch,
};
pub use error::{PlantCareError, Result};
pub use integration::{Platform, PlantCareDevice, PlantCareIntegration, PLATFORMS};
pub use subscription::{update_blocking, Poller, StateReceiver, StateUpdate};
pub use types::{
    base_unique_id, is_on, ChannelIndex, ChannelRole, DeviceInfo, PowerLevel, DOMAIN, MAX_POWER,
};
