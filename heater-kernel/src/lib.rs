//! Heater kernel - safety-gated thermostat for a combined space-heating / DHW boiler.
//!
//! Sensor readings and settings arrive over MQTT into a [`store::MeasurementStore`].
//! Once every sensor has reported ([`gate`]), the [`engine`] evaluates the
//! failsafe, DHW-priority and room-heating rules once per cycle and drives the
//! burner relay and diverter switch through [`actuators::Actuators`].

pub mod actuators;
pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod http;
pub mod metrics;
pub mod models;
pub mod mqtt;
pub mod store;

pub use actuators::Actuators;
pub use bus::{BusError, Publisher};
pub use config::{ControlConf, HeaterConfig};
pub use engine::{Engine, Mode, Plan};
pub use metrics::Metrics;
pub use store::{MeasurementStore, Readings, SharedStore};
