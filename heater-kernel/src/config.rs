//! Process flags and the YAML topic-mapping document.

use crate::error::ConfigError;
use crate::models::{ActuatorAddresses, Sensors, Settings};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

const DEFAULT_MQTT_PORT: u16 = 1883;

#[derive(Debug, Clone, Parser)]
#[command(name = "heater-kernel", version, about = "Boiler thermostat controller")]
pub struct Args {
    /// Full url of the MQTT server, e.g. tcp://127.0.0.1:1883
    #[arg(long, env = "HEATER_BROKER", default_value = "tcp://127.0.0.1:1883")]
    pub broker: String,

    /// Client id used for the MQTT connection
    #[arg(long = "clientid", env = "HEATER_CLIENT_ID", default_value = "heater")]
    pub client_id: String,

    /// Configuration file with MQTT topic mappings
    #[arg(long, env = "HEATER_CONFIG", default_value = "/config.yaml")]
    pub config: PathBuf,

    /// Listen address of the metrics/status endpoint
    #[arg(long, env = "HEATER_METRICS_ADDR", default_value = "0.0.0.0:7002")]
    pub metrics_addr: std::net::SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaterConfig {
    pub actuators: ActuatorAddresses,
    pub sensors: Sensors,
    pub settings: Settings,
    #[serde(default)]
    pub control: ControlConf,
}

/// Loop timings and the hysteresis divisor. Every field is optional in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ControlConf {
    /// Room band is `expected ± hysteresis / divisor`. 2 gives a symmetric half-band.
    pub hysteresis_divisor: f64,
    pub cycle_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub sensor_wait_secs: u64,
}

impl Default for ControlConf {
    fn default() -> Self {
        Self {
            hysteresis_divisor: 2.0,
            cycle_interval_ms: 1000,
            settle_delay_ms: 1000,
            sensor_wait_secs: 15,
        }
    }
}

impl ControlConf {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn sensor_wait(&self) -> Duration {
        Duration::from_secs(self.sensor_wait_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.hysteresis_divisor.is_finite() || self.hysteresis_divisor <= 0.0 {
            return Err(ConfigError::InvalidControl {
                name: "hysteresisDivisor",
                reason: "must be a finite number greater than zero",
            });
        }
        if self.cycle_interval_ms == 0 {
            return Err(ConfigError::InvalidControl {
                name: "cycleIntervalMs",
                reason: "must be greater than zero",
            });
        }
        if self.sensor_wait_secs == 0 {
            return Err(ConfigError::InvalidControl {
                name: "sensorWaitSecs",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }
}

impl HeaterConfig {
    /// Parses and validates a document. Unknown keys are rejected.
    pub fn from_yaml(txt: &str) -> Result<Self, ConfigError> {
        let cfg: HeaterConfig = serde_yaml::from_str(txt)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Every address the controller knows about, labelled for error messages.
    fn labelled_addresses(&self) -> Vec<(&'static str, &str)> {
        let mut out = vec![
            ("heater", self.actuators.heater.as_str()),
            ("switch", self.actuators.switch.as_str()),
        ];
        out.extend(self.sensors.iter().map(|(id, dp)| (id.name(), dp.address.as_str())));
        out.extend(self.settings.iter().map(|(id, dp)| (id.name(), dp.address.as_str())));
        out
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: HashMap<&str, &'static str> = HashMap::new();
        for (name, address) in self.labelled_addresses() {
            if address.trim().is_empty() {
                return Err(ConfigError::MissingAddress(name));
            }
            if let Some(first) = seen.insert(address, name) {
                return Err(ConfigError::DuplicateAddress {
                    address: address.to_string(),
                    first,
                    second: name,
                });
            }
        }
        // a NaN limit makes every comparison false, including the failsafe
        if let Some((id, dp)) = self.settings.iter().find(|(_, dp)| !dp.value.is_finite()) {
            return Err(ConfigError::NonFiniteSetting { name: id.name(), value: dp.value });
        }
        self.control.validate()
    }

    /// Topics the bus adapter subscribes to: 4 sensors then 5 settings.
    pub fn subscriptions(&self) -> Vec<String> {
        self.sensors
            .iter()
            .map(|(_, dp)| dp.address.clone())
            .chain(self.settings.iter().map(|(_, dp)| dp.address.clone()))
            .collect()
    }
}

pub async fn load_config(path: &Path) -> Result<HeaterConfig, ConfigError> {
    let txt = fs::read_to_string(path).await.map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    HeaterConfig::from_yaml(&txt)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddr {
    pub host: String,
    pub port: u16,
}

/// Accepts `tcp://host:port`, `mqtt://host:port` or a bare `host[:port]`.
/// IPv6 literals go in brackets when a port is given (`[::1]:1883`).
pub fn parse_broker(url: &str) -> Result<BrokerAddr, ConfigError> {
    let invalid = |reason| ConfigError::InvalidBroker { url: url.to_string(), reason };

    let rest = match url.split_once("://") {
        Some(("tcp" | "mqtt", rest)) => rest,
        Some(_) => return Err(invalid("unsupported scheme, expected tcp:// or mqtt://")),
        None => url,
    };
    let rest = rest.trim_end_matches('/');
    let parse_port = |port: &str| port.parse::<u16>().map_err(|_| invalid("port is not a number"));

    let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
        let (host, tail) = bracketed.split_once(']').ok_or_else(|| invalid("unclosed '[' in host"))?;
        match tail {
            "" => (host, DEFAULT_MQTT_PORT),
            _ => match tail.strip_prefix(':') {
                Some(port) => (host, parse_port(port)?),
                None => return Err(invalid("unexpected text after ']'")),
            },
        }
    } else if rest.matches(':').count() > 1 {
        // bare IPv6 literal, no port
        (rest, DEFAULT_MQTT_PORT)
    } else {
        match rest.rsplit_once(':') {
            Some((host, port)) => (host, parse_port(port)?),
            None => (rest, DEFAULT_MQTT_PORT),
        }
    };
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    Ok(BrokerAddr { host: host.to_string(), port })
}
