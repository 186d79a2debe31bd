//! Data points, sensor and setting groups, actuator addresses.
//!
//! The field names mirror the YAML keys of the configuration document
//! (`heaterIn`, `tankUp`, ...), so the same structs are used for parsing
//! and for the live measurement store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder written into every sensor before its first real update.
/// Boiler temperatures stay well below 100, so an exact match means "never heard from".
pub const SENSOR_SENTINEL: f64 = 300.0;

/// A named scalar bound to one bus address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataPoint {
    pub address: String,
    #[serde(default)]
    pub value: f64,
}

impl DataPoint {
    pub fn new(address: impl Into<String>, value: f64) -> Self {
        Self { address: address.into(), value }
    }

    /// False while the point still holds the startup sentinel.
    pub fn is_known(&self) -> bool {
        self.value != SENSOR_SENTINEL
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Sensors {
    pub heater_in: DataPoint,
    pub heater_out: DataPoint,
    pub room_temp: DataPoint,
    pub tank_up: DataPoint,
}

impl Sensors {
    pub fn iter(&self) -> impl Iterator<Item = (SensorId, &DataPoint)> {
        SensorId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }

    pub fn get(&self, id: SensorId) -> &DataPoint {
        match id {
            SensorId::HeaterIn => &self.heater_in,
            SensorId::HeaterOut => &self.heater_out,
            SensorId::RoomTemp => &self.room_temp,
            SensorId::TankUp => &self.tank_up,
        }
    }

    pub fn get_mut(&mut self, id: SensorId) -> &mut DataPoint {
        match id {
            SensorId::HeaterIn => &mut self.heater_in,
            SensorId::HeaterOut => &mut self.heater_out,
            SensorId::RoomTemp => &mut self.room_temp,
            SensorId::TankUp => &mut self.tank_up,
        }
    }

    /// Overwrites every sensor value with [`SENSOR_SENTINEL`].
    pub fn reset_to_sentinel(&mut self) {
        for id in SensorId::ALL {
            self.get_mut(id).value = SENSOR_SENTINEL;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    pub tank_min: DataPoint,
    pub tank_max: DataPoint,
    pub heater_critical: DataPoint,
    pub expected: DataPoint,
    pub hysteresis: DataPoint,
}

impl Settings {
    pub fn iter(&self) -> impl Iterator<Item = (SettingId, &DataPoint)> {
        SettingId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }

    pub fn get(&self, id: SettingId) -> &DataPoint {
        match id {
            SettingId::TankMin => &self.tank_min,
            SettingId::TankMax => &self.tank_max,
            SettingId::HeaterCritical => &self.heater_critical,
            SettingId::Expected => &self.expected,
            SettingId::Hysteresis => &self.hysteresis,
        }
    }

    pub fn get_mut(&mut self, id: SettingId) -> &mut DataPoint {
        match id {
            SettingId::TankMin => &mut self.tank_min,
            SettingId::TankMax => &mut self.tank_max,
            SettingId::HeaterCritical => &mut self.heater_critical,
            SettingId::Expected => &mut self.expected,
            SettingId::Hysteresis => &mut self.hysteresis,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorId {
    HeaterIn,
    HeaterOut,
    RoomTemp,
    TankUp,
}

impl SensorId {
    pub const ALL: [SensorId; 4] = [
        SensorId::HeaterIn,
        SensorId::HeaterOut,
        SensorId::RoomTemp,
        SensorId::TankUp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SensorId::HeaterIn => "heaterIn",
            SensorId::HeaterOut => "heaterOut",
            SensorId::RoomTemp => "roomTemp",
            SensorId::TankUp => "tankUp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingId {
    TankMin,
    TankMax,
    HeaterCritical,
    Expected,
    Hysteresis,
}

impl SettingId {
    pub const ALL: [SettingId; 5] = [
        SettingId::TankMin,
        SettingId::TankMax,
        SettingId::HeaterCritical,
        SettingId::Expected,
        SettingId::Hysteresis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingId::TankMin => "tankMin",
            SettingId::TankMax => "tankMax",
            SettingId::HeaterCritical => "heaterCritical",
            SettingId::Expected => "expected",
            SettingId::Hysteresis => "hysteresis",
        }
    }
}

/// Which data point an inbound message landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointId {
    Sensor(SensorId),
    Setting(SettingId),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Sensor(id) => f.write_str(id.name()),
            PointId::Setting(id) => f.write_str(id.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActuatorAddresses {
    pub heater: String,
    /// Diverter valve: "0" = central heating, "1" = DHW.
    pub switch: String,
}

/// Diverter position. Serialized on the bus as `"0"` (room) / `"1"` (water).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchPosition {
    #[default]
    Room,
    Water,
}

impl SwitchPosition {
    pub fn is_water(self) -> bool {
        self == SwitchPosition::Water
    }
}

impl From<bool> for SwitchPosition {
    fn from(water: bool) -> Self {
        if water {
            SwitchPosition::Water
        } else {
            SwitchPosition::Room
        }
    }
}

/// Wire encoding shared by both actuators.
pub fn binary_payload(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_marks_point_unknown() {
        let mut dp = DataPoint::new("sensors/room", SENSOR_SENTINEL);
        assert!(!dp.is_known());
        dp.value = 21.0;
        assert!(dp.is_known());
    }

    #[test]
    fn sensors_reset_to_sentinel() {
        let mut sensors = Sensors {
            heater_in: DataPoint::new("a", 10.0),
            heater_out: DataPoint::new("b", 20.0),
            room_temp: DataPoint::new("c", 30.0),
            tank_up: DataPoint::new("d", 40.0),
        };
        sensors.reset_to_sentinel();
        assert!(sensors.iter().all(|(_, dp)| !dp.is_known()));
        assert_eq!(sensors.get(SensorId::TankUp).address, "d");
    }

    #[test]
    fn switch_position_wire_values() {
        assert_eq!(binary_payload(SwitchPosition::Water.is_water()), "1");
        assert_eq!(binary_payload(SwitchPosition::Room.is_water()), "0");
        assert_eq!(SwitchPosition::from(true), SwitchPosition::Water);
    }
}
