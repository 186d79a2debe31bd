//! Measurement store: latest value of every sensor and setting.
//!
//! One writer (the MQTT listener) and one reader (the control loop) share a
//! single instance through [`SharedStore`]. The lock is only held for the
//! duration of an update or a snapshot copy, never across an await point.

use crate::config::HeaterConfig;
use crate::models::{PointId, SensorId, Sensors, SettingId, Settings};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub type SharedStore = Arc<Mutex<MeasurementStore>>;

#[derive(Debug, Clone)]
pub struct MeasurementStore {
    sensors: Sensors,
    settings: Settings,
}

/// Copy of every value the decision engine reads in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Readings {
    pub room_temp: f64,
    pub tank_up: f64,
    pub heater_in: f64,
    pub heater_out: f64,
    pub tank_min: f64,
    pub tank_max: f64,
    pub heater_critical: f64,
    pub expected: f64,
    pub hysteresis: f64,
}

impl MeasurementStore {
    /// Sensors start at the sentinel whatever the document says; settings keep
    /// their configured defaults.
    pub fn new(mut sensors: Sensors, settings: Settings) -> Self {
        sensors.reset_to_sentinel();
        Self { sensors, settings }
    }

    pub fn from_config(cfg: &HeaterConfig) -> Self {
        Self::new(cfg.sensors.clone(), cfg.settings.clone())
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Applies one inbound message. Returns the point that changed, or `None`
    /// when the payload is not a finite number or the topic is not ours.
    pub fn update(&mut self, topic: &str, raw: &[u8]) -> Option<PointId> {
        let Some(value) = parse_reading(raw) else {
            debug!("discarding non-numeric payload on {topic}");
            return None;
        };

        let id = self.lookup(topic)?;
        match id {
            PointId::Sensor(s) => self.sensors.get_mut(s).value = value,
            PointId::Setting(s) => self.settings.get_mut(s).value = value,
        }
        Some(id)
    }

    fn lookup(&self, topic: &str) -> Option<PointId> {
        self.sensors
            .iter()
            .find(|(_, dp)| dp.address == topic)
            .map(|(id, _)| PointId::Sensor(id))
            .or_else(|| {
                self.settings
                    .iter()
                    .find(|(_, dp)| dp.address == topic)
                    .map(|(id, _)| PointId::Setting(id))
            })
    }

    /// Sensors that have not produced a single real reading yet.
    pub fn missing_sensors(&self) -> Vec<SensorId> {
        self.sensors
            .iter()
            .filter(|(_, dp)| !dp.is_known())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn sensors_ready(&self) -> bool {
        self.sensors.iter().all(|(_, dp)| dp.is_known())
    }

    pub fn sensor(&self, id: SensorId) -> f64 {
        self.sensors.get(id).value
    }

    pub fn setting(&self, id: SettingId) -> f64 {
        self.settings.get(id).value
    }

    pub fn sensors(&self) -> &Sensors {
        &self.sensors
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn snapshot(&self) -> Readings {
        Readings {
            room_temp: self.sensors.room_temp.value,
            tank_up: self.sensors.tank_up.value,
            heater_in: self.sensors.heater_in.value,
            heater_out: self.sensors.heater_out.value,
            tank_min: self.settings.tank_min.value,
            tank_max: self.settings.tank_max.value,
            heater_critical: self.settings.heater_critical.value,
            expected: self.settings.expected.value,
            hysteresis: self.settings.hysteresis.value,
        }
    }
}

/// UTF-8 decimal text to a finite float. NaN and infinities are refused:
/// a NaN outlet temperature would never compare as critical.
fn parse_reading(raw: &[u8]) -> Option<f64> {
    let txt = std::str::from_utf8(raw).ok()?;
    txt.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataPoint, SENSOR_SENTINEL};

    fn store() -> MeasurementStore {
        let sensors = Sensors {
            heater_in: DataPoint::new("heater/in", 0.0),
            heater_out: DataPoint::new("heater/out", 0.0),
            room_temp: DataPoint::new("room", 19.0),
            tank_up: DataPoint::new("tank/up", 0.0),
        };
        let settings = Settings {
            tank_min: DataPoint::new("set/tankmin", 45.0),
            tank_max: DataPoint::new("set/tankmax", 55.0),
            heater_critical: DataPoint::new("set/critical", 80.0),
            expected: DataPoint::new("set/expected", 18.0),
            hysteresis: DataPoint::new("set/hysteresis", 2.0),
        };
        MeasurementStore::new(sensors, settings)
    }

    #[test]
    fn test_sensors_start_at_sentinel() {
        let s = store();
        assert_eq!(s.sensor(SensorId::RoomTemp), SENSOR_SENTINEL);
        assert_eq!(s.missing_sensors().len(), 4);
        assert!(!s.sensors_ready());
        assert_eq!(s.setting(SettingId::TankMin), 45.0);
    }

    #[test]
    fn test_update_routes_by_topic() {
        let mut s = store();
        assert_eq!(s.update("tank/up", b"41.5"), Some(PointId::Sensor(SensorId::TankUp)));
        assert_eq!(s.update("set/expected", b"20"), Some(PointId::Setting(SettingId::Expected)));
        assert_eq!(s.sensor(SensorId::TankUp), 41.5);
        assert_eq!(s.setting(SettingId::Expected), 20.0);
        assert_eq!(s.missing_sensors(), vec![SensorId::HeaterIn, SensorId::HeaterOut, SensorId::RoomTemp]);
    }

    #[test]
    fn test_malformed_payload_discarded() {
        let mut s = store();
        s.update("room", b"21");
        assert_eq!(s.update("room", b"warm"), None);
        assert_eq!(s.update("room", b""), None);
        assert_eq!(s.update("room", &[0xff, 0xfe]), None);
        assert_eq!(s.update("room", b"NaN"), None);
        assert_eq!(s.update("room", b"inf"), None);
        assert_eq!(s.sensor(SensorId::RoomTemp), 21.0);
    }

    #[test]
    fn test_unknown_topic_ignored() {
        let mut s = store();
        let before = s.snapshot();
        assert_eq!(s.update("garage/temperature", b"12"), None);
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn test_ready_after_all_sensors_reported() {
        let mut s = store();
        for topic in ["heater/in", "heater/out", "room", "tank/up"] {
            assert!(!s.sensors_ready());
            s.update(topic, b"30");
        }
        assert!(s.sensors_ready());
        assert!(s.missing_sensors().is_empty());
    }

    #[test]
    fn test_settings_update_at_runtime() {
        let mut s = store();
        s.update("set/critical", b"75.5");
        assert_eq!(s.snapshot().heater_critical, 75.5);
    }
}
