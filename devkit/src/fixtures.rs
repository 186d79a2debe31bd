//! Fixture configuration shared by kernel and devkit tests.

use heater_kernel::config::{ControlConf, HeaterConfig};
use heater_kernel::models::{ActuatorAddresses, DataPoint, Sensors, Settings};

pub const HEATER: &str = "evok/relay/3/set";
pub const SWITCH: &str = "evok/relay/2/set";

pub const HEATER_IN: &str = "evok/temp/heater_in";
pub const HEATER_OUT: &str = "evok/temp/heater_out";
pub const ROOM_TEMP: &str = "evok/temp/room";
pub const TANK_UP: &str = "evok/temp/tank_up";

pub const TANK_MIN: &str = "heater/settings/tankmin";
pub const TANK_MAX: &str = "heater/settings/tankmax";
pub const HEATER_CRITICAL: &str = "heater/settings/critical";
pub const EXPECTED: &str = "heater/settings/expected";
pub const HYSTERESIS: &str = "heater/settings/hysteresis";

/// tankMin 45, tankMax 55, critical 80, expected 18, hysteresis 2.
/// The settle delay is zero so cycles complete without sleeping.
pub fn config() -> HeaterConfig {
    HeaterConfig {
        actuators: ActuatorAddresses { heater: HEATER.into(), switch: SWITCH.into() },
        sensors: Sensors {
            heater_in: DataPoint::new(HEATER_IN, 0.0),
            heater_out: DataPoint::new(HEATER_OUT, 0.0),
            room_temp: DataPoint::new(ROOM_TEMP, 0.0),
            tank_up: DataPoint::new(TANK_UP, 0.0),
        },
        settings: Settings {
            tank_min: DataPoint::new(TANK_MIN, 45.0),
            tank_max: DataPoint::new(TANK_MAX, 55.0),
            heater_critical: DataPoint::new(HEATER_CRITICAL, 80.0),
            expected: DataPoint::new(EXPECTED, 18.0),
            hysteresis: DataPoint::new(HYSTERESIS, 2.0),
        },
        control: ControlConf { settle_delay_ms: 0, ..ControlConf::default() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_is_valid() {
        let cfg = config();
        cfg.validate().unwrap();
        assert_eq!(cfg.subscriptions().len(), 9);
    }
}
