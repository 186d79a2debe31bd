/*!
# Heater DevKit - test support for the heater kernel

- `MockBus`: recording publisher with failure injection, stands in for the MQTT client
- `TestHarness`: measurement store + mock bus + decision engine wired from a fixture config
- `fixtures`: a complete, valid configuration with readable topic names
*/

pub mod fixtures;
pub mod mqtt_stub;
pub mod test_utils;

pub use mqtt_stub::{MockBus, MockMessage};
pub use test_utils::TestHarness;
