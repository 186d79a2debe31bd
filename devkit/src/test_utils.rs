/*!
Test harness for the decision engine.

Wires a measurement store, a [`MockBus`] and an [`Engine`] from a config,
feeds values through the same inbound handler the MQTT listener uses, and
exposes what was published.
*/

use crate::fixtures;
use crate::mqtt_stub::MockBus;
use heater_kernel::bus::BusError;
use heater_kernel::config::HeaterConfig;
use heater_kernel::models::{binary_payload, PointId, SwitchPosition};
use heater_kernel::{mqtt, Actuators, Engine, MeasurementStore, Metrics, Plan, SharedStore};
use tracing_subscriber::EnvFilter;

pub struct TestHarness {
    pub bus: MockBus,
    pub store: SharedStore,
    pub metrics: Metrics,
    pub config: HeaterConfig,
    engine: Engine<MockBus>,
}

impl TestHarness {
    /// Harness over [`fixtures::config`].
    pub fn new() -> Self {
        Self::with_config(fixtures::config())
    }

    pub fn with_config(config: HeaterConfig) -> Self {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .try_init()
            .ok();

        let bus = MockBus::new();
        let metrics = Metrics::new();
        let store = MeasurementStore::from_config(&config).shared();
        let actuators = Actuators::new(bus.clone(), &config.actuators, metrics.clone());
        let engine = Engine::new(store.clone(), actuators, metrics.clone(), config.control.clone());

        Self { bus, store, metrics, config, engine }
    }

    /// Delivers one raw message as if it arrived from the broker.
    pub fn send(&self, topic: &str, payload: &str) -> Option<PointId> {
        mqtt::route_incoming(&self.store, topic, payload.as_bytes())
    }

    pub fn set(&self, topic: &str, value: f64) {
        self.send(topic, &value.to_string());
    }

    /// Reports every sensor at once, which also opens the startup gate.
    pub fn set_sensors(&self, heater_in: f64, heater_out: f64, room_temp: f64, tank_up: f64) {
        self.set(fixtures::HEATER_IN, heater_in);
        self.set(fixtures::HEATER_OUT, heater_out);
        self.set(fixtures::ROOM_TEMP, room_temp);
        self.set(fixtures::TANK_UP, tank_up);
    }

    pub async fn run_cycle(&mut self) -> Result<Plan, BusError> {
        self.engine.run_cycle().await
    }

    pub fn engine_mut(&mut self) -> &mut Engine<MockBus> {
        &mut self.engine
    }

    pub fn heater_on(&self) -> bool {
        self.engine.actuators().heater_on()
    }

    pub fn switch_position(&self) -> SwitchPosition {
        self.engine.actuators().switch_position()
    }

    /// Payloads published to the burner relay, oldest first.
    pub fn heater_commands(&self) -> Vec<String> {
        self.bus.payloads_for(&self.config.actuators.heater)
    }

    /// Payloads published to the diverter switch, oldest first.
    pub fn switch_commands(&self) -> Vec<String> {
        self.bus.payloads_for(&self.config.actuators.switch)
    }

    /// Brings the burner to `on` through the engine's own actuators, as a
    /// previous cycle would have, then forgets the publish.
    pub async fn force_heater(&mut self, on: bool) {
        self.engine
            .actuators_mut()
            .set_heater(on, "test setup")
            .await
            .expect("setup publish");
        self.bus.clear();
    }

    pub async fn force_switch(&mut self, position: SwitchPosition) {
        self.engine
            .actuators_mut()
            .set_switch(position)
            .await
            .expect("setup publish");
        self.bus.clear();
    }

    /// Last payload sent to the burner relay, decoded.
    pub fn last_heater_command(&self) -> Option<bool> {
        self.heater_commands().last().map(|p| p == binary_payload(true))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_harness_routes_messages_into_store() {
        let h = TestHarness::new();
        assert!(h.send(fixtures::ROOM_TEMP, "20.5").is_some());
        assert!(h.send("unrelated/topic", "20.5").is_none());
        assert!(h.send(fixtures::ROOM_TEMP, "abc").is_none());
        assert_eq!(h.store.lock().snapshot().room_temp, 20.5);
    }

    #[tokio::test]
    async fn test_force_heater_clears_log() {
        let mut h = TestHarness::new();
        h.force_heater(true).await;
        assert!(h.heater_on());
        assert!(h.bus.published().is_empty());
    }

    #[tokio::test]
    async fn test_cycle_commands_recorded() {
        let mut h = TestHarness::new();
        h.set_sensors(40.0, 50.0, 18.0, 40.0);
        h.run_cycle().await.unwrap();
        assert_eq!(h.last_heater_command(), Some(true));
        assert_eq!(h.switch_commands(), vec!["1"]);
    }
}
