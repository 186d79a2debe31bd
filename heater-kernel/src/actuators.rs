//! Actuator state machine for the burner relay and the diverter switch.
//!
//! The commanded state only changes once the bus has accepted the publish, so
//! it always equals the last value actually sent. Setting an actuator to the
//! state it is already in is a no-op: one publish per real transition.

use crate::bus::{BusError, Publisher};
use crate::metrics::Metrics;
use crate::models::{binary_payload, ActuatorAddresses, SwitchPosition};
use tracing::{info, warn};

pub struct Actuators<P> {
    bus: P,
    heater_address: String,
    switch_address: String,
    heater_on: bool,
    switch: SwitchPosition,
    metrics: Metrics,
}

impl<P: Publisher> Actuators<P> {
    /// Both actuators are assumed off until [`Actuators::reset`] confirms it.
    pub fn new(bus: P, addresses: &ActuatorAddresses, metrics: Metrics) -> Self {
        Self {
            bus,
            heater_address: addresses.heater.clone(),
            switch_address: addresses.switch.clone(),
            heater_on: false,
            switch: SwitchPosition::Room,
            metrics,
        }
    }

    /// Publishes "0" to both actuators regardless of the commanded state.
    /// Callers treat an error here as fatal.
    pub async fn reset(&mut self) -> Result<(), BusError> {
        self.bus.publish(&self.heater_address, binary_payload(false)).await?;
        self.heater_on = false;
        self.metrics.set_burner(false);

        self.bus.publish(&self.switch_address, binary_payload(false)).await?;
        self.switch = SwitchPosition::Room;
        self.metrics.set_switch(false);

        info!("Actuators reset: burner off, switch in home heating position");
        Ok(())
    }

    /// Returns `Ok(true)` when a command was published, `Ok(false)` when the
    /// burner was already in the desired state.
    pub async fn set_heater(&mut self, desired: bool, reason: &str) -> Result<bool, BusError> {
        if desired == self.heater_on {
            return Ok(false);
        }

        if let Err(e) = self.bus.publish(&self.heater_address, binary_payload(desired)).await {
            self.metrics.inc_publish_failures();
            warn!(desired, reason, "burner command not accepted: {e}");
            return Err(e);
        }

        self.heater_on = desired;
        self.metrics.set_burner(desired);
        if desired {
            info!("Starting: {reason}");
        } else {
            info!("Stopping: {reason}");
        }
        Ok(true)
    }

    /// Same contract as [`Actuators::set_heater`] for the diverter.
    pub async fn set_switch(&mut self, desired: SwitchPosition) -> Result<bool, BusError> {
        if desired == self.switch {
            return Ok(false);
        }

        if let Err(e) = self.bus.publish(&self.switch_address, binary_payload(desired.is_water())).await {
            self.metrics.inc_publish_failures();
            warn!(?desired, "switch command not accepted: {e}");
            return Err(e);
        }

        self.switch = desired;
        self.metrics.set_switch(desired.is_water());
        match desired {
            SwitchPosition::Water => info!("Switching actuator in water heating position"),
            SwitchPosition::Room => info!("Switching actuator in home heating position"),
        }
        Ok(true)
    }

    pub fn heater_on(&self) -> bool {
        self.heater_on
    }

    pub fn switch_position(&self) -> SwitchPosition {
        self.switch
    }

    pub fn bus(&self) -> &P {
        &self.bus
    }
}
