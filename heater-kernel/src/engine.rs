//! Decision engine.
//!
//! Each cycle copies the measurement store, runs the rules below in order and
//! stops at the first one that claims the cycle:
//!
//! 1. failsafe: outlet at or above the critical limit forces the burner off;
//! 2. DHW priority: tank below minimum fills the tank, tank at maximum sends
//!    the flow back to the heating circuit;
//! 3. room heating: symmetric hysteresis band around the expected temperature.
//!
//! Planning is pure ([`plan`]); the resulting commands are then applied in
//! order through the actuator state machine, waiting for the relays to settle
//! after every real transition.

use crate::actuators::Actuators;
use crate::bus::{BusError, Publisher};
use crate::config::ControlConf;
use crate::gate;
use crate::metrics::Metrics;
use crate::models::SwitchPosition;
use crate::store::{Readings, SharedStore};
use serde::Serialize;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Failsafe,
    DhwFilling,
    RoomHeatOn,
    RoomHeatOff,
    /// Room temperature inside the dead zone, burner left as it is.
    RoomHold,
}

impl Mode {
    const ALL: [Mode; 5] = [Mode::Failsafe, Mode::DhwFilling, Mode::RoomHeatOn, Mode::RoomHeatOff, Mode::RoomHold];

    pub(crate) fn code(self) -> u8 {
        self as u8 + 1
    }

    pub(crate) fn from_code(code: u8) -> Option<Mode> {
        Mode::ALL.into_iter().find(|m| m.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Heater { on: bool, reason: &'static str },
    Switch(SwitchPosition),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub mode: Mode,
    pub commands: Vec<Command>,
    /// Names of the rules that ran, in order.
    pub evaluated: Vec<&'static str>,
}

impl Plan {
    pub fn dhw_active(&self) -> bool {
        self.mode == Mode::DhwFilling
    }
}

struct Evaluation<'a> {
    readings: &'a Readings,
    switch: SwitchPosition,
    hysteresis_divisor: f64,
    commands: Vec<Command>,
}

enum Flow {
    Continue,
    Done(Mode),
}

type Rule = fn(&mut Evaluation<'_>) -> Flow;

const RULES: [(&str, Rule); 3] = [
    ("failsafe", failsafe),
    ("dhw_priority", dhw_priority),
    ("room_heating", room_heating),
];

fn failsafe(ev: &mut Evaluation<'_>) -> Flow {
    let r = ev.readings;
    if r.heater_out >= r.heater_critical {
        ev.commands.push(Command::Heater { on: false, reason: "critical heater temperature reached" });
        return Flow::Done(Mode::Failsafe);
    }
    Flow::Continue
}

fn dhw_priority(ev: &mut Evaluation<'_>) -> Flow {
    let r = ev.readings;
    if r.tank_up < r.tank_min {
        ev.commands.push(Command::Heater { on: true, reason: "water heating" });
        ev.commands.push(Command::Switch(SwitchPosition::Water));
        return Flow::Done(Mode::DhwFilling);
    }
    if r.tank_up >= r.tank_max {
        // a full tank only redirects the flow; the room rule decides the burner
        ev.commands.push(Command::Switch(SwitchPosition::Room));
        return Flow::Continue;
    }
    if ev.switch.is_water() {
        return Flow::Done(Mode::DhwFilling);
    }
    Flow::Continue
}

fn room_heating(ev: &mut Evaluation<'_>) -> Flow {
    let r = ev.readings;
    let half_band = r.hysteresis / ev.hysteresis_divisor;
    if r.room_temp < r.expected - half_band {
        ev.commands.push(Command::Heater { on: true, reason: "room temperature lower than expected" });
        return Flow::Done(Mode::RoomHeatOn);
    }
    if r.room_temp > r.expected + half_band {
        ev.commands.push(Command::Heater { on: false, reason: "expected room temperature achieved" });
        return Flow::Done(Mode::RoomHeatOff);
    }
    Flow::Done(Mode::RoomHold)
}

/// Decides what this cycle should command, given the readings and the
/// diverter position currently commanded (which doubles as the DHW flag).
pub fn plan(readings: &Readings, switch: SwitchPosition, hysteresis_divisor: f64) -> Plan {
    let mut ev = Evaluation { readings, switch, hysteresis_divisor, commands: Vec::new() };
    let mut evaluated = Vec::with_capacity(RULES.len());
    let mut mode = Mode::RoomHold;

    for (name, rule) in RULES {
        evaluated.push(name);
        if let Flow::Done(m) = rule(&mut ev) {
            mode = m;
            break;
        }
    }

    Plan { mode, commands: ev.commands, evaluated }
}

pub struct Engine<P> {
    store: SharedStore,
    actuators: Actuators<P>,
    metrics: Metrics,
    control: ControlConf,
}

impl<P: Publisher> Engine<P> {
    pub fn new(store: SharedStore, actuators: Actuators<P>, metrics: Metrics, control: ControlConf) -> Self {
        Self { store, actuators, metrics, control }
    }

    pub fn actuators(&self) -> &Actuators<P> {
        &self.actuators
    }

    pub fn actuators_mut(&mut self) -> &mut Actuators<P> {
        &mut self.actuators
    }

    /// One failsafe → DHW → room pass. A rejected publish ends the cycle early
    /// so nothing dependent on it is commanded; the next cycle retries.
    pub async fn run_cycle(&mut self) -> Result<Plan, BusError> {
        let readings = self.store.lock().snapshot();
        let plan = plan(&readings, self.actuators.switch_position(), self.control.hysteresis_divisor);
        debug!(mode = ?plan.mode, commands = plan.commands.len(), "cycle planned");

        if plan.mode == Mode::Failsafe {
            self.metrics.inc_failsafe();
        }

        for command in &plan.commands {
            let changed = match *command {
                Command::Heater { on, reason } => self.actuators.set_heater(on, reason).await?,
                Command::Switch(position) => self.actuators.set_switch(position).await?,
            };
            if changed {
                self.settle().await;
            }
        }

        self.metrics.inc_cycles();
        self.metrics.record_mode(plan.mode);
        Ok(plan)
    }

    async fn settle(&self) {
        let delay = self.control.settle_delay();
        if !delay.is_zero() {
            time::sleep(delay).await;
        }
    }

    /// Waits for the startup gate, then runs a cycle every `cycleIntervalMs`
    /// forever. Cycles never overlap: a slow cycle delays the next tick.
    pub async fn run(&mut self) {
        gate::wait_for_sensors(&self.store, self.control.sensor_wait()).await;
        self.metrics.mark_sensors_ready();
        info!(interval_ms = self.control.cycle_interval_ms, "control loop started");

        let mut ticker = time::interval(self.control.cycle_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cycle().await {
                warn!("control cycle aborted, retrying next cycle: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings() -> Readings {
        Readings {
            room_temp: 18.0,
            tank_up: 50.0,
            heater_in: 40.0,
            heater_out: 50.0,
            tank_min: 45.0,
            tank_max: 55.0,
            heater_critical: 80.0,
            expected: 18.0,
            hysteresis: 2.0,
        }
    }

    fn heater(on: bool, reason: &'static str) -> Command {
        Command::Heater { on, reason }
    }

    #[test]
    fn test_failsafe_overrides_everything() {
        let r = Readings { heater_out: 85.0, tank_up: 10.0, room_temp: 5.0, ..readings() };
        let p = plan(&r, SwitchPosition::Water, 2.0);
        assert_eq!(p.mode, Mode::Failsafe);
        assert_eq!(p.commands, vec![heater(false, "critical heater temperature reached")]);
        assert_eq!(p.evaluated, vec!["failsafe"]);
    }

    #[test]
    fn test_failsafe_is_inclusive_at_limit() {
        let r = Readings { heater_out: 80.0, ..readings() };
        assert_eq!(plan(&r, SwitchPosition::Room, 2.0).mode, Mode::Failsafe);
        let r = Readings { heater_out: 79.9, ..readings() };
        assert_ne!(plan(&r, SwitchPosition::Room, 2.0).mode, Mode::Failsafe);
    }

    #[test]
    fn test_cold_tank_fills_before_room() {
        let r = Readings { tank_up: 40.0, room_temp: 10.0, ..readings() };
        let p = plan(&r, SwitchPosition::Room, 2.0);
        assert_eq!(p.mode, Mode::DhwFilling);
        assert_eq!(
            p.commands,
            vec![heater(true, "water heating"), Command::Switch(SwitchPosition::Water)]
        );
        assert!(!p.evaluated.contains(&"room_heating"));
    }

    #[test]
    fn test_full_tank_redirects_then_room_rules_run() {
        let r = Readings { tank_up: 55.0, room_temp: 17.0, ..readings() };
        let p = plan(&r, SwitchPosition::Water, 2.0);
        assert_eq!(p.mode, Mode::RoomHeatOn);
        assert_eq!(
            p.commands,
            vec![
                Command::Switch(SwitchPosition::Room),
                heater(true, "room temperature lower than expected"),
            ]
        );
    }

    #[test]
    fn test_tank_within_band_keeps_current_mode() {
        let r = Readings { tank_up: 50.0, room_temp: 10.0, ..readings() };

        let filling = plan(&r, SwitchPosition::Water, 2.0);
        assert_eq!(filling.mode, Mode::DhwFilling);
        assert!(filling.commands.is_empty());

        let room = plan(&r, SwitchPosition::Room, 2.0);
        assert_eq!(room.mode, Mode::RoomHeatOn);
    }

    #[test]
    fn test_tank_min_boundary_does_not_start_filling() {
        let r = Readings { tank_up: 45.0, ..readings() };
        assert_eq!(plan(&r, SwitchPosition::Room, 2.0).mode, Mode::RoomHold);
    }

    #[test]
    fn test_room_hysteresis_band() {
        let at = |room_temp: f64| plan(&Readings { room_temp, ..readings() }, SwitchPosition::Room, 2.0).mode;
        assert_eq!(at(16.9), Mode::RoomHeatOn);
        assert_eq!(at(17.0), Mode::RoomHold);
        assert_eq!(at(18.5), Mode::RoomHold);
        assert_eq!(at(19.0), Mode::RoomHold);
        assert_eq!(at(19.5), Mode::RoomHeatOff);
    }

    #[test]
    fn test_full_width_divisor() {
        let r = Readings { room_temp: 16.5, ..readings() };
        assert_eq!(plan(&r, SwitchPosition::Room, 2.0).mode, Mode::RoomHeatOn);
        assert_eq!(plan(&r, SwitchPosition::Room, 1.0).mode, Mode::RoomHold);
    }

    #[test]
    fn test_mode_codes_round_trip() {
        for m in Mode::ALL {
            assert_eq!(Mode::from_code(m.code()), Some(m));
        }
        assert_eq!(Mode::from_code(0), None);
    }
}
