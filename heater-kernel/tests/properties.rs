//! Invariants checked over small grids of sensor values.

use heater_devkit::{fixtures, TestHarness};
use heater_kernel::models::SwitchPosition;
use heater_kernel::Mode;

const TANK_VALUES: [f64; 6] = [10.0, 44.9, 45.0, 50.0, 55.0, 70.0];
const ROOM_VALUES: [f64; 6] = [5.0, 16.9, 17.0, 18.0, 19.0, 25.0];

#[tokio::test]
async fn repeated_cycles_publish_each_transition_once() {
    let mut h = TestHarness::new();
    h.set_sensors(40.0, 50.0, 18.0, 40.0);

    for _ in 0..10 {
        h.run_cycle().await.unwrap();
    }

    assert_eq!(h.heater_commands(), vec!["1"]);
    assert_eq!(h.switch_commands(), vec!["1"]);
}

#[tokio::test]
async fn critical_outlet_always_leaves_burner_off() {
    for outlet in [80.0, 80.5, 120.0] {
        for tank in TANK_VALUES {
            for room in ROOM_VALUES {
                for switch in [SwitchPosition::Room, SwitchPosition::Water] {
                    let mut h = TestHarness::new();
                    h.force_heater(true).await;
                    h.force_switch(switch).await;
                    h.set_sensors(40.0, outlet, room, tank);

                    let plan = h.run_cycle().await.unwrap();

                    assert_eq!(plan.mode, Mode::Failsafe, "outlet={outlet} tank={tank} room={room}");
                    assert!(!h.heater_on());
                    assert!(h.switch_commands().is_empty());
                }
            }
        }
    }
}

#[tokio::test]
async fn room_inside_band_never_chatters() {
    for room in [17.0, 17.01, 18.0, 18.99, 19.0] {
        for burner in [false, true] {
            let mut h = TestHarness::new();
            h.force_heater(burner).await;
            h.set_sensors(40.0, 50.0, room, 50.0);

            for _ in 0..20 {
                let plan = h.run_cycle().await.unwrap();
                assert_eq!(plan.mode, Mode::RoomHold);
            }

            assert!(h.bus.published().is_empty(), "room={room} burner={burner}");
            assert_eq!(h.heater_on(), burner);
        }
    }
}

#[tokio::test]
async fn dhw_active_cycles_never_evaluate_room_rules() {
    for tank in TANK_VALUES {
        for room in ROOM_VALUES {
            for switch in [SwitchPosition::Room, SwitchPosition::Water] {
                let mut h = TestHarness::new();
                h.force_switch(switch).await;
                h.set_sensors(40.0, 50.0, room, tank);

                let plan = h.run_cycle().await.unwrap();

                if plan.dhw_active() {
                    assert!(!plan.evaluated.contains(&"room_heating"));
                    assert!(h.heater_commands().iter().all(|p| p == "1"));
                } else {
                    assert_eq!(plan.evaluated.last(), Some(&"room_heating"));
                }
            }
        }
    }
}

#[tokio::test]
async fn rejected_publish_is_retried_next_cycle() {
    let mut h = TestHarness::new();
    h.set_sensors(40.0, 50.0, 18.0, 40.0);

    h.bus.fail_next(1);
    assert!(h.run_cycle().await.is_err());
    assert!(!h.heater_on());
    assert!(h.bus.published().is_empty(), "switch must not move after a failed burner start");
    assert_eq!(h.metrics.snapshot().publish_failures_total, 1);
    assert!(!h.metrics.snapshot().burner_on);

    h.run_cycle().await.unwrap();
    assert!(h.heater_on());
    assert_eq!(h.heater_commands(), vec!["1"]);
    assert_eq!(h.switch_commands(), vec!["1"]);
}

#[tokio::test]
async fn rejected_switch_keeps_commanded_position() {
    let mut h = TestHarness::new();
    h.set_sensors(40.0, 50.0, 18.0, 40.0);
    h.bus.fail_topic(fixtures::SWITCH);

    for _ in 0..3 {
        assert!(h.run_cycle().await.is_err());
    }
    assert_eq!(h.switch_position(), SwitchPosition::Room);
    assert_eq!(h.bus.rejected().len(), 3);
    assert_eq!(h.heater_commands(), vec!["1"]);

    h.bus.restore_topic(fixtures::SWITCH);
    h.run_cycle().await.unwrap();
    assert_eq!(h.switch_position(), SwitchPosition::Water);
    assert!(h.metrics.snapshot().switch_water);
}
