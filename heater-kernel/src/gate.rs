//! Startup gate: the control loop must never run against unknown sensor state.
//!
//! There is deliberately no timeout. Until every sensor has reported once, the
//! process keeps waiting and saying which ones are missing.

use crate::models::SensorId;
use crate::store::SharedStore;
use std::time::Duration;
use tracing::info;

/// Blocks until all four sensors hold a real reading, polling every `poll`.
pub async fn wait_for_sensors(store: &SharedStore, poll: Duration) {
    loop {
        let missing = store.lock().missing_sensors();
        if missing.is_empty() {
            break;
        }
        info!(
            "Waiting {}s for sensors data. Currently lacking: {}",
            poll.as_secs(),
            missing_names(&missing)
        );
        tokio::time::sleep(poll).await;
    }

    let sensors = store.lock().sensors().clone();
    info!(
        heater_in = sensors.heater_in.value,
        heater_out = sensors.heater_out.value,
        room_temp = sensors.room_temp.value,
        tank_up = sensors.tank_up.value,
        "Starting with sensors data received"
    );
}

fn missing_names(missing: &[SensorId]) -> String {
    missing.iter().map(|id| id.name()).collect::<Vec<_>>().join(" ")
}
