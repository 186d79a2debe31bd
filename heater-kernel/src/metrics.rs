//! Controller counters and gauges, rendered as Prometheus text on demand.

use crate::engine::Mode;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Inner {
    failsafe_total: AtomicU64,
    publish_failures_total: AtomicU64,
    control_cycles_total: AtomicU64,
    burner_on: AtomicBool,
    switch_water: AtomicBool,
    sensors_ready: AtomicBool,
    last_mode: AtomicU8,
}

/// Cheap to clone; every clone updates the same counters.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<Inner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub failsafe_total: u64,
    pub publish_failures_total: u64,
    pub control_cycles_total: u64,
    pub burner_on: bool,
    pub switch_water: bool,
    pub sensors_ready: bool,
    pub last_mode: Option<Mode>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_failsafe(&self) {
        self.inner.failsafe_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_publish_failures(&self) {
        self.inner.publish_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cycles(&self) {
        self.inner.control_cycles_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_burner(&self, on: bool) {
        self.inner.burner_on.store(on, Ordering::Relaxed);
    }

    pub fn set_switch(&self, water: bool) {
        self.inner.switch_water.store(water, Ordering::Relaxed);
    }

    pub fn mark_sensors_ready(&self) {
        self.inner.sensors_ready.store(true, Ordering::Relaxed);
    }

    pub fn record_mode(&self, mode: Mode) {
        self.inner.last_mode.store(mode.code(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            failsafe_total: self.inner.failsafe_total.load(Ordering::Relaxed),
            publish_failures_total: self.inner.publish_failures_total.load(Ordering::Relaxed),
            control_cycles_total: self.inner.control_cycles_total.load(Ordering::Relaxed),
            burner_on: self.inner.burner_on.load(Ordering::Relaxed),
            switch_water: self.inner.switch_water.load(Ordering::Relaxed),
            sensors_ready: self.inner.sensors_ready.load(Ordering::Relaxed),
            last_mode: Mode::from_code(self.inner.last_mode.load(Ordering::Relaxed)),
        }
    }

    /// Text exposition format 0.0.4.
    pub fn to_prometheus_text(&self) -> String {
        let s = self.snapshot();
        let mut out = String::with_capacity(1024);

        let rows: [(&str, &str, &str, u64); 6] = [
            ("heater_failsafe_total", "counter", "Increase when failsafe system kicked in", s.failsafe_total),
            ("heater_publish_failures_total", "counter", "Actuator commands rejected by the bus", s.publish_failures_total),
            ("heater_control_cycles_total", "counter", "Completed decision cycles", s.control_cycles_total),
            ("heater_burner_mode_binary", "gauge", "Commanded state for heater burner", u64::from(s.burner_on)),
            ("heater_actuator_mode_binary", "gauge", "Commanded state for heater actuator (1 = water)", u64::from(s.switch_water)),
            ("heater_sensors_ready", "gauge", "1 once every sensor has reported", u64::from(s.sensors_ready)),
        ];

        for (name, kind, help, value) in rows {
            // writing into a String cannot fail
            let _ = write!(out, "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n");
        }
        out
    }
}
