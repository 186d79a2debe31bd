//! Outbound half of the bus adapter.
//!
//! The actuator state machine only ever needs `publish`; keeping it behind a
//! trait lets the engine run against the real MQTT client or a recording mock.

use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("mqtt client rejected request: {0}")]
    Client(#[from] rumqttc::ClientError),
    #[error("mqtt connection failed: {0}")]
    Connection(#[from] rumqttc::ConnectionError),
    #[error("broker did not acknowledge connection within {0:?}")]
    ConnectTimeout(std::time::Duration),
    #[error("not connected to the broker, {address} not published")]
    NotConnected { address: String },
    #[error("publish to {address} rejected: {reason}")]
    Rejected { address: String, reason: String },
}

pub trait Publisher: Send + Sync {
    /// Hands one payload to the bus. `Ok` means the bus accepted the message.
    fn publish(&self, address: &str, payload: &str) -> impl Future<Output = Result<(), BusError>> + Send;
}
