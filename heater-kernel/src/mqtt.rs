//! MQTT bus adapter (rumqttc).
//!
//! Inbound: every publish on a subscribed topic is routed into the
//! measurement store. Outbound: [`MqttBus`] implements [`Publisher`] for the
//! actuator state machine.

use crate::bus::{BusError, Publisher};
use crate::config::BrokerAddr;
use crate::models::PointId;
use crate::store::SharedStore;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::{task, time};
use tracing::{debug, error, info, warn};

const KEEP_ALIVE: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Outbound handle. Publishes are refused while the listener has no live
/// broker session, and never wait on a full request queue.
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl MqttBus {
    fn new(client: AsyncClient, connected: Arc<AtomicBool>) -> Self {
        Self { client, connected }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Publisher for MqttBus {
    async fn publish(&self, address: &str, payload: &str) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected { address: address.to_string() });
        }
        self.client
            .try_publish(address, QoS::AtMostOnce, false, payload.as_bytes().to_vec())?;
        Ok(())
    }
}

/// Connects, waits for the broker's CONNACK, starts the listener task and
/// subscribes to `topics`. Any failure here is a startup failure.
pub async fn connect(
    broker: &BrokerAddr,
    client_id: &str,
    topics: Vec<String>,
    store: SharedStore,
) -> Result<MqttBus, BusError> {
    let mut opts = MqttOptions::new(client_id, &broker.host, broker.port);
    opts.set_keep_alive(KEEP_ALIVE);
    let (client, mut eventloop) = AsyncClient::new(opts, 10);

    time::timeout(CONNECT_TIMEOUT, wait_for_connack(&mut eventloop))
        .await
        .map_err(|_| BusError::ConnectTimeout(CONNECT_TIMEOUT))??;
    info!("Connected to {}:{} as {}", broker.host, broker.port, client_id);

    let connected = Arc::new(AtomicBool::new(true));
    spawn_mqtt_listener(client.clone(), eventloop, topics.clone(), store, connected.clone());

    for topic in &topics {
        client.subscribe(topic.as_str(), QoS::AtMostOnce).await?;
    }
    info!(count = topics.len(), "subscribed, waiting for messages");

    Ok(MqttBus::new(client, connected))
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), BusError> {
    loop {
        if let Event::Incoming(Incoming::ConnAck(_)) = eventloop.poll().await? {
            return Ok(());
        }
    }
}

/// Inbound handler: one message into the store.
pub fn route_incoming(store: &SharedStore, topic: &str, payload: &[u8]) -> Option<PointId> {
    let updated = store.lock().update(topic, payload);
    if let Some(point) = updated {
        debug!(%point, topic, "measurement updated");
    }
    updated
}

fn spawn_mqtt_listener(
    client: AsyncClient,
    mut eventloop: EventLoop,
    topics: Vec<String>,
    store: SharedStore,
    connected: Arc<AtomicBool>,
) {
    task::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(p))) => {
                    route_incoming(&store, &p.topic, &p.payload);
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    connected.store(true, Ordering::Release);
                    // clean session: subscriptions are gone after a reconnect
                    info!("MQTT reconnected, restoring {} subscriptions", topics.len());
                    for topic in &topics {
                        if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                            error!("resubscribe to {topic} failed: {e}");
                        }
                    }
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    connected.store(false, Ordering::Release);
                    warn!("MQTT broker sent disconnect");
                }
                Ok(_) => {}
                Err(e) => {
                    connected.store(false, Ordering::Release);
                    warn!("MQTT connection error: {e}");
                    time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    });
}
