/**
 * HEATER KERNEL - boiler thermostat entry point
 *
 * ROLE : wires config, MQTT, actuators, metrics and the decision engine.
 * Every startup step is fatal on failure: the control loop never starts
 * without a valid config, a live broker and both actuators reset to off.
 *
 * ORDER : config -> store -> MQTT connect/subscribe -> actuator reset
 *         -> metrics endpoint -> startup gate -> control loop.
 */

use anyhow::{Context, Result};
use clap::Parser;
use heater_kernel::config::{load_config, parse_broker, Args};
use heater_kernel::http::{spawn_http_server, AppState};
use heater_kernel::{mqtt, Actuators, Engine, MeasurementStore, Metrics};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("heater_kernel=info")),
        )
        .init();

    let args = Args::parse();
    let broker = parse_broker(&args.broker)?;

    info!("Reading configuration from {}", args.config.display());
    let cfg = load_config(&args.config)
        .await
        .with_context(|| format!("cannot load {}", args.config.display()))?;
    info!("Reading following config from config file: {cfg:?}");

    let store = MeasurementStore::from_config(&cfg).shared();
    let metrics = Metrics::new();

    let bus = mqtt::connect(&broker, &args.client_id, cfg.subscriptions(), store.clone())
        .await
        .with_context(|| format!("cannot connect to MQTT broker {}", args.broker))?;

    let mut actuators = Actuators::new(bus, &cfg.actuators, metrics.clone());
    actuators
        .reset()
        .await
        .context("Cannot reset heater and switch. Exiting.")?;

    spawn_http_server(args.metrics_addr, AppState { store: store.clone(), metrics: metrics.clone() })
        .await
        .with_context(|| format!("cannot bind metrics endpoint on {}", args.metrics_addr))?;

    let mut engine = Engine::new(store, actuators, metrics, cfg.control.clone());
    tokio::select! {
        _ = engine.run() => {}
        _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
    }
    Ok(())
}
