use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hubd::commands::{self, AppCallbacks, AppState};
use hubd::config::{
    DispatcherConfig, HubConfig, DEFAULT_DELIMITER, DEFAULT_HOST, DEFAULT_MAX_CLIENTS,
    DEFAULT_MAX_PENDING, DEFAULT_PORT,
};
use hubd::{Dispatcher, Hub};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "hubd", version, author)]
/// A multi-client command server for a small single-board home-automation hub.
struct HubdCli {
    /// Address to bind the command server to.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    /// Port to bind the command server to.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Maximum number of simultaneously connected clients.
    #[arg(long, default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,
    /// Listen backlog passed to the underlying socket.
    #[arg(long, default_value_t = DEFAULT_MAX_PENDING)]
    max_pending: u32,
    /// Token delimiter used by the command dispatcher.
    #[arg(long, default_value = DEFAULT_DELIMITER)]
    delimiter: String,
    /// Use a canned host-stats backend instead of reading /proc, for
    /// running the daemon deterministically with no host dependency.
    #[arg(long)]
    simulated_hardware: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "hubd exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = HubdCli::parse();

    let hub_config = HubConfig::new(cli.host, cli.port, cli.max_clients, cli.max_pending)
        .context("invalid server configuration")?;
    let dispatcher_config =
        DispatcherConfig::new(cli.delimiter).context("invalid dispatcher configuration")?;

    let dispatcher = Arc::new(Dispatcher::new(&dispatcher_config).context("failed to build dispatcher")?);

    let state = Arc::new(build_app_state(cli.simulated_hardware));
    commands::register_all(&dispatcher, state).context("failed to register commands")?;

    let callbacks = Arc::new(AppCallbacks::new(Arc::clone(&dispatcher)));
    let hub = Hub::init(hub_config, dispatcher, callbacks).context("failed to initialize hub")?;

    hub.run().await.context("failed to start hub")?;
    info!("hubd is running, press ctrl-c to shut down");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("shutdown signal received, draining connections");
    hub.shutdown().await.context("failed to shut down hub")?;
    hub.deinit().await.context("failed to deinitialize hub")?;

    Ok(())
}

/// No real I2C/SPI bus or GPIO character device is attached to this
/// host, so the GPIO seam is always backed by a simulated
/// implementation. `--simulated-hardware` additionally swaps the
/// sensor seam from a `BoundSensor` talking to a seeded
/// `SimulatedTransport` (still canned, but exercising the register-read
/// path) to canned `SimulatedSensor` readings, and host stats from
/// `/proc` to a canned backend, for running the whole daemon
/// deterministically (e.g. in CI) with no dependency on a transport or
/// `/proc` at all.
fn build_app_state(simulated_hardware: bool) -> AppState {
    let sensor: Arc<dyn hubd::hub::SensorDriver> = if simulated_hardware {
        Arc::new(hubd::hub::sensor::SimulatedSensor::default())
    } else {
        let transport = Arc::new(hubd::hub::transport::SimulatedTransport::new());
        transport.seed(DEVICE_ADDR, 0x00, 0x42); // REG_ID, matches BoundSensor::EXPECTED_ID
        Arc::new(hubd::hub::sensor::BoundSensor::new(transport, DEVICE_ADDR))
    };

    AppState {
        sensor,
        gpio: Arc::new(hubd::hub::gpio::SimulatedGpio::new()),
        stats: if simulated_hardware {
            Arc::new(hubd::hub::stats::SimulatedHostStats::default())
        } else {
            Arc::new(hubd::hub::stats::LinuxHostStats)
        },
    }
}

const DEVICE_ADDR: u8 = 0x76;
