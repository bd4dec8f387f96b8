//! CLI Entry Point for picam_acquire
//!
//! Configures the camera, reports sensor temperature, then acquires the
//! requested readouts into `<image_prefix>_<n>.raw` and
//! `<parameter_prefix>_<n>.txt` files.
//!
//! # Usage
//!
//! ```bash
//! picam_acquire 50 3 0 2 0 my_sample exposure_params lock
//! ```
//!
//! Ctrl-C stops the acquisition after the current poll returns, or before
//! the stream starts if pressed during configuration. A second Ctrl-C exits
//! immediately.

use anyhow::{Context, Result};
use clap::Parser;
use daq_core::acquisition::PollTimeout;
use daq_driver_picam::CameraSession;
use picam_daq::cli::Cli;
use picam_daq::config::AcquireConfig;
use picam_daq::{logging, run};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AcquireConfig::load_from(path),
        None => AcquireConfig::load(),
    }
    .context("Failed to load configuration")?;
    if let Some(level) = &cli.log_level {
        config.application.log_level = level.clone();
    }
    logging::init_from_config(&config).map_err(anyhow::Error::msg)?;

    if let Err(err) = cli.apply(&mut config) {
        tracing::error!("{}", err);
        std::process::exit(-1);
    }
    config.validate().map_err(anyhow::Error::msg)?;

    let poll_timeout = PollTimeout::from_millis(config.acquisition.poll_timeout_ms);
    let session = CameraSession::open(run::open_camera(), poll_timeout);

    let stop = session.stop_handle();
    tokio::spawn(async move {
        let mut presses = 0u32;
        while tokio::signal::ctrl_c().await.is_ok() {
            presses += 1;
            if presses == 1 {
                tracing::warn!("Ctrl-C received, stopping after the current poll");
                stop.request_stop();
            } else {
                tracing::error!("Second Ctrl-C received, exiting without waiting for the camera");
                std::process::exit(130);
            }
        }
    });

    let report = tokio::task::spawn_blocking(move || run::run_session(session, &config))
        .await
        .context("Acquisition task panicked")??;

    tracing::info!(
        camera = %report.camera,
        delivered = report.summary.delivered,
        polls = report.summary.polls,
        timeouts = report.summary.timeouts,
        "Done"
    );
    Ok(())
}
