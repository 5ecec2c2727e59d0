//! VoxPilot entrypoint so capture, submission, and the result view run as one client.
//!
//! Records a voice command from the microphone (or takes a prepared audio file),
//! posts it to the intent server, and shows the transcription, intent, and
//! confidence in a small terminal UI.
//!
//! # Architecture
//!
//! - UI thread: draws the panels and routes key presses
//! - Record worker: owns the live capture until the take ends
//! - Submit worker: posts one payload and blocks on the server reply

mod app;
mod cli_utils;
mod help;
mod intent_styles;
mod theme;
mod ui;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;

use voxpilot::audio::Recorder;
use voxpilot::client::PredictClient;
use voxpilot::config::AppConfig;
use voxpilot::{init_logging, init_tracing, log_debug, log_file_path};

use crate::app::App;
use crate::cli_utils::list_input_devices;
use crate::intent_styles::IntentStyles;

fn main() -> Result<()> {
    let mut config = AppConfig::parse();

    if config.list_input_devices {
        list_input_devices()?;
        return Ok(());
    }

    config.validate()?;
    init_logging(&config);
    init_tracing(&config);
    let log_path = log_file_path();
    log_debug("=== VoxPilot Started ===");
    log_debug(&format!("Log file: {log_path:?}"));
    log_debug(&format!("Predict endpoint: {}", config.predict_url()));

    // A missing microphone is not fatal; file submissions still work.
    let recorder = match Recorder::new(config.input_device.as_deref()) {
        Ok(recorder) => {
            log_debug(&format!("Input device: {}", recorder.device_name()));
            Some(Arc::new(Mutex::new(recorder)))
        }
        Err(err) => {
            log_debug(&format!("No input device available: {err:#}"));
            None
        }
    };

    let client = PredictClient::new(config.predict_url())?;
    let styles = IntentStyles::load(&config);
    if let Some(path) = styles.source_path() {
        log_debug(&format!(
            "intent styles path: {} (loaded {})",
            path.display(),
            styles.len()
        ));
    }

    let mut app = App::new(config, recorder, client, styles);
    let result = ui::run_app(&mut app);

    match &result {
        Ok(()) => log_debug("=== VoxPilot Exiting ==="),
        Err(err) => log_debug(&format!("=== VoxPilot Exiting (error: {err:#}) ===")),
    }
    result
}
