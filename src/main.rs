use std::path::PathBuf;
use log::{error, info};

use rusted_amc13::config::Config;
use rusted_amc13::process::process_file;

fn main() {
    //Setup logging
    if let Err(e) = simplelog::TermLogger::init(simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto)
    {
        eprintln!("Could not start the logger: {}", e);
        return;
    }

    info!("Starting up rusted amc13...");

    let config_path: PathBuf = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            error!("No configuration given! Usage: rusted_amc13 <config.yaml>");
            return;
        }
    };

    let config = match Config::read_config_file(&config_path) {
        Ok(conf) => conf,
        Err(e) => {
            error!("Config error at startup: {} Shutting down.", e);
            return;
        }
    };

    match process_file(&config) {
        Ok(summary) => info!("Processor complete. Valid: {} Rejected: {} Boards: {} Payload bytes: {}",
            summary.events_valid, summary.events_rejected, summary.boards, summary.payload_bytes),
        Err(e) => error!("Processor ran into an error: {} Shutting down.", e)
    }
}
