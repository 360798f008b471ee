mod analysis;
mod app;
mod cli;
mod config;
mod http;
mod issues;
mod log;
mod report;

use std::process;

use clap::Parser;

use crate::http::UreqTransport;
use crate::log::{ConsoleLogger, Logger};

fn main() {
    let logger = ConsoleLogger;

    let config = match cli::Cli::parse().into_config() {
        Ok(config) => config,
        Err(error) => {
            logger.err(&format!("Failed because error: {error}"));
            process::exit(app::EXIT_FAILURE);
        }
    };

    let transport = UreqTransport::new(&config.credentials);

    match app::run(&config, &transport, &logger) {
        Ok(0) => {}
        Ok(code) => {
            logger.err(&format!("Failed: exiting with code {code}"));
            process::exit(code);
        }
        Err(error) => {
            log_error_chain(&logger, &error);
            logger.err(&format!("Failed: exiting with code {}", app::EXIT_FAILURE));
            process::exit(app::EXIT_FAILURE);
        }
    }
}

/// Prints the error and every cause beneath it.
fn log_error_chain(logger: &dyn Logger, error: &dyn std::error::Error) {
    logger.err(&format!("Failed because error: {error}"));
    let mut source = error.source();
    while let Some(cause) = source {
        logger.err(&format!("Caused by: {cause}"));
        source = cause.source();
    }
}
