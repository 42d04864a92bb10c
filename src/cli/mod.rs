//! CLI module for the IAM key core
//!
//! Provides subcommands that drive the library in-process:
//! - `demo`: runs the end-to-end key lifecycle scenario
//! - `replay`: executes a JSON script of operations

pub mod demo;
pub mod replay;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::infrastructure::observability::{PrometheusMetrics, init_metrics};

/// IAM key core - API key lifecycle, authorization and cache invalidation
#[derive(Parser)]
#[command(name = "iam-key-core")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Print recorded metrics in the Prometheus text format when done
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the end-to-end demo scenario
    Demo,

    /// Replay a JSON operation script
    Replay(replay::ReplayArgs),
}

/// Shared process setup for every subcommand
pub struct Bootstrap {
    pub config: AppConfig,
    metrics: Option<PrometheusMetrics>,
}

impl Bootstrap {
    /// Load `.env` and configuration, then initialize logging and, if asked, metrics
    pub fn init(with_metrics: bool) -> Self {
        dotenvy::dotenv().ok();

        let config = AppConfig::load().unwrap_or_default();
        logging::init_logging(&config.logging);

        let metrics = if with_metrics {
            init_metrics(&config.metrics)
        } else {
            None
        };

        Self { config, metrics }
    }

    /// Print the Prometheus rendering if metrics were requested
    pub fn finish(&self) {
        if let Some(metrics) = &self.metrics {
            print!("{}", metrics.render());
        }
    }
}

/// Write one JSON document per line to stdout
pub fn emit(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
