#![allow(non_snake_case)]

mod cli;
mod clients;
mod config;
mod error;
mod handlers;
mod models;
mod runtime;
mod service;

use std::env;

use crate::config::{AppConfig, PlannerConfig};

const DEFAULT_RUN_MODE: &str = "api";

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };
    let run_mode = config
        .get("RUN_MODE")
        .unwrap_or(DEFAULT_RUN_MODE.to_string());
    let planner_config = PlannerConfig::from_app_config(&config);

    if run_mode == "api" {
        runtime::run_api(planner_config).await;
    } else if run_mode == "cli" {
        cli::cli(planner_config).await;
    } else {
        println!("Invalid run mode {}", run_mode);
    }
}
