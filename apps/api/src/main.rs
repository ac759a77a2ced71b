//! Repohero API binary
//!
//! Executes one JSON query plan against the Repohero graph and prints the
//! JSON result.
//!
//! ```text
//! repohero-api [PLAN_FILE]
//! ```
//!
//! The plan is read from `PLAN_FILE`, or from stdin when no file is given.
//! `SEED_PATH` points at a JSON catalog; without it a demo catalog is used.

use std::sync::Arc;

use anyhow::{Context, Result};
use graph_engine::QueryPlan;
use repohero_api::config::Config;
use repohero_api::{build_engine, ApiError, InMemoryStore, Seed, TokenIssuer};
use repohero_shared_config::CommonConfig;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Reads .env first when present, so it can also set the log filter
    let common = CommonConfig::load().context("Failed to load config")?;

    // Logs go to stderr so stdout carries only the result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&common.log_level)
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_common(common)?;
    tracing::info!(environment = %config.environment(), "Starting Repohero API");

    let seed = match &config.seed_path {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read seed file {}", path))?;
            Seed::from_json(&json)?
        }
        None => Seed::demo(),
    };
    let store = Arc::new(InMemoryStore::from_seed(seed)?);
    let issuer = Arc::new(TokenIssuer::from_config(&config));
    let engine = build_engine(store, issuer, config.engine().clone())?;

    let plan = read_plan(std::env::args().nth(1)).await.map_err(|e| {
        e.log();
        e
    })?;

    let ctx = engine.context();
    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling execution");
            token.cancel();
        }
    });

    let result = match engine.execute_in(&ctx, &plan).await {
        Ok(result) => result,
        Err(e) => {
            let error = ApiError::from(e);
            error.log();
            println!("{}", serde_json::to_string_pretty(&error.to_response())?);
            return Err(error.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn read_plan(path: Option<String>) -> Result<QueryPlan, ApiError> {
    let json = match path {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ApiError::InvalidPlan(format!("cannot read {}: {}", path, e)))?,
        None => {
            let mut json = String::new();
            tokio::io::stdin()
                .read_to_string(&mut json)
                .await
                .map_err(|e| ApiError::InvalidPlan(format!("cannot read stdin: {}", e)))?;
            json
        }
    };
    serde_json::from_str(&json).map_err(|e| ApiError::InvalidPlan(e.to_string()))
}
