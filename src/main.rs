use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use villa_booking::adapters::memory_store::{MemoryStore, SeedData};
use villa_booking::adapters::postgrest::PostgrestStore;
use villa_booking::config::load_config;
use villa_booking::config::types::{StoreBackend, StoreConfig};
use villa_booking::mcp::server::VillaMcpServer;
use villa_booking::ports::booking_store::BookingStore;

fn find_config_path() -> PathBuf {
    let candidates = [PathBuf::from("config.yaml"), exe_dir().join("config.yaml")];

    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn build_store(config: &StoreConfig) -> Result<Arc<dyn BookingStore>> {
    match config.backend {
        StoreBackend::Postgrest => {
            tracing::info!(base_url = %config.base_url, "Using PostgREST store");
            if config.api_key.is_none() {
                tracing::warn!("No store API key configured; requests are anonymous");
            }
            let store = PostgrestStore::new(config).context("failed to build PostgREST store")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            let store = match &config.seed_path {
                Some(path) => {
                    let seed = SeedData::load(path)
                        .with_context(|| format!("failed to load seed data from {}", path.display()))?;
                    tracing::info!(
                        path = %path.display(),
                        villas = seed.villas.len(),
                        days = seed.calendar_days.len(),
                        "Using in-memory store with seed data"
                    );
                    MemoryStore::from_seed(seed)?
                }
                None => {
                    tracing::info!("Using empty in-memory store");
                    MemoryStore::new()
                }
            };
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries MCP JSON-RPC.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting villa-booking server");

    let config_path = find_config_path();
    let config = load_config(&config_path)?;

    let store = build_store(&config.store)?;
    let server = VillaMcpServer::new(store, config.pricing);

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
