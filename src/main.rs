use anyhow::{Context, Result};
use std::{collections::HashMap, fs, path::Path};
use tracing_subscriber::EnvFilter;

use szas_backend::api::{build_router, AppState};
use szas_backend::{AnalysisConfig, NameDirectory, PitchTable, RawPitchRow};

fn load_pitch_table(path: &str) -> Result<PitchTable> {
    let txt = fs::read_to_string(Path::new(path))
        .with_context(|| format!("failed to read pitch table at {}", path))?;
    let rows: Vec<RawPitchRow> =
        serde_json::from_str(&txt).with_context(|| format!("failed to parse pitch table {}", path))?;
    Ok(PitchTable::from_raw(&rows))
}

fn load_names(path: &str) -> Result<NameDirectory> {
    let txt = fs::read_to_string(Path::new(path))
        .with_context(|| format!("failed to read player names at {}", path))?;
    let names: HashMap<u32, String> =
        serde_json::from_str(&txt).with_context(|| "failed to parse player names")?;
    Ok(NameDirectory::from_map(names))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let table_path = std::env::var("PITCH_TABLE_PATH").context("PITCH_TABLE_PATH not set")?;
    let port: u16 = std::env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(5000);

    let config = match std::env::var("SZAS_CONFIG") {
        Ok(path) => AnalysisConfig::load(&path)?,
        Err(_) => AnalysisConfig::default(),
    };
    let names = match std::env::var("PLAYER_NAMES_PATH") {
        Ok(path) => load_names(&path)?,
        Err(_) => NameDirectory::new(),
    };
    let table = load_pitch_table(&table_path)?;

    let summary = table.summary();
    tracing::info!(
        "loaded {} pitches ({} takes, {} swings, {} unclassified) from {}",
        summary.total_pitches,
        summary.takes,
        summary.swings,
        summary.unclassified,
        table_path
    );
    tracing::info!("{} player names available", names.len());

    let app = build_router(AppState::new(config, table, names));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
