//! Board server commands: `taskboard serve` and `taskboard init`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use taskboard::server::{ServerConfig, db::BoardDb, start_server};

pub async fn cmd_serve(config: ServerConfig) -> Result<()> {
    info!(
        addr = %config.addr(),
        db_path = %config.db_path.display(),
        "starting taskboard server"
    );
    start_server(config).await
}

/// Create (or migrate) the database and exit.
pub fn cmd_init(db_path: &Path) -> Result<()> {
    BoardDb::new(db_path)
        .with_context(|| format!("Failed to initialize database at {}", db_path.display()))?;
    println!("Board database initialized at {}", db_path.display());
    Ok(())
}
