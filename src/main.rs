use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use taskboard::board::{Identity, SyncConfig};
use taskboard::config::TaskboardConfig;
use taskboard::logging;
use taskboard::models::ProjectId;

mod cmd;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Kanban project tracker with a reconciling board client")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Log filter when RUST_LOG is unset (e.g. "info", "taskboard=debug")
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to taskboard.toml (defaults to ./taskboard.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the board API server
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// SQLite database path
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Development mode (permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// Create or migrate the database, then exit
    Init {
        /// SQLite database path
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Follow a project's board on a running server
    Watch {
        /// Project to follow
        project_id: ProjectId,

        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:3141")]
        url: String,

        /// User id forwarded to the server
        #[arg(long, env = "TASKBOARD_USER")]
        user: String,

        /// User email forwarded to the server
        #[arg(long)]
        email: Option<String>,
    },
}

/// Apply command-line flags on top of file and environment settings.
fn apply_cli_overrides(cli: &Cli, config: &mut TaskboardConfig) {
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.log_json {
        config.logging.json = true;
    }
    match &cli.command {
        Commands::Serve {
            port,
            host,
            db_path,
            dev,
        } => {
            if let Some(port) = port {
                config.server.port = *port;
            }
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(db_path) = db_path {
                config.server.db_path = db_path.clone();
            }
            if *dev {
                config.server.dev_mode = true;
            }
        }
        Commands::Init { db_path } => {
            if let Some(db_path) = db_path {
                config.server.db_path = db_path.clone();
            }
        }
        Commands::Watch { .. } => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = TaskboardConfig::load_or_default(cli.config.as_deref())?;
    config.apply_env()?;
    apply_cli_overrides(&cli, &mut config);

    let level = logging::effective_level(cli.verbose, &config.logging.level);
    logging::init_subscriber(&level, config.logging.json);
    config.ensure_valid()?;

    match cli.command {
        Commands::Serve { .. } => cmd::cmd_serve(config.server).await?,
        Commands::Init { .. } => cmd::cmd_init(&config.server.db_path)?,
        Commands::Watch {
            project_id,
            url,
            user,
            email,
        } => {
            let identity = Identity {
                user_id: user,
                email,
            };
            cmd::cmd_watch(&url, identity, project_id, SyncConfig::from(&config.sync)).await?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::parse_from([
            "taskboard",
            "--log-level",
            "warn",
            "serve",
            "--port",
            "8080",
            "--db-path",
            "/tmp/x.db",
            "--dev",
        ]);
        let mut config = TaskboardConfig::default();
        config.server.port = 9000;
        apply_cli_overrides(&cli, &mut config);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.db_path, PathBuf::from("/tmp/x.db"));
        assert!(config.server.dev_mode);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_unset_flags_keep_config() {
        let cli = Cli::parse_from(["taskboard", "serve"]);
        let mut config = TaskboardConfig::default();
        config.server.port = 9000;
        apply_cli_overrides(&cli, &mut config);
        assert_eq!(config.server.port, 9000);
        assert!(!config.server.dev_mode);
    }

    #[test]
    fn test_watch_parses_identity() {
        let cli = Cli::parse_from([
            "taskboard",
            "watch",
            "7",
            "--user",
            "alice",
            "--email",
            "a@example.com",
        ]);
        match cli.command {
            Commands::Watch {
                project_id,
                url,
                user,
                email,
            } => {
                assert_eq!(project_id, 7);
                assert_eq!(url, "http://127.0.0.1:3141");
                assert_eq!(user, "alice");
                assert_eq!(email.as_deref(), Some("a@example.com"));
            }
            _ => panic!("Expected watch"),
        }
    }
}
