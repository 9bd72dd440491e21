//! CareList auth service binary
//!
//! ```sh
//! # Run with default config (~/.config/carelist-auth/config.toml)
//! carelist-auth
//!
//! # Custom config path
//! carelist-auth --config /etc/carelist-auth/config.toml
//!
//! # Override the API port
//! carelist-auth --api-port 8080
//!
//! # Validate config without starting
//! carelist-auth --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use carelist_auth::config::AppConfig;
use carelist_auth::server::{init_tracing, ServerHandle, ServerOptions};

/// CareList hospital management: credential & session authority.
#[derive(Parser, Debug)]
#[command(
    name = "carelist-auth",
    version,
    about = "Registration, OTP login and session tokens for CareList",
    long_about = "CareList auth service: REST API for account registration, \
                  two-step password + emailed OTP login, JWT sessions and role checks.\n\n\
                  Default config: ~/.config/carelist-auth/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "CARELIST_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Skip creating the default admin user.
    #[arg(long)]
    no_admin: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .unwrap_or_else(carelist_auth::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);

    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            if cli.check {
                return Err(e.into());
            }
            error!("Using default configuration.");
        }
    }

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.api_port {
        info!("CLI override: api_port = {}", port);
        config.server.api_port = port;
    }
    if let Some(ref level) = cli.log_level {
        info!("CLI override: log_level = {}", level);
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        config.validate()?;
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}:{}", config.server.api_host, config.server.api_port);
        println!("   Environment : {}", config.server.environment);
        println!("   Database    : {}", config.database.connection_url());
        let email_mode = match config.email.relay_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ if config.server.is_development() => "log only",
            _ => "disabled (no relay configured)",
        };
        println!("   Email       : {}", email_mode);
        println!("   Log level   : {}", config.logging.level);
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        create_default_admin: !cli.no_admin,
    })
    .await?;

    handle.install_signal_handler();

    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
