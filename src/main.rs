//! # roomcast
//!
//! Roomcast server binary. Wires settings, logging, metrics and the hub
//! together and starts the HTTP/WebSocket server.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use roomcast_hub::{Hub, HubConfig};
use roomcast_logging::LoggingConfig;
use roomcast_server::{JwtVerifier, RoomcastServer, ServerConfig};
use roomcast_settings::RoomcastSettings;

/// Multi-room presence and broadcast server.
#[derive(Parser, Debug)]
#[command(name = "roomcast", version, about = "Multi-room presence and broadcast server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server until interrupted.
    Serve {
        /// Settings file (defaults to `~/.roomcast/settings.json`).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind (overrides settings).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides settings, 0 for auto-assign).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print a signed token, for local testing.
    Token {
        /// Settings file (defaults to `~/.roomcast/settings.json`).
        #[arg(long)]
        config: Option<PathBuf>,

        /// User id to embed.
        #[arg(long)]
        user_id: i64,

        /// Role to embed, e.g. `host` or `participant`.
        #[arg(long, default_value = "participant")]
        role: String,
    },
}

fn load(config: Option<PathBuf>) -> Result<RoomcastSettings> {
    let path = config.unwrap_or_else(roomcast_settings::settings_path);
    roomcast_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))
}

fn verifier(settings: &RoomcastSettings) -> Result<JwtVerifier> {
    if settings.auth.jwt_secret.is_empty() {
        bail!("no JWT secret configured (set JWT_SECRET or auth.jwt_secret)");
    }
    Ok(JwtVerifier::new(
        &settings.auth.jwt_secret,
        Duration::from_secs(settings.auth.token_ttl_secs),
    ))
}

fn server_config(settings: &RoomcastSettings, host: Option<String>, port: Option<u16>) -> ServerConfig {
    let mut config = ServerConfig::from(settings);
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    config
}

fn logging_config(settings: &RoomcastSettings) -> LoggingConfig {
    LoggingConfig {
        level: settings.logging.level.clone(),
        module_levels: settings
            .logging
            .module_levels
            .iter()
            .map(|(module, level)| (module.clone(), level.clone()))
            .collect(),
        json: settings.logging.json,
    }
}

async fn serve(settings: RoomcastSettings, host: Option<String>, port: Option<u16>) -> Result<()> {
    roomcast_logging::init_logging(&logging_config(&settings))
        .context("Failed to initialize logging")?;

    let verifier = verifier(&settings)?;
    let metrics_handle =
        roomcast_server::metrics::install_recorder().context("Failed to install metrics")?;
    let hub = Hub::new(HubConfig {
        queue_capacity: settings.hub.queue_capacity,
    });

    let config = server_config(&settings, host, port);
    let server = RoomcastServer::new(config, hub, verifier, metrics_handle);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(
        queue_capacity = settings.hub.queue_capacity,
        "roomcast listening on http://{addr}"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let report = server.stop(vec![handle], None).await;
    tracing::info!(
        sessions_open = report.sessions_open,
        timed_out = report.timed_out,
        "Shutdown complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Serve { config, host, port } => serve(load(config)?, host, port).await,
        Command::Token {
            config,
            user_id,
            role,
        } => {
            let token = verifier(&load(config)?)?
                .issue(user_id, &role)
                .context("Failed to sign token")?;
            println!("{token}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_flags_parse() {
        let cli = Cli::parse_from(["roomcast", "serve", "--port", "9000"]);
        match cli.command {
            Command::Serve { config, host, port } => {
                assert!(config.is_none());
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
            }
            Command::Token { .. } => panic!("expected serve"),
        }
    }

    #[test]
    fn token_role_defaults_to_participant() {
        let cli = Cli::parse_from(["roomcast", "token", "--user-id", "7"]);
        match cli.command {
            Command::Token { user_id, role, .. } => {
                assert_eq!(user_id, 7);
                assert_eq!(role, "participant");
            }
            Command::Serve { .. } => panic!("expected token"),
        }
    }

    #[test]
    fn cli_flags_override_settings() {
        let settings = RoomcastSettings::default();
        let config = server_config(&settings, Some("127.0.0.1".into()), Some(0));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 0);
        assert_eq!(config.max_message_size, settings.server.max_message_size);

        let config = server_config(&settings, None, None);
        assert_eq!(config.host, settings.server.host);
        assert_eq!(config.port, settings.server.port);
    }

    #[test]
    fn logging_config_carries_module_levels() {
        let mut settings = RoomcastSettings::default();
        settings.logging.level = "warn".into();
        let _ = settings
            .logging
            .module_levels
            .insert("roomcast_hub".into(), "debug".into());

        let config = logging_config(&settings);
        assert_eq!(
            config.module_levels,
            vec![("roomcast_hub".to_string(), "debug".to_string())]
        );
        assert_eq!(config.directives(), "warn,roomcast_hub=debug");
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(verifier(&RoomcastSettings::default()).is_err());

        let mut settings = RoomcastSettings::default();
        settings.auth.jwt_secret = "s3cret".into();
        let token = verifier(&settings).unwrap().issue(1, "host").unwrap();
        assert!(!token.is_empty());
    }
}
