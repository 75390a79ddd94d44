use std::time::Duration;

use brigade_auth::service_token::SECRET_ENV;
use brigade_core::Role;
use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use brigade_server::api::{AppState, router};
use brigade_server::config::BrigadeConfig;

/// Brigade identity and notification server.
#[derive(Parser, Debug)]
#[command(name = "brigade-server", about = "HTTP server for Brigade")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "brigade.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (the default).
    Serve,
    /// Print a service token signed with the secret in BRIGADE_SA_SECRET.
    IssueToken {
        /// Service account name; the identity subject becomes `svc:<subject>`.
        #[arg(long)]
        subject: String,
        /// Kitchen the token is scoped to. Empty means unscoped.
        #[arg(long, default_value = "")]
        kitchen: String,
        /// Role granted to the token holder.
        #[arg(long, default_value = "baker")]
        role: String,
        /// Lifetime in seconds.
        #[arg(long, default_value_t = 3600)]
        ttl_seconds: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::IssueToken {
        subject,
        kitchen,
        role,
        ttl_seconds,
    }) = &cli.command
    {
        return issue_token(subject, kitchen, role, *ttl_seconds);
    }

    let (mut config, found) = BrigadeConfig::load(&cli.config)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    brigade_server::telemetry::init(&config.telemetry);

    if !found {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    let state = AppState::build(&config).await?;
    let validators = state.auth.chain().validator_names().await;
    info!(
        validators = ?validators,
        drivers = ?state.notify.driver_kinds(),
        require_auth = config.auth.require_auth,
        "brigade initialized"
    );

    let shutdown = state.shutdown.clone();
    let grace = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "brigade-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // In-flight fan-outs get `grace` to finish before they are cancelled.
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                warn!(
                    timeout_secs = grace.as_secs(),
                    "shutdown timeout exceeded, cancelling in-flight deliveries"
                );
                shutdown.cancel();
            });
        })
        .await?;

    info!("brigade-server shut down");
    Ok(())
}

fn issue_token(
    subject: &str,
    kitchen: &str,
    role: &str,
    ttl_seconds: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let secret = std::env::var(SECRET_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("{SECRET_ENV} must be set to issue tokens"))?;
    let role = Role::from_str_loose(role).ok_or_else(|| format!("unknown role {role:?}"))?;
    let ttl = TimeDelta::try_seconds(ttl_seconds)
        .filter(|ttl| *ttl > TimeDelta::zero())
        .ok_or("--ttl-seconds must be a positive number of seconds")?;

    let token = brigade_auth::generate_service_token(
        secret,
        subject,
        kitchen,
        role,
        ttl,
    )?;
    println!("{token}");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
