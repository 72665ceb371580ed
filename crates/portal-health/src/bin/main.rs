//! Portal integration health entry point
//!
//! Serves the monitoring API or runs one-off probes from the command line.

use clap::{Parser, Subcommand};
use colored::Colorize;
use portal_health::config::load_monitors;
use portal_health::contracts::*;
use portal_health::engine::HealthProber;
use portal_health::handler::{create_router, AppState, SERVICE_VERSION};
use portal_health::scheduler::ProbeScheduler;
use portal_health::{MonitoringService, ServiceConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "portal-health")]
#[command(about = "Integration health monitoring for client HR, payroll and automation APIs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the monitoring API
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Probe every registered monitor on this interval
        #[arg(long)]
        schedule_interval_secs: Option<u64>,

        /// Monitors to register at startup (JSON/YAML)
        #[arg(short, long)]
        monitors: Option<String>,
    },

    /// Probe one integration
    Check {
        /// Service family: hibob, keypay or workato
        #[arg(short, long)]
        family: ServiceFamily,

        /// Endpoint override
        #[arg(short, long)]
        endpoint: Option<String>,

        /// API token (HiBob, Workato)
        #[arg(long, env = "PORTAL_HEALTH_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// API key (KeyPay)
        #[arg(long, env = "PORTAL_HEALTH_KEY", hide_env_values = true)]
        key: Option<String>,

        /// Account email (Workato)
        #[arg(long)]
        email: Option<String>,

        /// Workato recipe id to report on; repeatable
        #[arg(short, long = "recipe")]
        recipes: Vec<String>,
    },

    /// Probe every monitor in a file
    Probe {
        /// Path to monitors file (JSON/YAML)
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            schedule_interval_secs,
            monitors,
        } => {
            let mut config = ServiceConfig::from_env();
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(secs) = schedule_interval_secs.filter(|s| *s > 0) {
                config.schedule_interval_secs = Some(secs);
            }
            serve(config, monitors).await?;
        }

        Commands::Check {
            family,
            endpoint,
            token,
            key,
            email,
            recipes,
        } => {
            let mut credentials = Credentials::new();
            if let Some(token) = token {
                credentials = credentials.with("apiToken", token);
            }
            if let Some(key) = key {
                credentials = credentials.with("apiKey", key);
            }
            if let Some(email) = email {
                credentials = credentials.with("email", email);
            }

            let mut target = ProbeTarget::new(family, credentials).with_recipes(recipes);
            target.endpoint = endpoint;

            let result = HealthProber::new().probe(&target).await;
            eprintln!("{} {}", family.display_name(), paint(result.status));
            println!("{}", serde_json::to_string_pretty(&result)?);

            if result.status == HealthStatus::Down {
                std::process::exit(1);
            }
        }

        Commands::Probe { file } => {
            let monitors = load_monitors(&file)?;
            let prober = HealthProber::new();

            let results = futures::future::join_all(
                monitors.iter().map(|monitor| prober.probe(&monitor.target)),
            )
            .await;

            let report: Vec<_> = monitors
                .iter()
                .zip(&results)
                .map(|(monitor, result)| {
                    serde_json::json!({
                        "client_id": monitor.client_id,
                        "name": monitor.name,
                        "service_family": monitor.target.service_family,
                        "result": result,
                    })
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&report)?);

            if results.iter().any(|r| r.status == HealthStatus::Down) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn serve(config: ServiceConfig, monitors: Option<String>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let service = Arc::new(MonitoringService::new(&config)?);

    if let Some(path) = monitors {
        for monitor in load_monitors(&path)? {
            service.register(monitor).await?;
        }
        tracing::info!(path = %path, "Loaded monitors from file");
    }

    let scheduler = config.schedule_interval().map(|every| {
        ProbeScheduler::new(service.clone(), every, config.max_concurrent_probes).spawn()
    });

    let router = create_router(Arc::new(AppState::new(service)));

    tracing::info!(
        version = SERVICE_VERSION,
        scheduled = scheduler.is_some(),
        "Starting portal-health on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    if let Some(scheduler) = scheduler {
        scheduler.stop().await;
    }
    Ok(())
}

fn paint(status: HealthStatus) -> colored::ColoredString {
    match status {
        HealthStatus::Healthy => status.as_str().green(),
        HealthStatus::Degraded => status.as_str().yellow(),
        HealthStatus::Down => status.as_str().red(),
        HealthStatus::Unknown => status.as_str().dimmed(),
    }
}
