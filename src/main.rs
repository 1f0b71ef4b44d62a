//! Endpoint balancer driver.
//!
//! Balances TCP connection attempts over a list of `host:port` endpoints,
//! optionally with active health checks, and prints per-endpoint statistics.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::TcpStream;
use tokio::time::timeout;

use endpoint_balancer::config::loader::load_config;
use endpoint_balancer::observability::{logging, metrics};
use endpoint_balancer::{BalancerConfig, BalancerError, LoadBalancer, ProbeError};

#[derive(Parser)]
#[command(name = "endpoint-balancer")]
#[command(about = "Client-side load balancing over TCP endpoints", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file and print it
    Check,
    /// Open connections to the endpoints through the balancer
    Run {
        /// Endpoint addresses, indexed in the order given.
        #[arg(required = true)]
        endpoints: Vec<SocketAddr>,

        /// Number of logical requests to issue.
        #[arg(short, long, default_value_t = 10)]
        requests: usize,

        /// Connect timeout for a single attempt or probe, in milliseconds.
        #[arg(long, default_value_t = 1000)]
        connect_timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BalancerConfig::default(),
    };

    match cli.command {
        Commands::Check => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Run {
            endpoints,
            requests,
            connect_timeout_ms,
        } => run(config, endpoints, requests, Duration::from_millis(connect_timeout_ms)).await,
    }
}

async fn run(
    mut config: BalancerConfig,
    endpoints: Vec<SocketAddr>,
    requests: usize,
    connect_timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&config.observability);

    if config.endpoint_count != endpoints.len() {
        tracing::info!(
            configured = config.endpoint_count,
            given = endpoints.len(),
            "Endpoint count taken from the command line"
        );
        config.endpoint_count = endpoints.len();
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let endpoints = Arc::new(endpoints);
    let lb = if config.monitor.is_some() {
        let targets = endpoints.clone();
        LoadBalancer::with_health_check(config, move |index: usize| {
            let addr = targets[index];
            async move {
                match timeout(connect_timeout, TcpStream::connect(addr)).await {
                    Ok(Ok(_)) => Ok(true),
                    Ok(Err(e)) => Err(ProbeError::from(e)),
                    Err(_) => Err(ProbeError::new(format!("connect to {} timed out", addr))),
                }
            }
        })?
    } else {
        LoadBalancer::new(config)?
    };

    let mut succeeded = 0;
    for _ in 0..requests {
        let result = lb
            .wrap_indexed(|index| {
                let addr = endpoints[index];
                async move {
                    match timeout(connect_timeout, TcpStream::connect(addr)).await {
                        Ok(Ok(_)) => Ok(addr),
                        Ok(Err(e)) => Err(e),
                        Err(_) => Err(std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            format!("connect to {} timed out", addr),
                        )),
                    }
                }
            })
            .await;

        match result {
            Ok(addr) => {
                succeeded += 1;
                tracing::info!(endpoint = %addr, "Connected");
            }
            Err(BalancerError::Endpoint(e)) => {
                tracing::warn!(error = %e, "Request failed");
            }
            Err(BalancerError::BackendsExhausted) => {
                tracing::warn!("Request rejected, all backends suspended");
            }
        }
    }

    tracing::info!(requests, succeeded, "Run complete");
    println!("{}", serde_json::to_string_pretty(&lb.snapshot())?);

    lb.shutdown().await;
    Ok(())
}
