//! goofys CSI Node Plugin
//!
//! Serves the node RPC surface, a health endpoint and a prometheus
//! metrics endpoint.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use goofys_csi_node::{
    api::DEFAULT_ENDPOINT, driver::version_yaml, mount::DEFAULT_MOUNT_BINARY, ApiServer,
    ApiServerConfig, DriverConfig, Error, NodeMetrics, NodeService, Result,
    SecretAttributeResolver, SystemMounter,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// goofys CSI node plugin
#[derive(Parser, Debug)]
#[command(author, about, long_about = None, disable_version_flag = true)]
struct Args {
    /// Node RPC endpoint
    #[arg(long, env = "CSI_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Node ID reported to the orchestrator
    #[arg(long = "nodeid", env = "NODE_ID", default_value = "")]
    node_id: String,

    /// CSI driver name
    #[arg(long, env = "DRIVER_NAME", default_value = goofys_csi_node::driver::DEFAULT_DRIVER_NAME)]
    driver_name: String,

    /// Mount tool binary
    #[arg(long, env = "MOUNT_BINARY", default_value = DEFAULT_MOUNT_BINARY)]
    mount_binary: String,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDRESS", default_value = "0.0.0.0:29624")]
    metrics_address: String,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDRESS", default_value = "0.0.0.0:29625")]
    health_address: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Print the version report and exit
    #[arg(long)]
    version: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.version {
        print!("{}", version_yaml(&args.driver_name)?);
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting goofys CSI node plugin");
    info!("  Version: {}", goofys_csi_node::VERSION);
    info!("  Endpoint: {}", args.endpoint);
    info!("  Mount binary: {}", args.mount_binary);

    if args.node_id.is_empty() {
        warn!("nodeid is empty");
    }

    let config = DriverConfig::new(args.node_id.clone()).with_driver_name(args.driver_name.clone());
    config.validate()?;

    let metrics = NodeMetrics::new()?;
    metrics.register(prometheus::default_registry())?;

    let service = NodeService::new(
        Arc::new(config),
        Arc::new(SystemMounter::new(args.mount_binary.clone())),
        Arc::new(SecretAttributeResolver::new()),
        metrics,
    );

    // Start health server
    let health_addr = args.health_address.clone();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(&health_addr).await {
            error!("Health server error: {}", e);
        }
    });

    // Start metrics server
    let metrics_addr = args.metrics_address.clone();
    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(&metrics_addr).await {
            warn!("Metrics server error: {}", e);
        }
    });

    let api_server = Arc::new(ApiServer::new(
        ApiServerConfig::from_endpoint(&args.endpoint)?,
        service,
    ));

    let signal_server = api_server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, shutting down");
            signal_server.shutdown();
        }
    });

    api_server.run().await?;

    info!("Node plugin shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "tower_http=info", "axum=info"] {
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| Error::Configuration(format!("log directive {}: {}", directive, e)))?,
        );
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}

// =============================================================================
// Health Server
// =============================================================================

async fn run_health_server(addr: &str) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            let (status, body) = match req.uri().path() {
                "/healthz" | "/livez" | "/readyz" => (StatusCode::OK, "ok"),
                _ => (StatusCode::NOT_FOUND, "not found"),
            };
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Configuration(format!("Invalid health server address: {}", e)))?;

    info!("Health server listening on {}", addr);
    Server::try_bind(&addr)
        .map_err(|e| Error::Internal(format!("Health server bind error: {}", e)))?
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};
    use prometheus::{Encoder, TextEncoder};

    let make_svc = make_service_fn(|_conn| async {
        Ok::<_, std::convert::Infallible>(service_fn(|req: Request<Body>| async move {
            if req.uri().path() != "/metrics" {
                let mut response = Response::new(Body::from("not found"));
                *response.status_mut() = StatusCode::NOT_FOUND;
                return Ok::<_, std::convert::Infallible>(response);
            }

            let encoder = TextEncoder::new();
            let mut buffer = Vec::new();
            let mut response = match encoder.encode(&prometheus::gather(), &mut buffer) {
                Ok(()) => Response::new(Body::from(buffer)),
                Err(e) => {
                    let mut response = Response::new(Body::from(e.to_string()));
                    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                    response
                }
            };
            if let Ok(content_type) = encoder.format_type().parse() {
                response.headers_mut().insert(hyper::header::CONTENT_TYPE, content_type);
            }
            Ok::<_, std::convert::Infallible>(response)
        }))
    });

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Configuration(format!("Invalid metrics server address: {}", e)))?;

    info!("Metrics server listening on {}", addr);
    Server::try_bind(&addr)
        .map_err(|e| Error::Internal(format!("Metrics server bind error: {}", e)))?
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Metrics server error: {}", e)))?;

    Ok(())
}
