mod core;
mod features;
mod modules;
mod shared;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{middleware::from_fn_with_state, Router};
use clap::{Parser, Subcommand};
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::core::config::Config;
use crate::core::middleware;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::features::geo::models::Backend;
use crate::features::geo::routes as geo_routes;
use crate::features::geo::ProximityService;
use crate::features::seed::{SeedDataset, SeedService};
use crate::modules::stores::StoreSet;

/// Proximity search over cities and districts on PostGIS, MongoDB and Redis
#[derive(Debug, Parser)]
#[command(name = "geoprox", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Replace the contents of one or all backends with the seed dataset
    Seed {
        /// Only seed this backend
        #[arg(long, value_enum)]
        backend: Option<Backend>,
        /// Reseed even when the store already holds entities
        #[arg(long)]
        force: bool,
        /// Dataset to load instead of the bundled one
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Rewrite stored geometries from their coordinates
    Backfill {
        #[arg(long, value_enum)]
        backend: Option<Backend>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli, worker_threads))
}

async fn async_main(cli: Cli, worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(
        "Configuration loaded, enabled backends: {:?}",
        config.stores.enabled()
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, worker_threads).await,
        Command::Seed {
            backend,
            force,
            file,
        } => seed(config, backend, force, file).await,
        Command::Backfill { backend } => backfill(config, backend).await,
    }
}

/// The requested backend, or every configured one
fn selected_backends(config: &Config, backend: Option<Backend>) -> Vec<Backend> {
    match backend {
        Some(backend) => vec![backend],
        None => config.stores.enabled(),
    }
}

async fn seed(
    config: Config,
    backend: Option<Backend>,
    force: bool,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let selected = selected_backends(&config, backend);
    let stores = StoreSet::connect(&config.stores, &selected).await?;

    let path = file.or(config.seed.file);
    let dataset = SeedDataset::load(path.as_deref()).await?;
    tracing::info!(
        "Seed dataset loaded: {} cities, {} districts",
        dataset.cities.len(),
        dataset.district_count()
    );

    for backend in selected {
        let store = stores
            .get(backend)
            .ok_or_else(|| anyhow::anyhow!("Backend {} is not connected", backend))?;
        let report = SeedService::new(store).reseed(&dataset, force).await?;
        println!("{}", serde_json::to_string(&report)?);
    }

    Ok(())
}

async fn backfill(config: Config, backend: Option<Backend>) -> anyhow::Result<()> {
    let selected = selected_backends(&config, backend);
    let stores = StoreSet::connect(&config.stores, &selected).await?;

    for backend in selected {
        let store = stores
            .get(backend)
            .ok_or_else(|| anyhow::anyhow!("Backend {} is not connected", backend))?;
        let saved = SeedService::new(store).backfill().await?;
        tracing::info!("Backfill of {} rewrote {} geometries", backend, saved);
    }

    Ok(())
}

async fn serve(config: Config, worker_threads: usize) -> anyhow::Result<()> {
    // Log system info
    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    let enabled = config.stores.enabled();
    let stores = StoreSet::connect(&config.stores, &enabled).await?;

    // One router per backend; the primary one is also mounted at /api/v1
    let mut api = Router::new();
    for backend in enabled {
        let store = stores
            .get(backend)
            .ok_or_else(|| anyhow::anyhow!("Backend {} is not connected", backend))?;
        let service = Arc::new(ProximityService::new(store));

        let mut routes = geo_routes::routes(service);
        if let (Backend::Redis, Some(redis)) = (backend, stores.redis()) {
            routes = routes.merge(geo_routes::redis_index_routes(redis));
        }

        if config.stores.primary == Some(backend) {
            api = api.nest("/api/v1", routes.clone());
            tracing::info!("Primary backend {} mounted at /api/v1", backend);
        }
        api = api.nest(&backend.prefix(), routes);
        tracing::info!("Backend {} mounted at {}", backend, backend.prefix());
    }

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn_with_state(
                Arc::new(credentials),
                middleware::swagger_basic_auth,
            ))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let app = Router::new()
        .merge(swagger)
        .merge(api)
        .merge(health_route)
        .layer(
            ServiceBuilder::new()
                // Generate X-Request-Id using UUID v7 (or use client-provided one)
                .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(middleware::MakeSpanWithRequestId)
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                // Propagate X-Request-Id to response headers
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(middleware::cors_layer(
                    config.app.cors_allowed_origins.clone(),
                )),
        );

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(65535)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}
