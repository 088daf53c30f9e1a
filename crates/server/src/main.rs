use charid_core::config;
use charid_core::LocalStore;
use charid_server::api::auth::AdminCredentials;
use charid_server::api::create_router;
use charid_server::api::handlers::AppState;
use charid_server::api::rate_limit::SlidingWindowLimiter;
use charid_server::service::{IdentityService, ServiceConfig};
use charid_server::store::{RemoteConfig, RemoteStore, StoreBackend};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "charid", about = "Image fingerprint identification service")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "CHARID_PORT", default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// JSON document used by the local backend
    #[arg(long, env = "CHARID_DATA_PATH", default_value = config::DEFAULT_DATA_PATH)]
    data_path: String,

    /// Qdrant base URL; when set the remote backend replaces the local file
    #[arg(long, env = "CHARID_QDRANT_URL")]
    qdrant_url: Option<String>,

    /// Qdrant collection name
    #[arg(long, env = "CHARID_QDRANT_COLLECTION", default_value = config::DEFAULT_COLLECTION)]
    qdrant_collection: String,

    /// Qdrant API key
    #[arg(long, env = "CHARID_QDRANT_API_KEY", hide_env_values = true)]
    qdrant_api_key: Option<String>,

    /// Number of predictions returned per identification
    #[arg(long, env = "CHARID_TOP_K", default_value_t = config::DEFAULT_TOP_K)]
    top_k: usize,

    /// Best-match confidence below which a low_confidence warning is attached
    #[arg(long, env = "CHARID_LOW_CONFIDENCE_THRESHOLD", default_value_t = config::DEFAULT_LOW_CONFIDENCE_THRESHOLD)]
    low_confidence_threshold: f64,

    /// Identification requests allowed per client per window
    #[arg(long, env = "CHARID_RATE_LIMIT", default_value_t = config::DEFAULT_RATE_LIMIT)]
    rate_limit: usize,

    /// Rate limit window in seconds
    #[arg(long, env = "CHARID_RATE_WINDOW_SECS", default_value_t = config::DEFAULT_RATE_WINDOW_SECS)]
    rate_window_secs: u64,

    /// Largest accepted upload in megabytes
    #[arg(long, env = "CHARID_MAX_UPLOAD_MB", default_value_t = config::DEFAULT_MAX_UPLOAD_MB)]
    max_upload_mb: usize,

    /// Admin user for registration
    #[arg(long, env = "CHARID_ADMIN_USER", default_value = config::DEFAULT_ADMIN_USER)]
    admin_user: String,

    /// Admin password for registration
    #[arg(long, env = "CHARID_ADMIN_PASSWORD", default_value = config::DEFAULT_ADMIN_PASSWORD, hide_env_values = true)]
    admin_password: String,
}

impl Args {
    fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be > 0".into());
        }
        if self.top_k == 0 || self.top_k > config::MAX_TOP_K {
            return Err(format!("top_k must be between 1 and {}", config::MAX_TOP_K));
        }
        if !self.low_confidence_threshold.is_finite() {
            return Err("low_confidence_threshold must be a finite number".into());
        }
        if self.rate_limit == 0 {
            return Err("rate_limit must be > 0".into());
        }
        if self.rate_window_secs == 0 {
            return Err("rate_window_secs must be > 0".into());
        }
        if self.max_upload_mb == 0 {
            return Err("max_upload_mb must be > 0".into());
        }
        if self.admin_user.is_empty() || self.admin_password.is_empty() {
            return Err("admin credentials must not be empty".into());
        }
        let data_path = std::path::Path::new(&self.data_path);
        if data_path.is_dir() {
            return Err(format!("data_path '{}' is a directory", self.data_path));
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("charid_server=info".parse()?)
                .add_directive("charid_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let store: StoreBackend = match args.qdrant_url.as_deref() {
        Some(url) => {
            let remote_config = RemoteConfig::new(url, args.qdrant_collection.clone())
                .with_api_key(args.qdrant_api_key.clone());
            let remote = RemoteStore::connect(remote_config).await.map_err(|e| {
                tracing::error!("Could not reach Qdrant at {}: {}", url, e);
                e
            })?;
            tracing::info!(
                url = %url,
                collection = %args.qdrant_collection,
                "Using Qdrant backend"
            );
            remote.into()
        }
        None => {
            let local = LocalStore::open(&args.data_path)?;
            tracing::info!(
                path = %args.data_path,
                identities = local.len(),
                "Using local file backend"
            );
            local.into()
        }
    };

    if args.admin_password == config::DEFAULT_ADMIN_PASSWORD {
        tracing::warn!("Admin password is the default; set CHARID_ADMIN_PASSWORD");
    }

    let prometheus_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let backend_kind = store.kind();
    let service = IdentityService::new(
        store,
        ServiceConfig {
            top_k: args.top_k,
            low_confidence_threshold: args.low_confidence_threshold,
        },
    );

    let state = AppState {
        service: Arc::new(service),
        limiter: Arc::new(SlidingWindowLimiter::new(
            args.rate_limit,
            Duration::from_secs(args.rate_window_secs),
        )),
        admin: Arc::new(AdminCredentials::new(
            args.admin_user.clone(),
            args.admin_password.clone(),
        )),
        max_upload_bytes: args.max_upload_mb * 1024 * 1024,
        prometheus_handle,
        start_time: Instant::now(),
    };

    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", args.port);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        backend = backend_kind,
        model_version = config::MODEL_VERSION,
        top_k = args.top_k,
        rate_limit = args.rate_limit,
        rate_window_secs = args.rate_window_secs,
        max_upload_mb = args.max_upload_mb,
        "charid ready"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down gracefully, draining in-flight requests...");
}
