//! Formflow UI server - HTTP API and event stream for interactive form sessions.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use formflow::core::session::Recorder;
use formflow::io::config::{DEFAULT_CONFIG_PATH, load_config};
use formflow::io::recorder::recorder_from_config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "formflow-ui")]
#[command(about = "Web API for filling forms step by step")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Config file with forms, recorder and messages
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory containing UI static files
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("formflow_ui=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let cfg = load_config(&args.config)?;
    let catalog = cfg.catalog()?;
    info!(
        config = %args.config.display(),
        forms = catalog.len(),
        recorder = ?cfg.recorder.kind,
        "starting formflow-ui"
    );

    let recorder: Arc<dyn Recorder + Send + Sync> = Arc::from(recorder_from_config(&cfg.recorder));
    let state = AppState::new(catalog, recorder, cfg.messages.submit_failure.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state);

    let ui_dir = args.ui_dir.unwrap_or_else(|| PathBuf::from("ui").join("dist"));
    if ui_dir.exists() {
        info!(ui_dir = %ui_dir.display(), "serving static UI files");
        app = app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
    } else {
        info!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
