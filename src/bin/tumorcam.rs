use std::{error::Error, sync::Arc};

use ortho_config::OrthoConfig;
use tokio::net::TcpListener;
use tracing::{error, info};
use tumor_cam::{
    cli::TumorcamArgs,
    providers::{ModelHandle, onnx::OnnxFeatureExtractor},
    server::{AppState, build_router, cors_layer},
    store::ResultStore,
    telemetry::init_tracing,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = TumorcamArgs::load()?;
    init_tracing(args.log_json);
    let args = args.validate()?;
    if args.dry_run {
        info!(bind = %args.bind, model = %args.model_path.display(), "configuration valid; dry run complete");
        return Ok(());
    }

    let addr = args.socket_addr()?;
    let model: ModelHandle = Arc::new(OnnxFeatureExtractor::new(args.extractor_config())?);
    let store = ResultStore::open(&args.database)?;
    let state = AppState::new(model, store, args.overlay());
    let app = build_router(state, cors_layer(&args.allowed_origin)?);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "tumorcam listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;
    info!("tumorcam stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}
