//! Lyrics genre inference server.
//!
//! Loads the model artifacts once at startup (refusing to start when they
//! are missing or broken) and serves `/health` and `/predict` over HTTP.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

mod error;
mod routes;

use routes::AppState;

#[derive(Parser, Debug)]
#[command(name = "lyrio", version, about = "Lyrics genre inference server")]
struct Args {
    /// Directory holding the serialized model artifacts.
    #[arg(long, env = "LYRIO_MODEL_DIR", default_value = "model")]
    model_dir: PathBuf,

    /// Port to listen on.
    #[arg(long, env = "LYRIO_PORT", default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    info!(dir = %args.model_dir.display(), "resolving model artifacts");
    let model = lyrio_ai::artifact::load(&args.model_dir)?;
    info!(
        ensemble = model.is_ensemble(),
        classes = model.n_classes(),
        "model ready"
    );

    let app = routes::router(AppState::new(model));

    let addr = format!("0.0.0.0:{}", args.port);
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
