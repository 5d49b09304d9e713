use anyhow::Result;
use clap::Parser;
use lingua_live::{create_router, AppState, Config};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "lingua-live", about = "Live voice conversation practice service")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/lingua-live")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Lingua Live v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Live endpoint: {} ({})", cfg.live.url, cfg.live.model);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(cfg);
    let router = create_router(state);

    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
