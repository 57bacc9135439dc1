use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use docsearch_core::Config;
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// TOML config file with query options
    #[arg(long)]
    config: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    let app: Router = build_app(args.index.clone(), &config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
