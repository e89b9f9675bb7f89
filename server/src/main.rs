use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use typed_kv_core::kv::KVStore;
use typed_kv_server::config::ConfigLoad;
use typed_kv_server::http;
use typed_kv_server::trace;

#[derive(Debug, Parser, PartialEq)]
#[command(version, author, about)]
pub struct Args {
    /// Path to the embedded database file.
    #[clap(short = 'd', long = "db-path")]
    db_path: Option<String>,

    /// Address to bind the HTTP listener to.
    #[clap(short = 'b', long = "bind")]
    bind_addr: Option<String>,

    #[clap(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
pub async fn main() -> Result<()> {
    eprintln!();
    eprintln!("██  ██  █        █");
    eprintln!("██ ██   ██      ██");
    eprintln!("███      ██    ██");
    eprintln!("██ ██     ██  ██");
    eprintln!("██  ██     ████  typed-kv-server");
    eprintln!();

    let args = Args::parse();

    let mut config = ConfigLoad::from_env();
    if let Some(db_path) = args.db_path {
        config.db_path = db_path.into();
    }
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    config.log_level = args.log_level;

    let _guards = trace::init_logging(&config.log_dir, &config.log_level).await?;
    info!("typed-kv-server starting with config: {:?}", &config);

    let store = KVStore::open(&config.db_path)
        .await
        .with_context(|| format!("opening database at {:?}", config.db_path))?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding to {}", config.bind_addr))?;
    info!("listening on {}", config.bind_addr);

    let app = http::app(store, Arc::new(config));
    axum::serve(listener, app).await.context("server exited")?;

    Ok(())
}
