//! oxide-mvc-serve CLI
//!
//! Serves the demo catalogue over HTTP/1.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use oxide_docstore::MemoryStore;
use oxide_mvc_serve::app;
use oxide_mvc_serve::config::Cli;
use oxide_mvc_serve::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.init_logging()?;

    let widgets = app::widgets(Arc::new(MemoryStore::new()));
    let dispatcher = app::dispatcher(&widgets, &cli.environment, cli.mount_path.as_deref())?;

    let listener = TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    info!(
        addr = %listener.local_addr()?,
        environment = %cli.environment,
        routes = dispatcher.routes().len(),
        "listening"
    );

    server::serve(listener, Arc::new(dispatcher)).await
}
