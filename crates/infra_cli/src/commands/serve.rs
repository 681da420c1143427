//! Serve command - Run the items HTTP service.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use infra_app::{serve, DbOptions, ItemStore, MemoryItemStore, PgItemStore};

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8000", env = "APP_BIND")]
    pub bind: SocketAddr,

    /// Create the items table before serving
    #[arg(long)]
    pub init_schema: bool,

    /// Keep items in memory instead of PostgreSQL
    #[arg(long, conflicts_with = "init_schema")]
    pub memory: bool,
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let store: Arc<dyn ItemStore> = if args.memory {
        warn!("Serving with an in-memory store; items are lost on exit");
        Arc::new(MemoryItemStore::new())
    } else {
        let options = DbOptions::from_env()?;
        info!("Using database {:?} on {:?}", options.name, options.host);
        let store = PgItemStore::new(options);
        if args.init_schema {
            store.ensure_schema().await?;
        }
        Arc::new(store)
    };

    serve(args.bind, store).await?;
    Ok(())
}
