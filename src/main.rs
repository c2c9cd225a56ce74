use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::store::postgres::PgStore;
use crate::store::StationStore;

mod cluster;
mod config;
mod geocalc;
mod geolocate;
mod locate;
mod model;
mod queue;
mod store;
mod submission;
mod time;

#[derive(Debug, Parser)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Serve { port: Option<u16> },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let path = match cli.config.as_deref() {
        Some(x) => x,
        None => Path::new("config.toml"),
    };
    let config = config::load(path)?;

    let pool = PgPool::connect(&config.database_url).await?;
    sqlx::migrate!().run(&pool).await?;

    match cli.command {
        Command::Serve { port } => {
            let store: Arc<dyn StationStore> = Arc::new(PgStore::new(pool));
            let port = port.unwrap_or(config.http_port);

            log::info!("listening on port {port}");
            HttpServer::new(move || {
                App::new()
                    .app_data(web::Data::from(store.clone()))
                    .app_data(web::Data::new(locate::Locator::new(store.clone())))
                    .service(geolocate::service)
                    .service(submission::geosubmit::service)
            })
            .bind(("0.0.0.0", port))?
            .run()
            .await?;
        }
    };

    Ok(())
}
