//! Site CMS - admin and public content API for a marketing homepage.

mod cache;
mod cms;
mod config;
mod error;
mod forms;
mod hierarchy;
mod models;
mod routes;
mod sections;
mod store;

use cache::TagCache;
use cms::Cms;
use config::Settings;
use routes::AppState;
use store::Repository;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "site_cms=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    let store = settings.open_store()?;
    let cms = Cms::new(Repository::new(store), TagCache::new());

    // Surface bad seed data at startup rather than on the first public read
    let navigation = cms.admin_navigation().await?;
    info!(
        "Navigation: {} root items ({} total)",
        navigation.len(),
        hierarchy::count_nodes(&navigation)
    );

    let bind_addr = settings.bind_addr.clone();
    let app = routes::router(AppState { cms, settings });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
