//! Brewing log server: reads settings, opens the configured store, serves the brew resource.

use brews::{app, AppState, MemoryDatabase, PgProvider, Settings, StoreBackend, StoreProvider};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("brews=info".parse()?))
        .init();

    let settings = Settings::from_env()?;
    tracing::info!(backend = ?settings.backend, policy = ?settings.fault_policy, "starting");

    match settings.backend {
        StoreBackend::Postgres => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(&settings.database_url)
                .await?;
            let provider = PgProvider::new(pool).with_schema(settings.schema.clone());
            serve(&settings, provider).await
        }
        StoreBackend::Memory => serve(&settings, MemoryDatabase::new()).await,
    }
}

async fn serve<P: StoreProvider>(settings: &Settings, provider: P) -> Result<(), Box<dyn std::error::Error>> {
    let router = app(AppState::new(provider, settings.fault_policy));
    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
