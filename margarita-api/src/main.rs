use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use margarita_api::{app, AppState};
use margarita_core::BookingRepository;
use margarita_store::{
    Config, DbClient, InMemoryBookingRepository, InMemoryUserRepository, PgBookingRepository,
    PgUserRepository, UserRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "margarita_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("failed to load config")?;
    tracing::info!("Starting Margarita API on port {}", config.server.port);

    let (bookings, users): (Arc<dyn BookingRepository>, Arc<dyn UserRepository>) =
        if config.database.is_memory() {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            (
                Arc::new(InMemoryBookingRepository::new()),
                Arc::new(InMemoryUserRepository::new()),
            )
        } else {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("failed to connect to Postgres")?;
            if config.database.run_migrations {
                db.migrate().await.context("failed to run migrations")?;
            }
            (
                Arc::new(PgBookingRepository::new(db.pool.clone())),
                Arc::new(PgUserRepository::new(db.pool)),
            )
        };

    let app_state = AppState::new(bookings, users, &config).context("invalid calendar config")?;
    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
