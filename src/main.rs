use dotenv::dotenv;
use movie_booking_system::config::Config;
use movie_booking_system::db::Database;
use movie_booking_system::server;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movie_booking_system=info,rocket=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Connect to the database and bring the schema up to date
    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!(
        max_connections = config.database.max_connections,
        transaction_timeout = ?config.booking.transaction_timeout,
        "database ready"
    );

    let _rocket = server::build(config, database.get_pool().clone())
        .launch()
        .await?;

    database.close().await;
    info!("shut down");
    Ok(())
}
