use anyhow::Context;
use storefront_api::{config::AppConfig, seed::seed_demo_data, storage::PostgresStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to seed the database")?;

    let storage = PostgresStorage::connect(database_url).await?;
    // Ensure migrations are applied.
    storage.migrate().await?;

    let report = seed_demo_data(&storage).await?;
    println!(
        "Seed completed: {} categories, {} products, {} users",
        report.categories, report.products, report.users
    );
    Ok(())
}
