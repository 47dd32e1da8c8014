use anyhow::Context;
use storefront_api::{config::AppConfig, storage::PostgresStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to run migrations")?;

    let storage = PostgresStorage::connect(database_url).await?;
    storage.migrate().await?;
    println!("Migrations applied");
    Ok(())
}
