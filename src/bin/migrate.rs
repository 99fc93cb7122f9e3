use rental_client::{client::Client, config::ClientConfig, logging::init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let client = Client::connect(ClientConfig::from_env()?).await?;
    client.migrate().await?;
    client.disconnect().await?;
    println!("Migrations applied");
    Ok(())
}
