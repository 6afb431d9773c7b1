use bitpanda_wallets::{
    create_entry, CredentialValidator, Currency, ReqwestHttpClient, SensorSink, SensorState,
    UserInput, WalletIntegration, WalletType,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct ConsoleSink;

impl SensorSink for ConsoleSink {
    fn publish(&self, state: &SensorState) {
        println!(
            "{:<40} {:>12.2} {}  (next update {})",
            state.name, state.value, state.unit, state.attributes.next_update
        );
        for wallet in state.attributes.wallets.iter().flatten() {
            println!(
                "    {:<30} {:>16.8} {:<6} {:>12.2}",
                wallet.name, wallet.balance_token, wallet.currency, wallet.balance_fiat
            );
        }
    }

    fn mark_stale(&self, unique_id: &str, reason: &str) {
        eprintln!("{unique_id} is stale: {reason}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let api_key = std::env::var("BITPANDA_API_KEY")?;
    let currency: Currency = std::env::var("BITPANDA_CURRENCY")
        .unwrap_or_else(|_| "EUR".to_string())
        .parse()?;

    let http = Arc::new(ReqwestHttpClient::new()?);

    println!("Validating API key...");
    let validator = CredentialValidator::new(http.clone());
    let entry = create_entry(
        UserInput {
            api_key,
            currency,
            wallet: WalletType::all().to_vec(),
        },
        &validator,
    )
    .await?;
    println!("Created entry: {}", entry.title);

    let mut integration = WalletIntegration::new(http, Arc::new(ConsoleSink));
    let sensors = integration.setup(entry).await?;
    println!("{} sensors loaded, polling until Ctrl-C", sensors.len());

    tokio::signal::ctrl_c().await?;
    integration.unload().await;

    Ok(())
}
