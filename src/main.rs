use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod config;
pub mod credentials;
pub mod provider;
pub mod provision;
pub mod resolver;
pub mod writer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let config_path = config::default_path();
    let result = provision::run(
        |key| std::env::var(key).ok(),
        &config_path,
        |credentials| provider::CloudflareClient::new(&credentials.api_key),
    )
    .await;

    match result {
        Ok(database) => {
            info!(name = %database.name, uuid = %database.uuid, "Database provisioned");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(kind = ?err.kind(), "{}", err);
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
