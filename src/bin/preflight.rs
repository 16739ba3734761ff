use pkv_client::app::broker::derive_identity;
use pkv_client::domain::exchange::{ExchangeClient, ExchangeSettings, LoginOutcome};
use pkv_client::infra::config::{self, BrokerConfig};
use pkv_client::{ConnectClient, SolanaLedger};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Deposits below this are unlikely to cover a bootstrap registration plus fees.
const LOW_BALANCE_LAMPORTS: u64 = 10_000_000;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--exchange <url>] [--login]\n\
         \n\
         Requires env vars:\n\
           {} (or {})\n\
         Optional:\n\
           {}, {}, {}, {}, {}\n",
        config::MNEMONIC,
        config::MNEMONIC_FILE,
        config::PAYMENT_ENVIRONMENT,
        config::LEDGER_RPC_URL,
        config::ARGON2_SALT,
        config::HKDF_SALT,
        config::BOOTSTRAP_DEPOSIT,
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let exchange = args
        .iter()
        .position(|a| a == "--exchange")
        .map(|i| args.get(i + 1).cloned().unwrap_or_else(|| usage_and_exit()));
    let try_login = args.iter().any(|a| a == "--login");

    let config = BrokerConfig::from_env()?;
    info!(
        environment = %config.environment,
        ledger = %config.ledger_rpc_url,
        publish_endpoint = %config.publish_endpoint,
        "preflight"
    );
    if config.identity.uses_fixture_salts() {
        warn!(
            "{} / {} not set; the public fixture salts are in use",
            config::ARGON2_SALT,
            config::HKDF_SALT
        );
    }

    let identity = derive_identity(&config).await?;
    info!(did = %identity.did(), address = %identity.ledger_address(), "identity derived");

    let ledger = Arc::new(SolanaLedger::new(config.ledger_rpc_url.clone()));
    let version = ledger.version().await?;
    info!(%version, "ledger RPC reachable");

    let balance = ledger.balance(&identity.ledger_address()).await?;
    info!(lamports = balance, "payer balance");
    if balance < LOW_BALANCE_LAMPORTS {
        warn!("payer balance looks low; registration deposits may fail");
    }

    if let Some(endpoint) = exchange {
        let client = ExchangeClient::new(
            identity.clone(),
            Arc::new(ConnectClient::new(config.request_timeout)),
            ledger,
            ExchangeSettings {
                environment: config.environment,
                bootstrap_deposit: config.bootstrap_deposit,
                deposit_ttl: config.deposit_ttl,
            },
        );

        let address = client.payment_address(&endpoint).await?;
        info!(%endpoint, %address, "exchange accepts deposits");

        if try_login {
            match client.login(&endpoint).await? {
                LoginOutcome::LoggedIn(grant) => info!(
                    account_id = %grant.account.account_id,
                    balance = %grant.account.balance,
                    "logged in"
                ),
                LoginOutcome::NotRegistered => {
                    warn!("no account yet; the first retrieval will register with a deposit")
                }
            }
        }
    }

    info!("preflight OK");
    Ok(())
}
