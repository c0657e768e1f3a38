use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use taiyi_client::blockchain::{Broadcaster, Client, Wallet};
use taiyi_client::config::{load_config, validate_config, ClientConfig, ConfigError};
use taiyi_client::crypto::{transaction_digest, transaction_id, KeyRole, PrivateKey};
use taiyi_client::observability::{logging, metrics};
use taiyi_client::serializer::{Asset, SignedTransaction};

#[derive(Parser)]
#[command(name = "taiyi-cli")]
#[command(about = "Command line client for Taiyi chain nodes", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node URL, overriding the configuration.
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call an API method and print the JSON result
    Call {
        method: String,
        /// Arguments as a JSON array
        #[arg(default_value = "[]")]
        params: String,
        #[arg(long, default_value = taiyi_client::transport::DEFAULT_API)]
        api: String,
    },
    /// Print the public keys derived from a login, or a fresh key pair
    Keys {
        #[arg(long, requires = "password")]
        account: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Encode a transaction JSON file and print its hex, digest and id
    TxHex {
        file: PathBuf,
        /// Also ask the node for its encoding
        #[arg(long)]
        compare: bool,
    },
    /// Transfer with the key in TAIYI_PRIVATE_KEY
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// e.g. "1.000 YANG"
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        memo: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = cli.url {
        config.node.url = url;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    match cli.command {
        Commands::Call { method, params, api } => {
            let params: Value = serde_json::from_str(&params)?;
            let client = Client::new(&config)?;
            let result = client.call(&api, &method, params).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            client.disconnect().await;
        }
        Commands::Keys { account, password } => match (account, password) {
            (Some(account), Some(password)) => {
                let wallet = Wallet::from_login(&account, &password)?;
                for role in KeyRole::ALL {
                    if let Some(public) = wallet.public_key(role, &config.chain.address_prefix) {
                        println!("{:<8} {public}", role.as_str());
                    }
                }
            }
            _ => {
                let key = PrivateKey::generate();
                println!("private  {}", key.to_wif());
                println!("public   {}", key.public_key_with_prefix(&config.chain.address_prefix));
            }
        },
        Commands::TxHex { file, compare } => {
            let text = std::fs::read_to_string(&file)?;
            let signed: SignedTransaction = serde_json::from_str(&text)?;
            let client = Client::new(&config)?;
            let hex = signed.to_hex()?;
            println!("hex     {hex}");
            println!(
                "digest  {}",
                ::hex::encode(transaction_digest(&signed.transaction, client.chain_id())?)
            );
            println!("id      {}", transaction_id(&signed.transaction)?);
            if compare {
                let node_hex = Broadcaster::new(client.clone())
                    .node_transaction_hex(&signed)
                    .await?;
                println!("node    {node_hex}");
                if node_hex != hex {
                    tracing::warn!("local and node encodings differ");
                }
            }
            client.disconnect().await;
        }
        Commands::Transfer {
            from,
            to,
            amount,
            memo,
        } => {
            let amount: Asset = amount.parse()?;
            let wallet = Wallet::from_env(Some(&from))?;
            let client = Client::new(&config)?;
            let confirmation = Broadcaster::new(client.clone())
                .transfer(&wallet, &to, amount, &memo)
                .await?;
            println!("{}", serde_json::to_string_pretty(&confirmation)?);
            client.disconnect().await;
        }
    }

    Ok(())
}
