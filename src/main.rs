use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

use contact_discovery::config::AppConfig;
use contact_discovery::logging::{init_logging, OperationTimer};
use contact_discovery::platform::{select_provider, HostPlatform, JsonContactStore};
use contact_discovery::transport::HttpFunctionsTransport;
use contact_discovery::{
    ContactDiscoveryRepository, ContactsService, IdentifierHasher, InviteMethod,
    RemoteDiscoveryRepository, Sha256Hasher,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Write JSON logs to this file as well
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Extra configuration file layered over the defaults
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the hash of a phone number or email
    Hash {
        /// Phone number or email address
        identifier: String,
    },
    /// Scan an address-book export and list invite candidates
    Sync {
        /// JSON export of the address book
        #[arg(long)]
        contacts: PathBuf,

        /// Accepted for compatibility; there is no cache to bypass
        #[arg(long)]
        force_refresh: bool,
    },
    /// Match an address-book export against registered users
    Match {
        /// JSON export of the address book
        #[arg(long)]
        contacts: PathBuf,
    },
    /// Send an invite to a phone number or email
    Invite {
        /// Phone number or email address to invite
        #[arg(short, long)]
        identifier: String,

        /// Delivery channel
        #[arg(short, long, value_enum, default_value = "link")]
        method: MethodArg,

        /// Name to personalize the invite
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Sms,
    Email,
    Link,
    Share,
}

impl From<MethodArg> for InviteMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Sms => Self::Sms,
            MethodArg::Email => Self::Email,
            MethodArg::Link => Self::Link,
            MethodArg::Share => Self::Share,
        }
    }
}

fn build_repository(config: &AppConfig) -> Result<Arc<RemoteDiscoveryRepository>> {
    let transport = HttpFunctionsTransport::new(&config.discovery)
        .context("Failed to build functions transport")?;
    Ok(Arc::new(RemoteDiscoveryRepository::new(
        Arc::new(transport),
        &config.discovery,
    )))
}

fn build_service(config: &AppConfig, contacts: PathBuf) -> Result<ContactsService> {
    let provider = select_provider(HostPlatform::Mobile(Box::new(JsonContactStore::new(contacts))));
    Ok(ContactsService::new(provider, build_repository(config)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(&["config/default", "config/local", path.as_str()])?,
        None => AppConfig::load()?,
    };

    let log_level = cli.log_level.clone().unwrap_or_else(|| config.get_log_level());
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| config.logging.file_path.as_ref().map(PathBuf::from));
    let _guard = init_logging(
        Some(&log_level),
        log_file.as_deref(),
        config.logging.format == "json",
    )?;
    debug!(functions_url = %config.discovery.functions_url, "Configuration loaded");

    let outcome = run(cli.command, &config).await;
    if let Err(e) = &outcome {
        error!(error = %e, "Command failed");
    }
    outcome
}

async fn run(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Hash { identifier } => {
            let hash = Sha256Hasher::new().hash_contact(&identifier).await?;
            println!("{hash}");
        }
        Commands::Sync {
            contacts,
            force_refresh,
        } => {
            let service = build_service(config, contacts)?;
            let result = service.sync_contacts(force_refresh).await?;
            if result.has_errors() {
                info!("Some contacts could not be processed");
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Match { contacts } => {
            let timer = OperationTimer::new("match_contacts");
            let service = build_service(config, contacts)?;
            let matches = service.find_matches().await?;
            timer.finish();
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
        Commands::Invite {
            identifier,
            method,
            name,
        } => {
            let hashed = Sha256Hasher::new().hash_contact(&identifier).await?;
            let invite = build_repository(config)?
                .send_invite(&hashed, method.into(), name.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&invite)?);
        }
    }

    Ok(())
}
