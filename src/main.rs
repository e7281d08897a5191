use clap::{Parser, Subcommand};
use cloud_subnet_sync::azure::AzureCliSource;
use cloud_subnet_sync::config::{self, Settings};
use cloud_subnet_sync::output;
use cloud_subnet_sync::repository::JsonFileRepository;
use cloud_subnet_sync::sync::NetworkSource;
use cloud_subnet_sync::{Context, ProviderRegistry, ProviderType, Reconciler};
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const LOG_CONFIG_FILE: &str = "log4rs.yml";

#[derive(Parser, Debug)]
#[command(name = "cloud-subnet-sync", version, about = "Discover cloud subnets and reconcile them into a local inventory")]
struct Cli {
    /// Inventory JSON file
    #[arg(long, env = config::ENV_INVENTORY)]
    inventory: Option<PathBuf>,

    /// Upper bound for the whole command, in seconds; overrides the environment
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered providers
    Providers,
    /// Fetch subnets from one or every configured provider
    Fetch {
        #[arg(long)]
        provider: Option<String>,
    },
    /// Reconcile Azure virtual networks and subnets into the inventory
    Sync,
    /// Re-read utilization of every Azure subnet in the inventory
    RefreshUtilization,
    /// Print the inventory
    Inventory,
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    if Path::new(LOG_CONFIG_FILE).exists() {
        log4rs::init_file(LOG_CONFIG_FILE, Default::default())?;
        return Ok(());
    }
    let level = std::env::var(config::ENV_LOG)
        .ok()
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S%.3f)} {h({l:5})} {t} - {m}{n}")))
        .build();
    let log_config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))?;
    log4rs::init_config(log_config)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    dotenv::dotenv().ok();
    init_logging()?;
    log::info!("#Start main()");

    let cli = Cli::parse();
    let mut settings = Settings::from_env();
    if let Some(path) = cli.inventory {
        settings.inventory_file = path;
    }
    if let Some(secs) = cli.timeout_secs {
        settings.timeout = Duration::from_secs(secs);
    }

    let (ctx, cancel) = Context::with_cancel();
    let ctx = ctx.timeout(settings.timeout);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    match cli.command {
        Command::Providers => {
            output::print_providers(&ProviderRegistry::with_default_providers());
        }
        Command::Fetch { provider } => {
            let registry = ProviderRegistry::with_default_providers();
            let (results, errors) = match provider {
                Some(p) => {
                    let provider_type = ProviderType::from(p.as_str());
                    let creds = settings
                        .credentials
                        .get(&provider_type)
                        .cloned()
                        .ok_or_else(|| format!("No credentials configured for {provider_type}"))?;
                    let mut results = HashMap::new();
                    let mut errors = HashMap::new();
                    match registry.fetch_subnets_from_provider(&ctx, &provider_type, &creds).await {
                        Ok(subnets) => {
                            results.insert(provider_type, subnets);
                        }
                        Err(e) => {
                            errors.insert(provider_type, e);
                        }
                    }
                    (results, errors)
                }
                None => {
                    registry
                        .fetch_subnets_from_all_providers(&ctx, &settings.credentials)
                        .await
                }
            };
            output::print_fetch(&results, &errors);
        }
        Command::Sync => {
            let reconciler = azure_reconciler(&ctx, &settings).await?;
            let report = reconciler.sync(&ctx).await?;
            output::print_sync_report(&report);
        }
        Command::RefreshUtilization => {
            let reconciler = azure_reconciler(&ctx, &settings).await?;
            let report = reconciler.refresh_utilization(&ctx).await?;
            output::print_utilization_report(&report);
        }
        Command::Inventory => {
            let repository = JsonFileRepository::open(&settings.inventory_file).await?;
            output::print_inventory(&repository.snapshot().await);
        }
    }

    log::info!("#End main()");
    Ok(())
}

/// Reconciler over the logged in az account and the inventory file.
async fn azure_reconciler(ctx: &Context, settings: &Settings) -> Result<Reconciler, Box<dyn Error>> {
    let source = AzureCliSource::new();
    source.validate_credentials(ctx).await?;
    let repository = JsonFileRepository::open(&settings.inventory_file).await?;
    Ok(Reconciler::new(ProviderType::AZURE, Arc::new(source), Arc::new(repository)))
}
