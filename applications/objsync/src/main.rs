/// objsync - replicate object-storage tenants from an origin cluster
use clap::{Parser, Subcommand, ValueEnum};
use objsync::{config::AppConfig, output};
use objsync_core::ClusterSide;
use objsync_engine::{collect_usage, AccountSynchronizer, GuardedStorage};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status of a run that completed with failed items
const EXIT_PARTIAL_FAILURE: i32 = 2;

#[derive(Parser)]
#[command(name = "objsync")]
#[command(about = "Replicate object-storage tenants onto a second cluster", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "objsync.toml", env = "OBJSYNC_CONFIG")]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one replication pass over every tenant
    Sync {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Exit with status 2 when any item failed
        #[arg(long)]
        fail_on_error: bool,
    },
    /// Sum containers, objects and bytes over every tenant of one cluster
    Usage {
        #[arg(long, value_enum, default_value_t = Side::Origin)]
        side: Side,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the tenants that would be replicated
    Tenants,
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Origin,
    Destination,
}

impl From<Side> for ClusterSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Origin => ClusterSide::Origin,
            Side::Destination => ClusterSide::Destination,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "objsync=debug,objsync_engine=debug,objsync_swift=debug"
    } else {
        "objsync=info,objsync_engine=info,objsync_swift=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load(&cli.config)?;
    config.validate()?;

    match cli.command {
        Commands::Sync {
            json,
            fail_on_error,
        } => {
            let failed = sync(&config, json).await?;
            if failed && fail_on_error {
                std::process::exit(EXIT_PARTIAL_FAILURE);
            }
        }
        Commands::Usage { side, json } => {
            usage(&config, side.into(), json).await?;
        }
        Commands::Tenants => {
            tenants(&config).await?;
        }
    }

    Ok(())
}

/// Returns whether any item failed.
async fn sync(config: &AppConfig, json: bool) -> anyhow::Result<bool> {
    let resolver = config.build_resolver()?;
    let storage = config.build_storage()?;
    let state = config.open_state_store().await?;

    tracing::info!(
        resolver = ?config.identity.resolver,
        tenant_concurrency = config.concurrency.tenants,
        storage_concurrency = config.concurrency.storage,
        persistent_marks = config.sync.state_database.is_some(),
        "Starting objsync"
    );

    let synchronizer = AccountSynchronizer::new(resolver, storage, state, config.sync_config());
    let report = synchronizer.process().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", output::render_report(&report));
    }

    Ok(report.has_failures())
}

async fn usage(config: &AppConfig, side: ClusterSide, json: bool) -> anyhow::Result<()> {
    let resolver = config.build_resolver()?;
    let storage = GuardedStorage::new(
        config.build_storage()?,
        config.concurrency.storage,
        config.request_timeout(),
    )
    .with_transfer_timeout(config.transfer_timeout());

    let report = collect_usage(
        resolver.as_ref(),
        &storage,
        side,
        config.concurrency.storage,
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", output::render_usage(&report));
    }
    Ok(())
}

async fn tenants(config: &AppConfig) -> anyhow::Result<()> {
    let resolver = config.build_resolver()?;
    let tenants = resolver.list_tenants().await?;

    println!("{}", output::render_tenants(&tenants));
    tracing::info!(count = tenants.len(), "Tenants listed");
    Ok(())
}
