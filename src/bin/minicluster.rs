//! Run a mock test cluster from the command line

use clap::{Parser, Subcommand};
use minicluster::{ClusterCoordinator, Options};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minicluster")]
#[command(about = "In-process DN + log-service test cluster")]
#[command(version = minicluster::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a mock cluster, bootstrap it and print the hakeeper state
    Run {
        /// TOML config file (MINICLUSTER_* env vars also apply)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of DN stores
        #[arg(long)]
        dn_stores: Option<usize>,

        /// Number of log stores
        #[arg(long)]
        log_stores: Option<usize>,

        /// Number of DN shards
        #[arg(long)]
        dn_shards: Option<u64>,

        /// Number of log shards
        #[arg(long)]
        log_shards: Option<u64>,

        /// Replicas per log shard
        #[arg(long)]
        log_replicas: Option<u64>,

        /// Print the cluster state as JSON
        #[arg(long)]
        json: bool,

        /// Keep the cluster up until Ctrl-C
        #[arg(long)]
        hold: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            dn_stores,
            log_stores,
            dn_shards,
            log_shards,
            log_replicas,
            json,
            hold,
        } => {
            // File and env first, CLI flags have priority
            let mut options = Options::load(config.as_deref())?;
            if let Some(count) = dn_stores {
                options = options.with_dn_store_count(count);
            }
            if let Some(count) = log_stores {
                options = options.with_log_store_count(count);
            }
            if let Some(count) = dn_shards {
                options = options.with_dn_shard_count(count);
            }
            if let Some(count) = log_shards {
                options = options.with_log_shard_count(count);
            }
            if let Some(count) = log_replicas {
                options = options.with_log_replica_count(count);
            }
            let options = options.validated()?;

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| options.log_level.clone().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            let cluster = Arc::new(ClusterCoordinator::from_options(&options)?);

            let handle = cluster.clone();
            tokio::task::spawn_blocking(move || handle.start()).await??;

            let state = cluster.cluster_state()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                println!("hakeeper term: {}", state.term);
                println!("hakeeper state: {}", state.state);
                println!("bootstrapped: {}", state.state.is_bootstrapped());
                if let Some(info) = &state.cluster_info {
                    for shard in &info.log_shards {
                        println!("log shard {}: {} replicas", shard.shard_id, shard.replicas);
                    }
                    for shard in &info.dn_shards {
                        println!("dn shard {}: log shard {}", shard.shard_id, shard.log_shard_id);
                    }
                }
            }

            if hold {
                tracing::info!("Cluster up, press Ctrl-C to stop");
                tokio::signal::ctrl_c().await?;
            }

            let handle = cluster.clone();
            tokio::task::spawn_blocking(move || handle.stop()).await??;
        }
    }

    Ok(())
}
