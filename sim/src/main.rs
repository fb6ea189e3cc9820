//! fluxstate simulator
//!
//! Runs the posts and plugins stores against in-process simulated servers
//! and prints what ended up in the local database.
//!
//! Usage:
//!   fluxstate-sim --db state.db --posts 45 --page-size 20
//!
//! Without `--db` the database lives in memory. `RUST_LOG` overrides the
//! log filter.

use anyhow::{Context, Result};
use clap::Parser;
use fluxstate_domains::{DeleteMode, PluginStoreConfig, PostStoreConfig, SimulatedServiceConfig};
use fluxstate_sim::{ScenarioConfig, run_scenario};
use fluxstate_storage::{PersistenceGateway, SqliteGateway};
use fluxstate_types::OwnerId;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fluxstate-sim")]
#[command(about = "Drive fluxstate stores against simulated servers")]
struct Args {
    /// SQLite database file (in memory if omitted)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Site id used for every request
    #[arg(long, default_value = "1")]
    site: i64,

    /// Posts seeded on the simulated server
    #[arg(long, default_value = "45")]
    posts: usize,

    /// Posts requested per list fetch
    #[arg(long, default_value = "20")]
    page_size: usize,

    /// Plugins seeded in the simulated directory
    #[arg(long, default_value = "120")]
    directory: usize,

    /// Plugins requested per directory page
    #[arg(long, default_value = "50")]
    directory_page_size: usize,

    /// Simulated network latency in milliseconds
    #[arg(long, default_value = "0")]
    latency_ms: u64,

    /// Server does not echo creation dates on push
    #[arg(long)]
    no_echo_date: bool,

    /// Delete permanently instead of trashing first
    #[arg(long)]
    hard_delete: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn scenario(&self) -> ScenarioConfig {
        ScenarioConfig {
            site: OwnerId::new(self.site),
            seeded_posts: self.posts,
            seeded_directory: self.directory,
            posts: PostStoreConfig {
                page_size: self.page_size,
            },
            plugins: PluginStoreConfig {
                directory_page_size: self.directory_page_size,
            },
            service: SimulatedServiceConfig {
                latency: Duration::from_millis(self.latency_ms),
                echo_date_created: !self.no_echo_date,
                delete_mode: if self.hard_delete {
                    DeleteMode::Remove
                } else {
                    DeleteMode::Trash
                },
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("fluxstate simulator starting...");
    let gateway: Arc<dyn PersistenceGateway> = match &args.db {
        Some(path) => {
            info!("Opening database at {:?}", path);
            Arc::new(SqliteGateway::open(path).context("Failed to open database")?)
        }
        None => Arc::new(SqliteGateway::open_in_memory().context("Failed to open database")?),
    };

    let report = run_scenario(gateway, &args.scenario()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n========================================");
    println!("  fluxstate scenario complete");
    println!("========================================");
    println!("  Posts:             {}", report.posts);
    println!("  Pages:             {}", report.pages);
    println!("  Locally changed:   {}", report.locally_changed);
    println!("  Server posts:      {}", report.server_posts);
    println!("  Post pages:        {}", report.post_pages_fetched);
    println!("  Site plugins:      {}", report.site_plugins);
    println!("  Directory plugins: {}", report.directory_plugins);
    println!("  Directory pages:   {}", report.directory_pages_fetched);
    println!("  Events:            {} ({} errors)", report.events, report.errors);
    println!("========================================\n");
    Ok(())
}
