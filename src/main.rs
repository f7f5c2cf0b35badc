//! # CountBot CLI
//!
//! Daily membership counter and report bot for group chats.
//!
//! Usage:
//!   countbot run                          # Gateway + scheduler until Ctrl+C
//!   countbot report --date 10/05/2024     # Print a report
//!   countbot report --send                # Broadcast today's report
//!   countbot groups sync                  # Re-sync the registry from the bridge
//!   countbot counters                     # Today's counter rows
//!   countbot config init                  # Write a default config

use anyhow::Result;
use clap::{Parser, Subcommand};
use countbot_agent::CountBot;
use countbot_channels::BridgeTransport;
use countbot_core::traits::{CounterStore, GroupRegistry};
use countbot_core::types::Day;
use countbot_core::CountBotConfig;
use countbot_scheduler::{JobHandler, SchedulerEngine};
use countbot_store::SqliteStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "countbot",
    version,
    about = "📊 CountBot: daily join/leave counters and reports for group chats"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook gateway and the scheduler
    Run,

    /// Build the report for a day
    Report {
        /// dd/mm/yyyy or yyyy-mm-dd (default: today)
        #[arg(short, long)]
        date: Option<String>,

        /// Deliver to every selected group instead of printing
        #[arg(long)]
        send: bool,
    },

    /// Seed zeroed counters for a day
    Reset {
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Fill counter gaps from member snapshots
    Repair {
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Group registry
    Groups {
        #[command(subcommand)]
        action: GroupsAction,
    },

    /// Show counter rows for a day
    Counters {
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum GroupsAction {
    /// Groups being counted
    List,
    /// Groups receiving reports
    Selected,
    /// Re-sync the registry from the bridge
    Sync,
    /// Mark a group as a report destination
    Select { id: String, name: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write the default configuration
    Init,
}

fn parse_day(date: Option<&str>) -> Result<Day> {
    Ok(match date {
        Some(raw) => Day::parse(raw)?,
        None => Day::today(),
    })
}

fn build_bot(config: &CountBotConfig) -> Result<(Arc<CountBot>, Arc<SqliteStore>)> {
    let store = Arc::new(countbot_store::open_store(config)?);
    let transport = Arc::new(BridgeTransport::new(&config.bridge)?);
    let bot = CountBot::new(config.clone(), store.clone(), store.clone(), transport);
    Ok((Arc::new(bot), store))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    println!("\n👋 Shutting down.");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "countbot=debug,tower_http=debug"
    } else {
        "countbot=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config_path = cli.config.as_ref().map(PathBuf::from);
    let load_config = || -> Result<CountBotConfig> {
        let config = match &config_path {
            Some(path) => CountBotConfig::load_from(path)?,
            None => CountBotConfig::load()?,
        };
        config.validate()?;
        Ok(config)
    };

    match cli.command {
        Commands::Run => {
            let config = load_config()?;
            let engine = SchedulerEngine::from_config(&config.schedule)?;
            let (bot, _store) = build_bot(&config)?;

            println!("📊 CountBot v{}", env!("CARGO_PKG_VERSION"));
            println!("   Database: {}", config.database_path().display());
            println!("   Bridge:   {}", config.bridge.base_url);
            println!("   Prefix:   {}", config.group_prefix);

            if let Err(e) = bot.update_group_list().await {
                tracing::warn!("Initial group sync failed, continuing with stored registry: {e}");
            }
            let seeded = bot.reset_day(Day::today())?;
            tracing::info!("Today's counters ready ({seeded} seeded)");

            let handler: Arc<dyn JobHandler> = bot.clone();
            let scheduler = tokio::spawn(async move { engine.run(handler).await });

            println!("\nRunning. Press Ctrl+C to stop.");
            tokio::select! {
                result = countbot_gateway::serve(bot, config.gateway.clone(), shutdown_signal()) => result?,
                _ = scheduler => tracing::warn!("Scheduler stopped"),
            }
        }

        Commands::Report { date, send } => {
            let config = load_config()?;
            let day = parse_day(date.as_deref())?;
            let (bot, _store) = build_bot(&config)?;
            if send {
                let delivered = bot.broadcast_report(day).await?;
                println!("✅ Report for {day} sent to {delivered} groups");
            } else {
                let report = bot.build_report(day, bot.lookup_policy()).await?;
                print!("{report}");
            }
        }

        Commands::Reset { date } => {
            let config = load_config()?;
            let day = parse_day(date.as_deref())?;
            let store = countbot_store::open_store(&config)?;
            let seeded = store.initialize_day(day)?;
            println!("🌅 {day}: {seeded} counters seeded");
        }

        Commands::Repair { date } => {
            let config = load_config()?;
            let day = parse_day(date.as_deref())?;
            let (bot, _store) = build_bot(&config)?;
            let summary = bot.repair_day(day).await?;
            println!("🩹 {day}: {summary}");
        }

        Commands::Groups { action } => {
            let config = load_config()?;
            match action {
                GroupsAction::List => {
                    let store = countbot_store::open_store(&config)?;
                    let groups = store.list_groups()?;
                    println!("Monitored groups ({}):", groups.len());
                    for group in groups {
                        println!("  {}  {}", group.id, group.name);
                    }
                }
                GroupsAction::Selected => {
                    let store = countbot_store::open_store(&config)?;
                    let groups = store.list_selected()?;
                    println!("Report destinations ({}):", groups.len());
                    for group in groups {
                        println!("  {}  {}", group.id, group.name);
                    }
                }
                GroupsAction::Sync => {
                    let (bot, _store) = build_bot(&config)?;
                    let groups = bot.update_group_list().await?;
                    println!("✅ {} groups monitored", groups.len());
                }
                GroupsAction::Select { id, name } => {
                    let store = countbot_store::open_store(&config)?;
                    store.mark_selected(&id, name.trim())?;
                    println!("✅ Selected {id} ({})", name.trim());
                }
            }
        }

        Commands::Counters { date } => {
            let config = load_config()?;
            let day = parse_day(date.as_deref())?;
            let store = countbot_store::open_store(&config)?;
            let counters = store.get_counters(day)?;
            if counters.is_empty() {
                println!("(no counters for {day})");
            }
            for c in &counters {
                println!("  {:<40} +{:<5} -{:<5} {}", c.group_id, c.entries, c.exits, c.updated_at);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let content = toml::to_string_pretty(&load_config()?)?;
                println!("{content}");
            }
            ConfigAction::Init => {
                let path = config_path.clone().unwrap_or_else(CountBotConfig::default_path);
                if path.exists() {
                    println!("⚠️  Config already exists: {}", path.display());
                } else {
                    CountBotConfig::default().save_to(&path)?;
                    println!("✅ Config saved to: {}", path.display());
                }
            }
        },
    }

    Ok(())
}
