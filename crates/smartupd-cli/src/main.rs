//! smartupd CLI
//!
//! Command-line interface for interacting with the smartupd daemon

use clap::{Parser, Subcommand};
use color_eyre::Result;
use smartupd_client::{HttpClient, WsClient, events_url};
use tracing_subscriber::EnvFilter;

mod output;

#[derive(Parser)]
#[command(name = "smartupd-cli")]
#[command(about = "Inspect and trigger Home Assistant updates through smartupd", long_about = None)]
#[command(version)]
struct Cli {
    /// Daemon base URL
    #[arg(
        long,
        global = true,
        env = "SMARTUPD_URL",
        default_value = "http://127.0.0.1:8124"
    )]
    url: String,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show pending updates
    Status,
    /// Force an aggregation cycle and show the result
    Refresh,
    /// Show applied updates, newest first
    History {
        /// Only show the newest N records
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Install updates for the given entities, in order
    Update {
        /// Entity ids, e.g. update.mushroom_update
        #[arg(required = true)]
        entity_ids: Vec<String>,
    },
    /// Show or change auto-update options
    #[command(subcommand)]
    Options(OptionsCommand),
    /// Stream live events
    Watch,
}

#[derive(Subcommand)]
enum OptionsCommand {
    /// Show current options
    Show,
    /// Change options; unset flags keep their value
    Set {
        /// Daily run time, HH:MM or HH:MM:SS
        #[arg(long)]
        time: Option<String>,
        /// Entity to update automatically (repeatable, replaces the list)
        #[arg(long = "entity")]
        entities: Vec<String>,
        /// Remove all entities from the auto-update list
        #[arg(long, conflicts_with = "entities")]
        clear_entities: bool,
        /// Restart Home Assistant after automatic updates
        #[arg(long)]
        auto_restart: Option<bool>,
    },
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = HttpClient::new(&cli.url)?;

    match cli.command {
        Commands::Status => {
            let snapshot = client.sensor().await?;
            if cli.json {
                print_json(&snapshot)?;
            } else {
                print!("{}", output::snapshot(&snapshot));
            }
        }
        Commands::Refresh => {
            let snapshot = client.refresh_sensor().await?;
            if cli.json {
                print_json(&snapshot)?;
            } else {
                print!("{}", output::snapshot(&snapshot));
            }
        }
        Commands::History { limit } => {
            let mut records = client.history().await?;
            if let Some(limit) = limit {
                records.truncate(limit);
            }
            if cli.json {
                print_json(&records)?;
            } else {
                print!("{}", output::history(&records));
            }
        }
        Commands::Update { entity_ids } => {
            let result = client.update_selected(entity_ids).await?;
            if cli.json {
                print_json(&result)?;
            } else {
                println!("Processed {}", result.requested.join(", "));
                print!("{}", output::history(&result.applied));
            }
        }
        Commands::Options(OptionsCommand::Show) => {
            let options = client.options().await?;
            if cli.json {
                print_json(&options)?;
            } else {
                print!("{}", output::options(&options));
            }
        }
        Commands::Options(OptionsCommand::Set {
            time,
            entities,
            clear_entities,
            auto_restart,
        }) => {
            let mut builder = client.set_options();
            if let Some(time) = time {
                builder = builder.time(time);
            }
            if clear_entities {
                builder = builder.entities(Vec::<String>::new());
            } else if !entities.is_empty() {
                builder = builder.entities(entities);
            }
            if let Some(enabled) = auto_restart {
                builder = builder.auto_restart(enabled);
            }
            let options = builder.send().await?;
            if cli.json {
                print_json(&options)?;
            } else {
                print!("{}", output::options(&options));
            }
        }
        Commands::Watch => {
            let mut events = WsClient::connect(events_url(&cli.url)?).await?;
            while let Some(event) = events.recv().await {
                if cli.json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    println!("{}", output::event(&event));
                }
            }
        }
    }

    Ok(())
}
