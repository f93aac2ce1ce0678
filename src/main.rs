//! quotesync CLI - manage a local quote list and keep it in step with a remote endpoint

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quotesync::console::{self, ConsoleCommand};
use quotesync::events::{self, QuoteEvent};
use quotesync::storage::{KvBackend, MemoryBackend, RedbBackend};
use quotesync::{
    CategoryFilter, Config, HttpGateway, Quote, QuoteDraft, QuoteStore, SyncOutcome,
    SyncScheduler,
};

#[derive(Parser)]
#[command(name = "quotesync")]
#[command(version)]
#[command(about = "Manage a quote list and reconcile it with a remote source")]
#[command(long_about = r#"
Keeps a list of quotes in a local database, filters them by category,
imports and exports JSON, and merges in quotes fetched from a remote
endpoint. On a text collision the remote record wins.

Example usage:
  quotesync add "Simplicity is prerequisite for reliability" --category Engineering
  quotesync filter Engineering
  quotesync sync
  quotesync watch
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Keep quotes in memory only (nothing is written to disk)
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new quote
    Add {
        /// Quote text
        text: String,

        /// Quote category
        #[arg(short = 'C', long, default_value = "")]
        category: String,
    },

    /// List quotes (defaults to the saved category filter)
    List {
        /// Category to show, or "all"
        #[arg(short = 'C', long)]
        category: Option<String>,
    },

    /// Save a category filter and show the matching quotes
    Filter {
        /// Category to select, or "all"
        category: String,
    },

    /// List known categories
    Categories,

    /// Show one random quote
    Random,

    /// Replace all quotes with the contents of a JSON file
    Import {
        /// JSON file containing an array of {text, category}
        file: PathBuf,
    },

    /// Write all quotes as pretty-printed JSON
    Export {
        /// Output file, or "-" for stdout
        #[arg(short, long, default_value = "quotes.json")]
        output: String,
    },

    /// Run one sync cycle against the remote endpoint
    Sync,

    /// Send the local list to the remote endpoint
    Push,

    /// Sync on the configured interval until interrupted, reading edit
    /// commands from stdin (type "help")
    Watch,

    /// Show store and sync status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout stays clean for `export -o -`
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let backend: Box<dyn KvBackend> = if cli.ephemeral {
        Box::new(MemoryBackend::new())
    } else {
        Box::new(RedbBackend::open(&config.storage.database_path()?)?)
    };

    let (events_tx, mut events_rx) = events::channel();
    let store = Arc::new(Mutex::new(QuoteStore::open(backend, events_tx.clone())));
    let gateway = Arc::new(HttpGateway::new(&config.remote)?);
    let scheduler = Arc::new(SyncScheduler::new(
        store.clone(),
        gateway.clone(),
        events_tx,
        Duration::from_secs(config.sync.interval_secs),
    ));

    match cli.command {
        Commands::Add { text, category } => {
            let quote = store.lock().await.add(QuoteDraft::new(text, category))?;
            println!("New quote added successfully: {}", quote);
            if config.sync.push_on_change {
                scheduler.push_local().await;
            }
        }

        Commands::List { category } => {
            let store = store.lock().await;
            let filter = match category {
                Some(c) => c.parse::<CategoryFilter>().unwrap_or_default(),
                None => store.selected_category(),
            };
            print_quotes(&store.filter(&filter));
        }

        Commands::Filter { category } => {
            let filter: CategoryFilter = category.parse().unwrap_or_default();
            let store = store.lock().await;
            store.select_category(&filter)?;
            print_quotes(&store.filter(&filter));
        }

        Commands::Categories => {
            let store = store.lock().await;
            println!("{}", CategoryFilter::All);
            for category in store.categories() {
                println!("{}", category);
            }
        }

        Commands::Random => {
            let store = store.lock().await;
            match store.random_quote(&mut rand::thread_rng()) {
                Some(quote) => println!("{}", quote),
                None => println!("No quotes available."),
            }
        }

        Commands::Import { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let count = store.lock().await.import_json(&contents)?;
            println!("Quotes imported successfully ({} quotes).", count);
            if config.sync.push_on_change {
                scheduler.push_local().await;
            }
        }

        Commands::Export { output } => {
            let json = store.lock().await.export_json()?;
            if output == "-" {
                println!("{}", json);
            } else {
                std::fs::write(&output, json)
                    .with_context(|| format!("Failed to write {}", output))?;
                tracing::info!(path = %output, "exported quotes");
            }
        }

        Commands::Sync => match scheduler.run_cycle().await {
            SyncOutcome::Completed(report) => println!("{}", report.message),
            SyncOutcome::FetchFailed(reason) => {
                println!("Sync skipped, remote unavailable: {}", reason)
            }
            SyncOutcome::ApplyFailed(reason) => {
                anyhow::bail!("Sync fetched quotes but could not save them: {}", reason)
            }
            SyncOutcome::Skipped => println!("A sync is already in progress."),
        },

        Commands::Push => {
            scheduler.push_local().await;
        }

        Commands::Watch => {
            let handle = scheduler.clone().spawn();
            println!(
                "Syncing with {} every {}s, press Ctrl-C or type 'quit' to stop.",
                gateway.endpoint(),
                scheduler.interval().as_secs()
            );

            // Stdin reader
            let (line_tx, mut line_rx) = mpsc::channel::<String>(32);
            tokio::spawn(async move {
                let mut reader = BufReader::new(tokio::io::stdin()).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if line_tx.send(line).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    Some(event) = events_rx.recv() => match event {
                        QuoteEvent::QuotesChanged(quotes) => {
                            println!("Quote list updated ({} quotes).", quotes.len());
                        }
                        QuoteEvent::SyncCompleted(message) => println!("{}", message),
                    },
                    Some(line) = line_rx.recv() => {
                        let command = match ConsoleCommand::parse(&line) {
                            Ok(Some(command)) => command,
                            Ok(None) => continue,
                            Err(e) => {
                                println!("{}", e);
                                continue;
                            }
                        };
                        match command {
                            ConsoleCommand::Quit => break,
                            ConsoleCommand::Sync => {
                                if !handle.trigger() {
                                    println!("A sync is already queued.");
                                }
                            }
                            ConsoleCommand::Push => scheduler.push_local().await,
                            other => match console::apply(&other, &store).await {
                                Ok(reply) => {
                                    println!("{}", reply);
                                    if other.edits_quotes() && config.sync.push_on_change {
                                        scheduler.push_local().await;
                                    }
                                }
                                Err(e) => println!("{}", e),
                            },
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }

            handle.shutdown().await;
        }

        Commands::Status => {
            let store = store.lock().await;
            println!("Backend:           {}", store.backend_name());
            println!("Quotes:            {}", store.len());
            println!("Categories:        {}", store.categories().len());
            println!("Selected filter:   {}", store.selected_category());
            match store.last_synced_at() {
                Some(at) => println!("Last synced:       {}", at.to_rfc3339()),
                None => println!("Last synced:       never"),
            }
            println!("Remote endpoint:   {}", gateway.endpoint());
        }
    }

    Ok(())
}

fn print_quotes(quotes: &[&Quote]) {
    if quotes.is_empty() {
        println!("No quotes available.");
        return;
    }
    for quote in quotes {
        println!("{}", quote);
    }
}
