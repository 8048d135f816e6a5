//! Quorum-Ledger CLI Application
//!
//! A command-line interface for managing threshold-authorization ledgers.

use clap::{Parser, Subcommand};
use quorum_ledger::api::{create_router, ApiState, WsBroadcaster};
use quorum_ledger::cli::{self, AppState};
use quorum_ledger::dispatch::LogDispatcher;
use quorum_ledger::ledger::LedgerManager;
use quorum_ledger::storage::{Storage, StorageConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Parser)]
#[command(name = "qledger")]
#[command(version = "0.1.0")]
#[command(about = "A threshold-authorization ledger for shared asset pools", long_about = None)]
struct Cli {
    /// Data directory for ledger storage
    #[arg(short, long, default_value = ".qledger_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the ledger store
    Init,

    /// Create a new ledger
    Create {
        /// Owner identifiers (comma-separated)
        #[arg(short, long)]
        owners: String,

        /// Confirmations required before execution
        #[arg(short, long)]
        threshold: u32,

        /// Optional label for the ledger
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List all ledgers
    List,

    /// Show a ledger and its operations
    Show {
        /// Ledger address
        #[arg(short, long)]
        address: String,
    },

    /// Deposit assets into a ledger's pool
    Deposit {
        /// Ledger address
        #[arg(short, long)]
        address: String,

        /// Sender identity
        #[arg(short, long)]
        from: String,

        /// Amount in the smallest unit
        #[arg(long)]
        amount: u128,
    },

    /// Submit an outgoing operation
    Submit {
        /// Ledger address
        #[arg(short, long)]
        address: String,

        /// Calling owner
        #[arg(short, long)]
        caller: String,

        /// Target of the transfer or call
        #[arg(short, long)]
        target: String,

        /// Amount in the smallest unit
        #[arg(long, default_value = "0")]
        amount: u128,

        /// Hex-encoded call payload (omit for a plain transfer)
        #[arg(short, long)]
        payload: Option<String>,
    },

    /// Confirm an operation
    Confirm {
        /// Ledger address
        #[arg(short, long)]
        address: String,

        /// Calling owner
        #[arg(short, long)]
        caller: String,

        /// Operation index
        #[arg(short, long)]
        index: u64,
    },

    /// Execute an approved operation
    Execute {
        /// Ledger address
        #[arg(short, long)]
        address: String,

        /// Calling owner
        #[arg(short, long)]
        caller: String,

        /// Operation index
        #[arg(short, long)]
        index: u64,
    },

    /// Show a ledger's event log
    Events {
        /// Ledger address
        #[arg(short, long)]
        address: String,

        /// First sequence number to show
        #[arg(short, long, default_value = "0")]
        since: u64,
    },

    /// REST API server
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Start the REST API server
    Start {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Handle init command separately (doesn't need full state)
    if let Commands::Init = &cli.command {
        return cli::cmd_init(&cli.data_dir);
    }

    // Handle API commands with tokio runtime
    if let Commands::Api { ref action } = cli.command {
        return run_api_command(action, &cli.data_dir);
    }

    // Initialize application state
    let mut state = AppState::new(cli.data_dir.clone())?;

    // Process commands
    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Api { .. } => unreachable!(),

        Commands::Create {
            owners,
            threshold,
            label,
        } => {
            cli::cmd_create(&mut state, &owners, threshold, label.as_deref())?;
        }

        Commands::List => {
            cli::cmd_list(&state)?;
        }

        Commands::Show { address } => {
            cli::cmd_show(&state, &address)?;
        }

        Commands::Deposit {
            address,
            from,
            amount,
        } => {
            cli::cmd_deposit(&mut state, &address, &from, amount)?;
        }

        Commands::Submit {
            address,
            caller,
            target,
            amount,
            payload,
        } => {
            cli::cmd_submit(
                &mut state,
                &address,
                &caller,
                &target,
                amount,
                payload.as_deref(),
            )?;
        }

        Commands::Confirm {
            address,
            caller,
            index,
        } => {
            cli::cmd_confirm(&mut state, &address, &caller, index)?;
        }

        Commands::Execute {
            address,
            caller,
            index,
        } => {
            cli::cmd_execute(&mut state, &address, &caller, index)?;
        }

        Commands::Events { address, since } => {
            cli::cmd_events(&state, &address, since)?;
        }
    }

    Ok(())
}

fn run_api_command(
    action: &ApiCommands,
    data_dir: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match action {
            ApiCommands::Start { port } => {
                // Initialize storage
                let storage_config = StorageConfig {
                    data_dir: data_dir.clone(),
                    ..Default::default()
                };
                let storage = Arc::new(Storage::new(storage_config)?);

                // Load or create the ledger set
                let manager = if storage.exists() {
                    println!("📂 Loading existing ledgers...");
                    Arc::new(RwLock::new(storage.load()?))
                } else {
                    println!("📂 Starting with an empty ledger set...");
                    let manager = LedgerManager::new();
                    storage.save(&manager)?;
                    Arc::new(RwLock::new(manager))
                };

                // Create WebSocket broadcaster
                let ws_broadcaster = Arc::new(WsBroadcaster::new());

                let state = ApiState {
                    manager,
                    storage,
                    dispatcher: Arc::new(LogDispatcher::new()),
                    ws_broadcaster,
                };

                let app = create_router(state);
                let addr = format!("0.0.0.0:{}", port);

                println!("🌐 REST API listening on http://{}", addr);
                println!("   WebSocket event stream at ws://{}/ws", addr);

                let listener = tokio::net::TcpListener::bind(&addr).await?;
                axum::serve(listener, app).await?;

                Ok(())
            }
        }
    })
}
