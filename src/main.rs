//! Multisig devnet CLI application
//!
//! A command-line interface for deploying and operating daily-limit multisig wallets.

use clap::{Parser, Subcommand};
use gsn_multisig::api::{create_router, ApiState, WsBroadcaster};
use gsn_multisig::cli::{self, AppState};
use gsn_multisig::core::TransactionId;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Parser)]
#[command(name = "multisig")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Multi-signature wallets with a daily limit on a local devnet", long_about = None)]
struct Cli {
    /// Data directory for devnet storage
    #[arg(short, long, default_value = ".multisig_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new devnet
    Init {
        /// Delete any existing devnet first
        #[arg(long)]
        force: bool,
    },

    /// Account operations
    Account {
        #[command(subcommand)]
        action: AccountCommands,
    },

    /// Multisig wallet operations
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Devnet clock
    Time {
        #[command(subcommand)]
        action: TimeCommands,
    },

    /// Show the event log
    Events {
        /// Only events emitted by this contract
        #[arg(short, long)]
        emitter: Option<String>,

        /// Number of most recent events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// REST API server
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Credit devnet funds to an account
    Fund {
        /// Account address or name
        #[arg(short, long)]
        address: String,

        /// Amount in ether
        #[arg(long)]
        amount: String,
    },

    /// List funded accounts
    List,

    /// Show an account balance
    Balance {
        /// Account address or name
        #[arg(short, long)]
        address: String,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Deploy a wallet through the factory
    Create {
        /// Account deploying the wallet
        #[arg(short, long)]
        creator: String,

        /// Comma-separated owner addresses or names
        #[arg(short, long)]
        owners: String,

        /// Confirmations required to execute
        #[arg(short, long)]
        required: usize,

        /// Daily limit in ether
        #[arg(long)]
        daily_limit: Option<String>,

        /// Optional label for the wallet
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List all wallets
    List {
        /// Only wallets deployed by this account
        #[arg(short, long)]
        creator: Option<String>,
    },

    /// Show wallet details
    Info {
        /// Wallet address
        #[arg(short, long)]
        address: String,
    },

    /// Send value to a wallet
    Deposit {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Sending account
        #[arg(short, long)]
        from: String,

        /// Amount in ether
        #[arg(long)]
        amount: String,
    },

    /// Submit a transaction
    Submit {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Submitting owner
        #[arg(short, long)]
        from: String,

        /// Destination address or name
        #[arg(short, long)]
        to: String,

        /// Value in ether
        #[arg(short, long)]
        value: Option<String>,

        /// Hex call data
        #[arg(long)]
        data: Option<String>,

        /// Wallet command as JSON, e.g. {"method":"changeRequirement","params":{"required":1}}
        #[arg(long)]
        command: Option<String>,

        /// Relay hub forwarding the call
        #[arg(long)]
        relay_hub: Option<String>,
    },

    /// Confirm a transaction
    Confirm {
        #[command(flatten)]
        target: TransactionTarget,
    },

    /// Revoke a confirmation
    Revoke {
        #[command(flatten)]
        target: TransactionTarget,
    },

    /// Retry execution of a confirmed transaction
    Execute {
        #[command(flatten)]
        target: TransactionTarget,
    },

    /// List transactions
    Transactions {
        /// Wallet address
        #[arg(short, long)]
        address: String,

        /// Exclude pending transactions
        #[arg(long)]
        no_pending: bool,

        /// Exclude executed transactions
        #[arg(long)]
        no_executed: bool,

        /// First position in the filtered list
        #[arg(long, default_value = "0")]
        from: usize,

        /// Position after the last one shown
        #[arg(long)]
        to: Option<usize>,
    },
}

#[derive(clap::Args)]
struct TransactionTarget {
    /// Wallet address
    #[arg(short, long)]
    address: String,

    /// Acting owner
    #[arg(short, long)]
    from: String,

    /// Transaction id
    #[arg(short, long)]
    id: TransactionId,

    /// Relay hub forwarding the call
    #[arg(long)]
    relay_hub: Option<String>,
}

#[derive(Subcommand)]
enum TimeCommands {
    /// Move the clock forward
    Advance {
        /// Seconds to add
        #[arg(short, long)]
        seconds: u64,
    },

    /// Jump the clock to a later timestamp
    Set {
        /// Unix timestamp in seconds
        #[arg(short, long)]
        timestamp: u64,
    },

    /// Show the current timestamp
    Show,
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Start the REST API server
    Start {
        /// Port to listen on for REST API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Handle init command separately (doesn't need full state)
    if let Commands::Init { force } = &cli.command {
        return cli::cmd_init(&cli.data_dir, *force);
    }

    // Handle API commands with tokio runtime
    if let Commands::Api { ref action } = cli.command {
        return run_api_command(action, &cli.data_dir);
    }

    // Initialize application state
    let mut state = AppState::new(cli.data_dir.clone())?;

    // Process commands
    match cli.command {
        Commands::Init { .. } => unreachable!(),
        Commands::Api { .. } => unreachable!(),

        Commands::Account { action } => match action {
            AccountCommands::Fund { address, amount } => {
                cli::cmd_account_fund(&mut state, &address, &amount)?;
            }
            AccountCommands::List => {
                cli::cmd_account_list(&state)?;
            }
            AccountCommands::Balance { address } => {
                cli::cmd_account_balance(&state, &address)?;
            }
        },

        Commands::Wallet { action } => match action {
            WalletCommands::Create {
                creator,
                owners,
                required,
                daily_limit,
                label,
            } => {
                cli::cmd_wallet_create(
                    &mut state,
                    &creator,
                    &owners,
                    required,
                    daily_limit.as_deref(),
                    label.as_deref(),
                )?;
            }
            WalletCommands::List { creator } => {
                cli::cmd_wallet_list(&state, creator.as_deref())?;
            }
            WalletCommands::Info { address } => {
                cli::cmd_wallet_info(&state, &address)?;
            }
            WalletCommands::Deposit {
                address,
                from,
                amount,
            } => {
                cli::cmd_wallet_deposit(&mut state, &address, &from, &amount)?;
            }
            WalletCommands::Submit {
                address,
                from,
                to,
                value,
                data,
                command,
                relay_hub,
            } => {
                cli::cmd_wallet_submit(
                    &mut state,
                    &address,
                    &from,
                    &to,
                    value.as_deref(),
                    data.as_deref(),
                    command.as_deref(),
                    relay_hub.as_deref(),
                )?;
            }
            WalletCommands::Confirm { target } => {
                cli::cmd_wallet_confirm(
                    &mut state,
                    &target.address,
                    &target.from,
                    target.id,
                    target.relay_hub.as_deref(),
                )?;
            }
            WalletCommands::Revoke { target } => {
                cli::cmd_wallet_revoke(
                    &mut state,
                    &target.address,
                    &target.from,
                    target.id,
                    target.relay_hub.as_deref(),
                )?;
            }
            WalletCommands::Execute { target } => {
                cli::cmd_wallet_execute(
                    &mut state,
                    &target.address,
                    &target.from,
                    target.id,
                    target.relay_hub.as_deref(),
                )?;
            }
            WalletCommands::Transactions {
                address,
                no_pending,
                no_executed,
                from,
                to,
            } => {
                cli::cmd_wallet_transactions(
                    &state,
                    &address,
                    !no_pending,
                    !no_executed,
                    from,
                    to,
                )?;
            }
        },

        Commands::Time { action } => match action {
            TimeCommands::Advance { seconds } => {
                cli::cmd_time_advance(&mut state, seconds)?;
            }
            TimeCommands::Set { timestamp } => {
                cli::cmd_time_set(&mut state, timestamp)?;
            }
            TimeCommands::Show => {
                cli::cmd_time_show(&state)?;
            }
        },

        Commands::Events { emitter, limit } => {
            cli::cmd_events(&state, emitter.as_deref(), limit)?;
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
                let AppState {
                    chain,
                    factory,
                    storage,
                    ..
                } = AppState::new(data_dir.clone())?;

                // Create API state
                let state = ApiState {
                    chain: Arc::new(RwLock::new(chain)),
                    factory: Arc::new(RwLock::new(factory)),
                    storage: Arc::new(storage),
                    ws_broadcaster: Arc::new(WsBroadcaster::new()),
                };

                // Clone state for shutdown handler
                let shutdown_state = state.clone();

                // Create router
                let app = create_router(state);

                // Start server
                let addr = format!("0.0.0.0:{}", port);
                println!("🚀 REST API server starting on http://localhost:{}", port);

                println!();
                println!("📖 Available endpoints:");
                println!("   GET  /health                                  - Health check");
                println!("   GET  /ws                                      - WebSocket events");
                println!("   POST /api/accounts/{{addr}}/fund                - Fund account");
                println!("   GET  /api/accounts/{{addr}}/balance             - Get balance");
                println!("   GET  /api/wallets                             - List wallets");
                println!("   POST /api/wallets                             - Deploy wallet");
                println!("   GET  /api/wallets/{{addr}}                      - Wallet details");
                println!("   POST /api/wallets/{{addr}}/deposit              - Deposit");
                println!("   POST /api/wallets/{{addr}}/relay/accept         - Relay admission");
                println!("   GET  /api/wallets/{{addr}}/transactions         - List transactions");
                println!("   POST /api/wallets/{{addr}}/transactions         - Submit transaction");
                println!("   GET  /api/wallets/{{addr}}/transactions/{{id}}    - Get transaction");
                println!("   POST /api/wallets/{{addr}}/transactions/{{id}}/confirm");
                println!("   POST /api/wallets/{{addr}}/transactions/{{id}}/revoke");
                println!("   POST /api/wallets/{{addr}}/transactions/{{id}}/execute");
                println!("   POST /api/time/advance                        - Advance clock");
                println!("   GET  /api/events                              - Event log");
                println!();

                // Handle Ctrl+C with graceful shutdown
                tokio::spawn(async move {
                    tokio::signal::ctrl_c().await.ok();
                    println!("\n📴 Shutting down API server...");

                    let chain = shutdown_state.chain.read().await;
                    let factory = shutdown_state.factory.read().await;
                    match shutdown_state.storage.save(&chain, &factory) {
                        Ok(()) => println!("✅ Data saved successfully!"),
                        Err(e) => log::error!("Failed to save devnet: {}", e),
                    }
                    std::process::exit(0);
                });

                let listener = tokio::net::TcpListener::bind(&addr).await?;
                axum::serve(listener, app).await?;
            }
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
