//! CLI commands for the multisig devnet
//!
//! Implements all command handlers for the CLI interface. Every command
//! loads the persisted devnet, syncs its clock and saves it again after
//! a mutation.

use crate::core::{
    format_ether, parse_ether, unix_now, Address, AddressError, ChainState, TransactionId, Wei,
};
use crate::multisig::{
    CallOrigin, ExecutionOutcome, MultisigConfig, Payload, RelayRecipient, WalletCommand,
    WalletFactory,
};
use crate::storage::{Storage, StorageConfig};
use std::path::PathBuf;
use std::str::FromStr;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Seed of the devnet factory address
pub const FACTORY_SEED: &str = "multisig-wallet-factory";

/// The factory every devnet wallet is deployed through
pub fn devnet_factory() -> WalletFactory {
    WalletFactory::new(
        Address::from_seed(FACTORY_SEED),
        "MultiSig Wallet Factory",
        "MSWF",
    )
}

/// Parse an address, or derive one from an account name such as `alice`
///
/// Anything with a `0x` prefix or 40 hex digits must be a valid address.
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let trimmed = input.trim();
    let hex_like = trimmed.starts_with("0x")
        || trimmed.starts_with("0X")
        || (trimmed.len() == 40 && trimmed.chars().all(|c| c.is_ascii_hexdigit()));

    if hex_like {
        Address::from_str(trimmed)
    } else {
        Ok(Address::from_seed(trimmed))
    }
}

/// Parse a comma-separated list of addresses or account names
pub fn parse_addresses(input: &str) -> Result<Vec<Address>, AddressError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_address)
        .collect()
}

/// Application state
pub struct AppState {
    pub chain: ChainState,
    pub factory: WalletFactory,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the devnet, creating a fresh one if none exists
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage = open_storage(&data_dir)?;

        let (mut chain, factory) = if storage.exists() {
            log::debug!("Loading devnet from {:?}", data_dir);
            let snapshot = storage.load()?;
            (snapshot.state, snapshot.factory)
        } else {
            println!("🆕 Creating new devnet...");
            let chain = ChainState::with_timestamp(unix_now());
            let factory = devnet_factory();
            storage.save(&chain, &factory)?;
            (chain, factory)
        };
        chain.sync_clock(unix_now());

        Ok(Self {
            chain,
            factory,
            storage,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.chain, &self.factory)?;
        Ok(())
    }

    /// Print log entries emitted since `mark`
    fn print_events_since(&self, mark: usize) {
        for entry in self.chain.events_since(mark) {
            println!(
                "   📣 {} from {}",
                entry.event.name(),
                entry.emitter.short()
            );
        }
    }
}

fn open_storage(data_dir: &PathBuf) -> CliResult<Storage> {
    let storage_config = StorageConfig {
        data_dir: data_dir.clone(),
        ..Default::default()
    };
    Ok(Storage::new(storage_config)?)
}

fn print_outcome(outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Executed => println!("✅ Transaction executed"),
        ExecutionOutcome::Pending => println!("⏳ Waiting for more confirmations"),
        ExecutionOutcome::Failed(reason) => {
            println!("❌ Execution failed: {}", reason);
            println!("   The transaction stays pending and can be retried");
        }
    }
}

fn call_origin(from: &str, relay_hub: Option<&str>) -> Result<CallOrigin, AddressError> {
    let from = parse_address(from)?;
    Ok(match relay_hub {
        Some(hub) => CallOrigin::Relayed {
            hub: parse_address(hub)?,
            from,
        },
        None => CallOrigin::Direct { sender: from },
    })
}

// ============================================================================
// Devnet
// ============================================================================

/// Initialize a new devnet
pub fn cmd_init(data_dir: &PathBuf, force: bool) -> CliResult<()> {
    let storage = open_storage(data_dir)?;

    if storage.exists() {
        if !force {
            println!("⚠️  Devnet already exists at {:?}", data_dir);
            println!("   Use --force to reinitialize (this will delete existing data)");
            return Ok(());
        }
        storage.delete()?;
        println!("🗑️  Deleted existing devnet");
    }

    let chain = ChainState::with_timestamp(unix_now());
    let factory = devnet_factory();
    storage.save(&chain, &factory)?;

    println!("✅ Devnet initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   🏭 Factory: {} ({})", factory.address(), factory.name());
    println!("   🕒 Timestamp: {}", chain.timestamp());

    Ok(())
}

// ============================================================================
// Accounts
// ============================================================================

/// Credit devnet funds to an account
pub fn cmd_account_fund(state: &mut AppState, address: &str, amount: &str) -> CliResult<()> {
    let address = parse_address(address)?;
    let amount = parse_ether(amount)?;

    let balance = state.chain.mint(&address, amount)?;
    state.save()?;

    println!("💰 Funded {} with {} ether", address, format_ether(amount));
    println!("   New balance: {} ether", format_ether(balance));

    Ok(())
}

/// List every funded account
pub fn cmd_account_list(state: &AppState) -> CliResult<()> {
    let accounts = state.chain.accounts();

    if accounts.is_empty() {
        println!("📭 No funded accounts. Fund one with: multisig account fund");
        return Ok(());
    }

    println!("📋 Accounts:");
    for (address, balance) in accounts {
        let kind = if state.factory.is_multisig_wallet(&address) {
            " (wallet)"
        } else {
            ""
        };
        println!("   {}{} - {} ether", address, kind, format_ether(balance));
    }

    Ok(())
}

/// Show an account balance
pub fn cmd_account_balance(state: &AppState, address: &str) -> CliResult<()> {
    let address = parse_address(address)?;
    let balance = state.chain.balance_of(&address);

    println!("💰 Balance for {}", address);
    println!("   {} ether ({} wei)", format_ether(balance), balance);

    Ok(())
}

// ============================================================================
// Wallets
// ============================================================================

/// Deploy a new wallet through the factory
pub fn cmd_wallet_create(
    state: &mut AppState,
    creator: &str,
    owners: &str,
    required: usize,
    daily_limit: Option<&str>,
    label: Option<&str>,
) -> CliResult<()> {
    let creator = parse_address(creator)?;
    let daily_limit = daily_limit.map(parse_ether).transpose()?;
    let mut config = MultisigConfig::new(parse_addresses(owners)?, required, daily_limit);
    if let Some(label) = label {
        config = config.with_label(label);
    }

    let address = state.factory.create(&mut state.chain, creator, config)?;
    state.save()?;

    let wallet = state.factory.wallet(&address)?;
    println!("🔐 Multisig wallet deployed!");
    println!("   📍 Address: {}", address);
    println!("   👥 Policy: {}", wallet.description());
    for owner in wallet.owners() {
        println!("   └─ {}", owner);
    }
    match wallet.daily_limit() {
        Some(limit) => println!("   📅 Daily limit: {} ether", format_ether(limit)),
        None => println!("   📅 Daily limit: none"),
    }

    Ok(())
}

/// List all wallets, or those deployed by one creator
pub fn cmd_wallet_list(state: &AppState, creator: Option<&str>) -> CliResult<()> {
    let wallets = match creator {
        Some(creator) => {
            let creator = parse_address(creator)?;
            let mut wallets = Vec::new();
            for address in state.factory.deployed_wallets(&creator) {
                wallets.push(state.factory.wallet(address)?);
            }
            wallets
        }
        None => state.factory.list(),
    };

    if wallets.is_empty() {
        println!("📭 No wallets found. Create one with: multisig wallet create");
        return Ok(());
    }

    println!("📋 Wallets:");
    for wallet in wallets {
        let label = wallet.label().unwrap_or("-");
        println!(
            "   {} ({}) - {} - {} ether",
            wallet.address(),
            label,
            wallet.description(),
            format_ether(state.chain.balance_of(&wallet.address()))
        );
    }

    Ok(())
}

/// Show wallet details
pub fn cmd_wallet_info(state: &AppState, address: &str) -> CliResult<()> {
    let wallet = state.factory.wallet(&parse_address(address)?)?;
    let now = state.chain.synced_timestamp(unix_now());

    println!("🔐 Wallet {}", wallet.address());
    if let Some(label) = wallet.label() {
        println!("   ├─ Label: {}", label);
    }
    println!("   ├─ Policy: {}", wallet.description());
    println!(
        "   ├─ Balance: {} ether",
        format_ether(state.chain.balance_of(&wallet.address()))
    );
    if let Some(tracker) = wallet.daily_limit_tracker() {
        println!("   ├─ Daily limit: {} ether", format_ether(tracker.limit()));
        println!(
            "   ├─ Withdrawable today: {} ether",
            format_ether(wallet.calc_max_withdraw(now))
        );
    }
    println!(
        "   ├─ Transactions: {} pending, {} executed",
        wallet.transaction_count(true, false),
        wallet.transaction_count(false, true)
    );
    println!("   ├─ Relay hub: {}", wallet.relay_hub());
    println!("   └─ Owners:");
    for owner in wallet.owners() {
        println!("      └─ {}", owner);
    }

    Ok(())
}

/// Send value to a wallet
pub fn cmd_wallet_deposit(
    state: &mut AppState,
    address: &str,
    from: &str,
    amount: &str,
) -> CliResult<()> {
    let address = parse_address(address)?;
    let from = parse_address(from)?;
    let amount: Wei = parse_ether(amount)?;

    let wallet = state.factory.wallet(&address)?;
    wallet.deposit(&mut state.chain, from, amount)?;
    state.save()?;

    println!("📥 Deposited {} ether into {}", format_ether(amount), address);
    println!(
        "   Wallet balance: {} ether",
        format_ether(state.chain.balance_of(&address))
    );

    Ok(())
}

/// Submit a transaction to a wallet
#[allow(clippy::too_many_arguments)]
pub fn cmd_wallet_submit(
    state: &mut AppState,
    address: &str,
    from: &str,
    to: &str,
    value: Option<&str>,
    data: Option<&str>,
    command: Option<&str>,
    relay_hub: Option<&str>,
) -> CliResult<()> {
    let address = parse_address(address)?;
    let destination = parse_address(to)?;
    let value = value.map(parse_ether).transpose()?.unwrap_or(0);
    let payload = match (command, data) {
        (Some(_), Some(_)) => return Err("Provide either --data or --command, not both".into()),
        (Some(command), None) => Payload::Command(serde_json::from_str::<WalletCommand>(command)?),
        (None, Some(data)) => Payload::from_hex(data)?,
        (None, None) => Payload::None,
    };

    let mark = state.chain.events().len();
    let wallet = state.factory.wallet_mut(&address)?;
    let (id, outcome) = wallet.relay_call(call_origin(from, relay_hub)?, |wallet, caller| {
        wallet.submit_transaction(&mut state.chain, caller, destination, value, payload)
    })?;
    state.save()?;

    println!("📤 Transaction {} submitted to {}", id, address);
    println!("   To: {}", destination);
    println!("   Value: {} ether", format_ether(value));
    print_outcome(&outcome);
    state.print_events_since(mark);

    Ok(())
}

/// Confirm a transaction
pub fn cmd_wallet_confirm(
    state: &mut AppState,
    address: &str,
    from: &str,
    id: TransactionId,
    relay_hub: Option<&str>,
) -> CliResult<()> {
    let address = parse_address(address)?;
    let mark = state.chain.events().len();

    let wallet = state.factory.wallet_mut(&address)?;
    let (caller, outcome) = wallet.relay_call(call_origin(from, relay_hub)?, |wallet, caller| {
        Ok((caller, wallet.confirm_transaction(&mut state.chain, caller, id)?))
    })?;
    let confirmations = wallet.confirmation_count(id)?;
    let required = wallet.required();
    state.save()?;

    println!(
        "✍️  Transaction {} confirmed by {} ({}/{})",
        id,
        caller.short(),
        confirmations,
        required
    );
    print_outcome(&outcome);
    state.print_events_since(mark);

    Ok(())
}

/// Revoke a confirmation
pub fn cmd_wallet_revoke(
    state: &mut AppState,
    address: &str,
    from: &str,
    id: TransactionId,
    relay_hub: Option<&str>,
) -> CliResult<()> {
    let address = parse_address(address)?;

    let wallet = state.factory.wallet_mut(&address)?;
    let caller = wallet.relay_call(call_origin(from, relay_hub)?, |wallet, caller| {
        wallet.revoke_confirmation(&mut state.chain, caller, id)?;
        Ok(caller)
    })?;
    state.save()?;

    println!("↩️  {} revoked confirmation of transaction {}", caller.short(), id);

    Ok(())
}

/// Retry execution of a confirmed transaction
pub fn cmd_wallet_execute(
    state: &mut AppState,
    address: &str,
    from: &str,
    id: TransactionId,
    relay_hub: Option<&str>,
) -> CliResult<()> {
    let address = parse_address(address)?;
    let mark = state.chain.events().len();

    let wallet = state.factory.wallet_mut(&address)?;
    let outcome = wallet.relay_call(call_origin(from, relay_hub)?, |wallet, caller| {
        wallet.execute_transaction(&mut state.chain, caller, id)
    })?;
    state.save()?;

    print_outcome(&outcome);
    state.print_events_since(mark);

    Ok(())
}

/// List a wallet's transactions
pub fn cmd_wallet_transactions(
    state: &AppState,
    address: &str,
    pending: bool,
    executed: bool,
    from: usize,
    to: Option<usize>,
) -> CliResult<()> {
    let wallet = state.factory.wallet(&parse_address(address)?)?;
    let ids = wallet.transaction_ids(from, to.unwrap_or(usize::MAX), pending, executed)?;

    if ids.is_empty() {
        println!("📭 No matching transactions");
        return Ok(());
    }

    println!("📜 Transactions of {}:", wallet.address());
    for id in ids {
        let tx = wallet.transaction(id)?;
        println!(
            "   #{} | {} | {} ether -> {} | {}/{} confirmations{}",
            id,
            wallet.status(id)?,
            format_ether(tx.value),
            tx.destination.short(),
            wallet.confirmation_count(id)?,
            wallet.required(),
            if tx.payload.is_empty() { "" } else { " | with payload" }
        );
    }

    Ok(())
}

// ============================================================================
// Clock and events
// ============================================================================

/// Move the devnet clock forward
pub fn cmd_time_advance(state: &mut AppState, seconds: u64) -> CliResult<()> {
    state.chain.advance_time(seconds);
    state.save()?;

    println!("⏩ Clock advanced by {}s", seconds);
    println!("   Timestamp: {}", state.chain.timestamp());

    Ok(())
}

/// Jump the devnet clock to an absolute timestamp
pub fn cmd_time_set(state: &mut AppState, timestamp: u64) -> CliResult<()> {
    state.chain.set_timestamp(timestamp)?;
    state.save()?;

    println!("🕒 Clock set to {}", state.chain.timestamp());

    Ok(())
}

/// Show the devnet clock
pub fn cmd_time_show(state: &AppState) -> CliResult<()> {
    println!("🕒 Timestamp: {}", state.chain.timestamp());
    println!("   Advanced by: {}s", state.chain.time_offset());

    Ok(())
}

/// Print the event log
pub fn cmd_events(state: &AppState, emitter: Option<&str>, limit: usize) -> CliResult<()> {
    let entries: Vec<_> = match emitter {
        Some(emitter) => state.chain.events_for(&parse_address(emitter)?),
        None => state.chain.events().iter().collect(),
    };

    if entries.is_empty() {
        println!("📭 No events");
        return Ok(());
    }

    let skip = entries.len().saturating_sub(limit);
    println!("📣 Events ({} total):", entries.len());
    for entry in entries.into_iter().skip(skip) {
        println!(
            "   {} | {} | {}",
            entry.timestamp,
            entry.emitter.short(),
            serde_json::to_string(&entry.event)?
        );
    }

    Ok(())
}
