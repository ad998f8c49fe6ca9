//! REST API handlers for wallet operations

use crate::api::websocket::{WsBroadcaster, WsEvent};
use crate::core::{
    format_ether, parse_ether, unix_now, Address, ChainState, LogEntry, TransactionId, Wei,
};
use crate::multisig::{
    CallOrigin, ExecutionOutcome, MultisigConfig, MultisigError, MultisigWallet, Payload,
    RelayAcceptance, RelayRecipient, RelayRequest, Transaction, WalletCommand, WalletFactory,
};
use crate::storage::Storage;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub chain: Arc<RwLock<ChainState>>,
    pub factory: Arc<RwLock<WalletFactory>>,
    pub storage: Arc<Storage>,
    pub ws_broadcaster: Arc<WsBroadcaster>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub address: Address,
    /// Balance in wei
    pub balance: String,
    pub balance_ether: String,
}

#[derive(Debug, Serialize)]
pub struct WalletInfo {
    pub address: Address,
    pub label: Option<String>,
    pub owners: Vec<Address>,
    pub required: usize,
    pub description: String,
    pub daily_limit: Option<String>,
    pub spent_today: Option<String>,
    pub max_withdraw: String,
    pub balance: String,
    pub pending_transactions: usize,
    pub executed_transactions: usize,
    pub relay_hub: Address,
    pub created_at: String,
}

impl WalletInfo {
    fn new(wallet: &MultisigWallet, chain: &ChainState) -> Self {
        let tracker = wallet.daily_limit_tracker();
        Self {
            address: wallet.address(),
            label: wallet.label().map(str::to_string),
            owners: wallet.owners().to_vec(),
            required: wallet.required(),
            description: wallet.description(),
            daily_limit: tracker.map(|t| t.limit().to_string()),
            spent_today: tracker.map(|t| t.spent_today().to_string()),
            max_withdraw: wallet
                .calc_max_withdraw(chain.synced_timestamp(unix_now()))
                .to_string(),
            balance: chain.balance_of(&wallet.address()).to_string(),
            pending_transactions: wallet.transaction_count(true, false),
            executed_transactions: wallet.transaction_count(false, true),
            relay_hub: wallet.relay_hub(),
            created_at: wallet.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionInfo {
    pub id: TransactionId,
    pub destination: Address,
    pub value: String,
    pub payload: Payload,
    pub executed: bool,
    pub status: String,
    pub confirmations: Vec<Address>,
    pub submitted_at: u64,
}

impl TransactionInfo {
    fn new(wallet: &MultisigWallet, id: TransactionId, tx: &Transaction) -> Self {
        Self {
            id,
            destination: tx.destination,
            value: tx.value.to_string(),
            payload: tx.payload.clone(),
            executed: tx.executed,
            status: wallet
                .status(id)
                .map(|s| s.to_string())
                .unwrap_or_default(),
            confirmations: wallet.confirmations(id).unwrap_or_default(),
            submitted_at: tx.submitted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExecutionResponse {
    pub outcome: ExecutionOutcome,
    pub transaction: TransactionInfo,
}

#[derive(Debug, Serialize)]
pub struct TimeResponse {
    pub timestamp: u64,
    pub offset: u64,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct FundRequest {
    /// Amount in ether
    pub amount: String,
}

#[derive(Deserialize)]
pub struct CreateWalletRequest {
    pub creator: Address,
    pub owners: Vec<Address>,
    pub required: usize,
    /// Daily limit in ether
    pub daily_limit: Option<String>,
    pub label: Option<String>,
}

#[derive(Deserialize)]
pub struct DepositRequest {
    pub from: Address,
    /// Amount in ether
    pub amount: String,
}

#[derive(Deserialize)]
pub struct SubmitTransactionRequest {
    pub from: Address,
    pub destination: Address,
    /// Value in ether
    #[serde(default)]
    pub value: Option<String>,
    /// Hex call data
    #[serde(default)]
    pub data: Option<String>,
    /// Wallet command, for transactions addressed to the wallet
    #[serde(default)]
    pub command: Option<WalletCommand>,
    /// Relay hub that forwarded the call, if any
    #[serde(default)]
    pub relay_hub: Option<Address>,
}

#[derive(Deserialize)]
pub struct TransactionActionRequest {
    pub from: Address,
    #[serde(default)]
    pub relay_hub: Option<Address>,
}

#[derive(Deserialize)]
pub struct TransactionsQuery {
    #[serde(default = "default_true")]
    pub pending: bool,
    #[serde(default = "default_true")]
    pub executed: bool,
    #[serde(default)]
    pub from: usize,
    pub to: Option<usize>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct AdvanceTimeRequest {
    pub seconds: u64,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    pub emitter: Option<Address>,
    #[serde(default)]
    pub since: usize,
}

// ============================================================================
// Helpers
// ============================================================================

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: message.into(),
        }),
    )
}

fn multisig_error(err: MultisigError) -> (StatusCode, Json<ApiError>) {
    let status = match err {
        MultisigError::WalletNotFound(_) | MultisigError::UnknownTransaction(_) => {
            StatusCode::NOT_FOUND
        }
        MultisigError::NotOwner(_)
        | MultisigError::OnlyWallet(_)
        | MultisigError::NotRelayHub(_)
        | MultisigError::RelayRejected(_) => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ApiError {
            error: err.to_string(),
        }),
    )
}

fn ether_amount(input: &str) -> Result<Wei, (StatusCode, Json<ApiError>)> {
    parse_ether(input).map_err(|e| bad_request(format!("Invalid amount '{}': {}", input, e)))
}

/// How a request reached the wallet
fn origin(from: Address, relay_hub: Option<Address>) -> CallOrigin {
    match relay_hub {
        Some(hub) => CallOrigin::Relayed { hub, from },
        None => CallOrigin::Direct { sender: from },
    }
}

/// Persist and broadcast everything emitted since `mark`
fn publish(state: &ApiState, chain: &ChainState, factory: &WalletFactory, mark: usize) {
    if let Err(e) = state.storage.save(chain, factory) {
        log::error!("Failed to save devnet: {}", e);
    }
    for entry in chain.events_since(mark) {
        state.ws_broadcaster.broadcast(WsEvent::Log {
            entry: entry.clone(),
        });
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// POST /api/accounts/{address}/fund - Credit devnet funds
pub async fn fund_account(
    State(state): State<ApiState>,
    Path(address): Path<Address>,
    Json(req): Json<FundRequest>,
) -> ApiResult<BalanceResponse> {
    let amount = ether_amount(&req.amount)?;
    let mut chain = state.chain.write().await;
    let factory = state.factory.read().await;

    let balance = chain
        .mint(&address, amount)
        .map_err(|e| bad_request(e.to_string()))?;
    log::info!("Funded {} with {} ether", address, req.amount);
    publish(&state, &chain, &factory, chain.events().len());

    Ok(Json(BalanceResponse {
        address,
        balance: balance.to_string(),
        balance_ether: format_ether(balance),
    }))
}

/// GET /api/accounts/{address}/balance - Get balance
pub async fn get_balance(
    State(state): State<ApiState>,
    Path(address): Path<Address>,
) -> Json<BalanceResponse> {
    let chain = state.chain.read().await;
    let balance = chain.balance_of(&address);

    Json(BalanceResponse {
        address,
        balance: balance.to_string(),
        balance_ether: format_ether(balance),
    })
}

// ============================================================================
// Wallets
// ============================================================================

/// POST /api/wallets - Deploy a wallet through the factory
pub async fn create_wallet(
    State(state): State<ApiState>,
    Json(req): Json<CreateWalletRequest>,
) -> ApiResult<WalletInfo> {
    let daily_limit = req.daily_limit.as_deref().map(ether_amount).transpose()?;
    let mut config = MultisigConfig::new(req.owners, req.required, daily_limit);
    config.label = req.label;

    let mut chain = state.chain.write().await;
    let mut factory = state.factory.write().await;
    chain.sync_clock(unix_now());
    let mark = chain.events().len();

    let address = factory
        .create(&mut chain, req.creator, config)
        .map_err(multisig_error)?;
    publish(&state, &chain, &factory, mark);

    let wallet = factory.wallet(&address).map_err(multisig_error)?;
    Ok(Json(WalletInfo::new(wallet, &chain)))
}

/// GET /api/wallets - List wallets
pub async fn list_wallets(State(state): State<ApiState>) -> Json<Vec<WalletInfo>> {
    let chain = state.chain.read().await;
    let factory = state.factory.read().await;

    Json(
        factory
            .list()
            .into_iter()
            .map(|wallet| WalletInfo::new(wallet, &chain))
            .collect(),
    )
}

/// GET /api/wallets/{address} - Wallet details
pub async fn get_wallet(
    State(state): State<ApiState>,
    Path(address): Path<Address>,
) -> ApiResult<WalletInfo> {
    let chain = state.chain.read().await;
    let factory = state.factory.read().await;
    let wallet = factory.wallet(&address).map_err(multisig_error)?;

    Ok(Json(WalletInfo::new(wallet, &chain)))
}

/// POST /api/wallets/{address}/deposit - Send value to a wallet
pub async fn deposit(
    State(state): State<ApiState>,
    Path(address): Path<Address>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<WalletInfo> {
    let amount = ether_amount(&req.amount)?;
    let mut chain = state.chain.write().await;
    let factory = state.factory.read().await;
    chain.sync_clock(unix_now());
    let mark = chain.events().len();

    let wallet = factory.wallet(&address).map_err(multisig_error)?;
    wallet
        .deposit(&mut chain, req.from, amount)
        .map_err(multisig_error)?;
    publish(&state, &chain, &factory, mark);

    Ok(Json(WalletInfo::new(wallet, &chain)))
}

/// POST /api/wallets/{address}/relay/accept - Ask whether a relayed call is accepted
pub async fn accept_relayed_call(
    State(state): State<ApiState>,
    Path(address): Path<Address>,
    Json(req): Json<RelayRequest>,
) -> ApiResult<RelayAcceptance> {
    let factory = state.factory.read().await;
    let wallet = factory.wallet(&address).map_err(multisig_error)?;

    Ok(Json(wallet.accept_relayed_call(&req)))
}

// ============================================================================
// Transactions
// ============================================================================

/// POST /api/wallets/{address}/transactions - Submit a transaction
pub async fn submit_transaction(
    State(state): State<ApiState>,
    Path(address): Path<Address>,
    Json(req): Json<SubmitTransactionRequest>,
) -> ApiResult<ExecutionResponse> {
    let value = match req.value.as_deref() {
        Some(value) => ether_amount(value)?,
        None => 0,
    };
    let payload = match (req.command, req.data.as_deref()) {
        (Some(_), Some(_)) => {
            return Err(bad_request("Provide either data or command, not both"));
        }
        (Some(command), None) => Payload::Command(command),
        (None, Some(data)) => Payload::from_hex(data).map_err(multisig_error)?,
        (None, None) => Payload::None,
    };

    let mut chain = state.chain.write().await;
    let mut factory = state.factory.write().await;
    chain.sync_clock(unix_now());
    let mark = chain.events().len();

    let wallet = factory.wallet_mut(&address).map_err(multisig_error)?;
    let (id, outcome) = wallet
        .relay_call(origin(req.from, req.relay_hub), |wallet, caller| {
            wallet.submit_transaction(&mut chain, caller, req.destination, value, payload)
        })
        .map_err(multisig_error)?;
    let transaction = TransactionInfo::new(wallet, id, wallet.transaction(id).map_err(multisig_error)?);
    publish(&state, &chain, &factory, mark);

    Ok(Json(ExecutionResponse {
        outcome,
        transaction,
    }))
}

/// GET /api/wallets/{address}/transactions - List transactions
pub async fn list_transactions(
    State(state): State<ApiState>,
    Path(address): Path<Address>,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<Vec<TransactionInfo>> {
    let factory = state.factory.read().await;
    let wallet = factory.wallet(&address).map_err(multisig_error)?;

    let to = query.to.unwrap_or(usize::MAX);
    let ids = wallet
        .transaction_ids(query.from, to, query.pending, query.executed)
        .map_err(multisig_error)?;

    let mut transactions = Vec::with_capacity(ids.len());
    for id in ids {
        let tx = wallet.transaction(id).map_err(multisig_error)?;
        transactions.push(TransactionInfo::new(wallet, id, tx));
    }
    Ok(Json(transactions))
}

/// GET /api/wallets/{address}/transactions/{id} - Transaction details
pub async fn get_transaction(
    State(state): State<ApiState>,
    Path((address, id)): Path<(Address, TransactionId)>,
) -> ApiResult<TransactionInfo> {
    let factory = state.factory.read().await;
    let wallet = factory.wallet(&address).map_err(multisig_error)?;
    let tx = wallet.transaction(id).map_err(multisig_error)?;

    Ok(Json(TransactionInfo::new(wallet, id, tx)))
}

/// POST /api/wallets/{address}/transactions/{id}/confirm - Confirm a transaction
pub async fn confirm_transaction(
    State(state): State<ApiState>,
    Path((address, id)): Path<(Address, TransactionId)>,
    Json(req): Json<TransactionActionRequest>,
) -> ApiResult<ExecutionResponse> {
    let mut chain = state.chain.write().await;
    let mut factory = state.factory.write().await;
    chain.sync_clock(unix_now());
    let mark = chain.events().len();

    let wallet = factory.wallet_mut(&address).map_err(multisig_error)?;
    let outcome = wallet
        .relay_call(origin(req.from, req.relay_hub), |wallet, caller| {
            wallet.confirm_transaction(&mut chain, caller, id)
        })
        .map_err(multisig_error)?;
    let transaction = TransactionInfo::new(wallet, id, wallet.transaction(id).map_err(multisig_error)?);
    publish(&state, &chain, &factory, mark);

    Ok(Json(ExecutionResponse {
        outcome,
        transaction,
    }))
}

/// POST /api/wallets/{address}/transactions/{id}/revoke - Revoke a confirmation
pub async fn revoke_confirmation(
    State(state): State<ApiState>,
    Path((address, id)): Path<(Address, TransactionId)>,
    Json(req): Json<TransactionActionRequest>,
) -> ApiResult<TransactionInfo> {
    let mut chain = state.chain.write().await;
    let mut factory = state.factory.write().await;
    chain.sync_clock(unix_now());
    let mark = chain.events().len();

    let wallet = factory.wallet_mut(&address).map_err(multisig_error)?;
    wallet
        .relay_call(origin(req.from, req.relay_hub), |wallet, caller| {
            wallet.revoke_confirmation(&mut chain, caller, id)
        })
        .map_err(multisig_error)?;
    let transaction = TransactionInfo::new(wallet, id, wallet.transaction(id).map_err(multisig_error)?);
    publish(&state, &chain, &factory, mark);

    Ok(Json(transaction))
}

/// POST /api/wallets/{address}/transactions/{id}/execute - Retry execution
pub async fn execute_transaction(
    State(state): State<ApiState>,
    Path((address, id)): Path<(Address, TransactionId)>,
    Json(req): Json<TransactionActionRequest>,
) -> ApiResult<ExecutionResponse> {
    let mut chain = state.chain.write().await;
    let mut factory = state.factory.write().await;
    chain.sync_clock(unix_now());
    let mark = chain.events().len();

    let wallet = factory.wallet_mut(&address).map_err(multisig_error)?;
    let outcome = wallet
        .relay_call(origin(req.from, req.relay_hub), |wallet, caller| {
            wallet.execute_transaction(&mut chain, caller, id)
        })
        .map_err(multisig_error)?;
    let transaction = TransactionInfo::new(wallet, id, wallet.transaction(id).map_err(multisig_error)?);
    publish(&state, &chain, &factory, mark);

    Ok(Json(ExecutionResponse {
        outcome,
        transaction,
    }))
}

// ============================================================================
// Clock and events
// ============================================================================

/// POST /api/time/advance - Move the devnet clock forward
pub async fn advance_time(
    State(state): State<ApiState>,
    Json(req): Json<AdvanceTimeRequest>,
) -> Json<TimeResponse> {
    let mut chain = state.chain.write().await;
    let factory = state.factory.read().await;
    chain.sync_clock(unix_now());
    chain.advance_time(req.seconds);
    log::info!("Clock advanced by {}s to {}", req.seconds, chain.timestamp());

    publish(&state, &chain, &factory, chain.events().len());
    state.ws_broadcaster.broadcast(WsEvent::TimeAdvanced {
        timestamp: chain.timestamp(),
    });

    Json(TimeResponse {
        timestamp: chain.timestamp(),
        offset: chain.time_offset(),
    })
}

/// GET /api/events - Event log, optionally filtered by emitter
pub async fn list_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<LogEntry>> {
    let chain = state.chain.read().await;
    let entries = chain
        .events_since(query.since)
        .iter()
        .filter(|entry| query.emitter.map_or(true, |emitter| entry.emitter == emitter))
        .cloned()
        .collect();

    Json(entries)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}
