//! REST API module
//!
//! Provides HTTP REST API for programmatic access to a shared devnet.
//!
//! # Endpoints
//!
//! ## Accounts
//! - `POST /api/accounts/{address}/fund` - Credit devnet funds
//! - `GET /api/accounts/{address}/balance` - Get balance
//!
//! ## Wallets
//! - `GET /api/wallets` - List wallets
//! - `POST /api/wallets` - Deploy a wallet through the factory
//! - `GET /api/wallets/{address}` - Wallet details
//! - `POST /api/wallets/{address}/deposit` - Send value to a wallet
//! - `POST /api/wallets/{address}/relay/accept` - Relayed call admission
//!
//! ## Transactions
//! - `GET /api/wallets/{address}/transactions` - List (filters: pending, executed, from, to)
//! - `POST /api/wallets/{address}/transactions` - Submit transaction
//! - `GET /api/wallets/{address}/transactions/{id}` - Get transaction
//! - `POST /api/wallets/{address}/transactions/{id}/confirm` - Confirm
//! - `POST /api/wallets/{address}/transactions/{id}/revoke` - Revoke confirmation
//! - `POST /api/wallets/{address}/transactions/{id}/execute` - Retry execution
//!
//! ## Devnet
//! - `POST /api/time/advance` - Move the clock forward
//! - `GET /api/events` - Event log
//!
//! ## WebSocket
//! - `GET /ws` - Real-time updates (Log, TimeAdvanced)

pub mod handlers;
pub mod routes;
pub mod websocket;

pub use handlers::ApiState;
pub use routes::create_router;
pub use websocket::WsBroadcaster;
