//! REST API module
//!
//! Provides HTTP access to the ledger manager. Every mutating request takes
//! the write lock for its duration, so each call is one indivisible
//! transition.
//!
//! # Endpoints
//!
//! ## Ledgers
//! - `GET /api/ledgers` - List ledgers
//! - `POST /api/ledgers` - Create a ledger (owners, threshold, label)
//! - `GET /api/ledgers/:address` - Ledger details
//! - `GET /api/ledgers/:address/balance` - Pool balance
//! - `GET /api/ledgers/:address/events` - Notification log (`?since=seq`)
//! - `POST /api/ledgers/:address/deposit` - Receive assets
//!
//! ## Operations
//! - `GET /api/ledgers/:address/operations` - Operation log
//! - `POST /api/ledgers/:address/operations` - Submit an operation
//! - `GET /api/ledgers/:address/operations/:index` - One operation
//! - `POST /api/ledgers/:address/operations/:index/confirm` - Confirm
//! - `POST /api/ledgers/:address/operations/:index/execute` - Execute
//!
//! ## WebSocket
//! - `GET /ws` - Real-time ledger events

pub mod handlers;
pub mod routes;
pub mod websocket;

pub use handlers::ApiState;
pub use routes::create_router;
pub use websocket::WsBroadcaster;
