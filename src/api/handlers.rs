//! REST API handlers for ledger operations
//!
//! Caller identity arrives in the request body; authenticating it is the
//! hosting environment's job, not this service's.

use crate::api::websocket::{WsBroadcaster, WsFrame};
use crate::dispatch::Dispatcher;
use crate::ledger::{Event, Ledger, LedgerConfig, LedgerError, LedgerManager, OperationStatus};
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
    pub manager: Arc<RwLock<LedgerManager>>,
    pub storage: Arc<Storage>,
    pub dispatcher: Arc<dyn Dispatcher + Send + Sync>,
    pub ws_broadcaster: Arc<WsBroadcaster>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub ledgers: usize,
}

#[derive(Serialize)]
pub struct LedgerInfo {
    pub address: String,
    pub owners: Vec<String>,
    pub threshold: u32,
    pub label: Option<String>,
    pub balance: u128,
    pub operations: usize,
    pub created_at: String,
}

impl From<&Ledger> for LedgerInfo {
    fn from(ledger: &Ledger) -> Self {
        Self {
            address: ledger.address().to_string(),
            owners: ledger.owners().to_vec(),
            threshold: ledger.threshold(),
            label: ledger.config().label.clone(),
            balance: ledger.balance(),
            operations: ledger.operation_count(),
            created_at: ledger.created_at().to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct OperationInfo {
    pub index: u64,
    pub proposer: String,
    pub target: String,
    pub amount: u128,
    pub payload: String,
    pub executed: bool,
    pub status: OperationStatus,
    pub confirmations: usize,
    pub confirmed_by: Vec<String>,
    pub submitted_at: String,
    pub executed_at: Option<String>,
}

impl OperationInfo {
    fn new(ledger: &Ledger, index: u64) -> Option<Self> {
        let op = ledger.operation(index)?;
        Some(Self {
            index: op.index,
            proposer: op.proposer.clone(),
            target: op.target.clone(),
            amount: op.amount,
            payload: hex::encode(&op.payload),
            executed: op.executed,
            status: op.status(ledger.threshold()),
            confirmations: op.confirmation_count(),
            confirmed_by: op.confirmed_by().iter().map(|s| s.to_string()).collect(),
            submitted_at: op.submitted_at.to_rfc3339(),
            executed_at: op.executed_at.map(|t| t.to_rfc3339()),
        })
    }
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: u128,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub index: u64,
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub index: u64,
    pub confirmations: usize,
    pub status: OperationStatus,
}

#[derive(Serialize)]
pub struct ExecuteResponse {
    pub index: u64,
    pub balance: u128,
}

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct CreateLedgerRequest {
    pub owners: Vec<String>,
    pub threshold: u32,
    pub label: Option<String>,
}

#[derive(Deserialize)]
pub struct DepositRequest {
    pub sender: String,
    pub amount: u128,
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub caller: String,
    pub target: String,
    pub amount: u128,
    /// Hex-encoded payload; empty or absent for a plain transfer
    pub payload: Option<String>,
}

#[derive(Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Deserialize)]
pub struct EventsQuery {
    /// Return events with seq >= since
    pub since: Option<u64>,
}

// ============================================================================
// Error mapping
// ============================================================================

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn error_response(err: LedgerError) -> (StatusCode, Json<ApiError>) {
    let status = match err {
        LedgerError::InvalidOwnerSet(_) | LedgerError::InvalidThreshold(_) => {
            StatusCode::BAD_REQUEST
        }
        LedgerError::Unauthorized(_) => StatusCode::FORBIDDEN,
        LedgerError::NotFound(_) | LedgerError::LedgerNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::AlreadyExecuted(_)
        | LedgerError::AlreadyConfirmed { .. }
        | LedgerError::InsufficientConfirmations { .. } => StatusCode::CONFLICT,
        LedgerError::TransferFailed { .. } | LedgerError::CallFailed { .. } => {
            StatusCode::BAD_GATEWAY
        }
    };
    (
        status,
        Json(ApiError {
            error: err.to_string(),
        }),
    )
}

fn not_found(what: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError { error: what.into() }),
    )
}

fn bad_request(what: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError { error: what.into() }),
    )
}

fn decode_payload(payload: &Option<String>) -> Result<Vec<u8>, (StatusCode, Json<ApiError>)> {
    match payload {
        None => Ok(Vec::new()),
        Some(s) => {
            let stripped = s.trim_start_matches("0x");
            hex::decode(stripped).map_err(|e| bad_request(format!("invalid payload hex: {}", e)))
        }
    }
}

/// Persist after a mutation; a failed save is logged, not fatal to the call
fn save_state(state: &ApiState, manager: &LedgerManager) {
    if let Err(e) = state.storage.save(manager) {
        log::error!("Failed to save ledgers: {}", e);
    }
}

/// Push every event recorded after `from_seq` to WebSocket subscribers
fn broadcast_events(state: &ApiState, manager: &LedgerManager, address: &str, from_seq: u64) {
    if let Some(ledger) = manager.get(address) {
        for event in ledger.events().since(from_seq) {
            state.ws_broadcaster.broadcast(WsFrame::Event {
                ledger: address.to_string(),
                event: event.clone(),
            });
        }
    }
}

fn event_count(manager: &LedgerManager, address: &str) -> u64 {
    manager
        .get(address)
        .map(|l| l.events().len() as u64)
        .unwrap_or(0)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Service health
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let manager = state.manager.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        ledgers: manager.count(),
    })
}

/// GET /api/ledgers - List all ledgers
pub async fn list_ledgers(State(state): State<ApiState>) -> Json<Vec<LedgerInfo>> {
    let manager = state.manager.read().await;
    let mut ledgers: Vec<LedgerInfo> = manager.list().into_iter().map(LedgerInfo::from).collect();
    ledgers.sort_by(|a, b| a.address.cmp(&b.address));
    Json(ledgers)
}

/// POST /api/ledgers - Create a ledger
pub async fn create_ledger(
    State(state): State<ApiState>,
    Json(req): Json<CreateLedgerRequest>,
) -> ApiResult<LedgerInfo> {
    let config =
        LedgerConfig::new(req.owners, req.threshold, req.label).map_err(error_response)?;

    let mut manager = state.manager.write().await;
    let info = LedgerInfo::from(manager.create_ledger(config));
    save_state(&state, &manager);

    Ok(Json(info))
}

/// GET /api/ledgers/:address - Ledger details
pub async fn get_ledger(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<LedgerInfo> {
    let manager = state.manager.read().await;

    manager
        .get(&address)
        .map(|ledger| Json(LedgerInfo::from(ledger)))
        .ok_or_else(|| not_found(format!("Ledger not found: {}", address)))
}

/// GET /api/ledgers/:address/balance - Pool balance
pub async fn get_balance(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<BalanceResponse> {
    let manager = state.manager.read().await;

    manager
        .get(&address)
        .map(|ledger| {
            Json(BalanceResponse {
                address: address.clone(),
                balance: ledger.balance(),
            })
        })
        .ok_or_else(|| not_found(format!("Ledger not found: {}", address)))
}

/// GET /api/ledgers/:address/events - Notification log
pub async fn get_events(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Vec<Event>> {
    let manager = state.manager.read().await;

    manager
        .get(&address)
        .map(|ledger| Json(ledger.events().since(query.since.unwrap_or(0)).to_vec()))
        .ok_or_else(|| not_found(format!("Ledger not found: {}", address)))
}

/// POST /api/ledgers/:address/deposit - Receive assets into the pool
pub async fn deposit(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<BalanceResponse> {
    let mut manager = state.manager.write().await;
    let before = event_count(&manager, &address);

    let balance = manager
        .deposit(&address, &req.sender, req.amount)
        .map_err(error_response)?;

    save_state(&state, &manager);
    broadcast_events(&state, &manager, &address, before);

    Ok(Json(BalanceResponse { address, balance }))
}

/// GET /api/ledgers/:address/operations - Operation log
pub async fn list_operations(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<Vec<OperationInfo>> {
    let manager = state.manager.read().await;

    let ledger = manager
        .get(&address)
        .ok_or_else(|| not_found(format!("Ledger not found: {}", address)))?;

    let operations = (0..ledger.operation_count() as u64)
        .filter_map(|i| OperationInfo::new(ledger, i))
        .collect();
    Ok(Json(operations))
}

/// GET /api/ledgers/:address/operations/:index - One operation
pub async fn get_operation(
    State(state): State<ApiState>,
    Path((address, index)): Path<(String, u64)>,
) -> ApiResult<OperationInfo> {
    let manager = state.manager.read().await;

    let ledger = manager
        .get(&address)
        .ok_or_else(|| not_found(format!("Ledger not found: {}", address)))?;

    OperationInfo::new(ledger, index)
        .map(Json)
        .ok_or_else(|| not_found(format!("Operation not found: {}", index)))
}

/// POST /api/ledgers/:address/operations - Submit an operation
pub async fn submit_operation(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<SubmitResponse> {
    let payload = decode_payload(&req.payload)?;

    let mut manager = state.manager.write().await;
    let before = event_count(&manager, &address);

    let index = manager
        .submit(&address, &req.caller, &req.target, req.amount, payload)
        .map_err(error_response)?;

    save_state(&state, &manager);
    broadcast_events(&state, &manager, &address, before);

    Ok(Json(SubmitResponse { index }))
}

/// POST /api/ledgers/:address/operations/:index/confirm - Confirm
pub async fn confirm_operation(
    State(state): State<ApiState>,
    Path((address, index)): Path<(String, u64)>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<ConfirmResponse> {
    let mut manager = state.manager.write().await;
    let before = event_count(&manager, &address);

    manager
        .confirm(&address, &req.caller, index)
        .map_err(error_response)?;

    save_state(&state, &manager);
    broadcast_events(&state, &manager, &address, before);

    let ledger = manager.get(&address).expect("confirmed above");
    Ok(Json(ConfirmResponse {
        index,
        confirmations: ledger.confirmation_count(index).unwrap_or(0),
        status: ledger
            .status(index)
            .unwrap_or(OperationStatus::Pending),
    }))
}

/// POST /api/ledgers/:address/operations/:index/execute - Execute
pub async fn execute_operation(
    State(state): State<ApiState>,
    Path((address, index)): Path<(String, u64)>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<ExecuteResponse> {
    let mut manager = state.manager.write().await;
    let before = event_count(&manager, &address);

    manager
        .execute(&address, &req.caller, index, state.dispatcher.as_ref())
        .map_err(error_response)?;

    save_state(&state, &manager);
    broadcast_events(&state, &manager, &address, before);

    let balance = manager.get(&address).map(|l| l.balance()).unwrap_or(0);
    Ok(Json(ExecuteResponse { index, balance }))
}
