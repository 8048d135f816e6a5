//! CLI commands for the ledger
//!
//! Implements all command handlers for the CLI interface.

use crate::dispatch::LogDispatcher;
use crate::ledger::{LedgerConfig, LedgerManager, OperationStatus};
use crate::storage::{Storage, StorageConfig};
use std::path::PathBuf;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub manager: LedgerManager,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize application state
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage_config = StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        };

        let storage = Storage::new(storage_config)?;

        let manager = if storage.exists() {
            println!("📂 Loading existing ledgers...");
            storage.load()?
        } else {
            println!("🆕 Starting with an empty ledger set...");
            let manager = LedgerManager::new();
            storage.save(&manager)?;
            manager
        };

        Ok(Self {
            manager,
            storage,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.manager)?;
        Ok(())
    }
}

/// Initialize the data directory
pub fn cmd_init(data_dir: &PathBuf) -> CliResult<()> {
    let storage_config = StorageConfig {
        data_dir: data_dir.clone(),
        ..Default::default()
    };

    let storage = Storage::new(storage_config)?;

    if storage.exists() {
        println!("⚠️  Ledger data already exists at {:?}", data_dir);
        return Ok(());
    }

    storage.save(&LedgerManager::new())?;

    println!("✅ Ledger store initialized!");
    println!("   📁 Data directory: {:?}", data_dir);

    Ok(())
}

/// Create a new ledger
pub fn cmd_create(
    state: &mut AppState,
    owners: &str,
    threshold: u32,
    label: Option<&str>,
) -> CliResult<()> {
    let owner_list: Vec<String> = owners
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let config = LedgerConfig::new(owner_list, threshold, label.map(|l| l.to_string()))?;
    let ledger = state.manager.create_ledger(config);

    println!("🔐 Ledger ready!");
    println!("   📍 Address: {}", ledger.address());
    println!("   🧮 Quorum: {}", ledger.description());
    if let Some(l) = &ledger.config().label {
        println!("   🏷️  Label: {}", l);
    }

    state.save()?;
    Ok(())
}

/// List all ledgers
pub fn cmd_list(state: &AppState) -> CliResult<()> {
    let mut ledgers = state.manager.list();
    ledgers.sort_by(|a, b| a.address().cmp(b.address()));

    if ledgers.is_empty() {
        println!("🔐 No ledgers yet. Create one with `qledger create`.");
        return Ok(());
    }

    println!("🔐 Ledgers ({}):", ledgers.len());
    for ledger in ledgers {
        println!(
            "   {} [{}] balance {} | {} operation(s)",
            ledger.address(),
            ledger.description(),
            ledger.balance(),
            ledger.operation_count()
        );
    }
    Ok(())
}

/// Show a ledger and its operations
pub fn cmd_show(state: &AppState, address: &str) -> CliResult<()> {
    let ledger = state
        .manager
        .get(address)
        .ok_or_else(|| format!("Ledger not found: {}", address))?;

    println!("🔐 Ledger {}", ledger.address());
    println!("   🧮 Quorum: {}", ledger.description());
    println!("   💰 Balance: {}", ledger.balance());
    println!("   👥 Owners:");
    for owner in ledger.owners() {
        println!("      - {}", owner);
    }

    if ledger.operation_count() == 0 {
        println!("   📭 No operations yet.");
        return Ok(());
    }

    println!("   📋 Operations:");
    for op in ledger.operations() {
        let status = match op.status(ledger.threshold()) {
            OperationStatus::Pending => "pending",
            OperationStatus::Approved => "approved",
            OperationStatus::Executed => "executed",
        };
        println!(
            "      #{} -> {} amount {} ({} confirmation(s), {})",
            op.index,
            op.target,
            op.amount,
            op.confirmation_count(),
            status
        );
    }
    Ok(())
}

/// Deposit into a ledger's pool
pub fn cmd_deposit(state: &mut AppState, address: &str, sender: &str, amount: u128) -> CliResult<()> {
    let balance = state.manager.deposit(address, sender, amount)?;

    println!("💰 Deposit accepted!");
    println!("   From: {}", sender);
    println!("   Amount: {}", amount);
    println!("   New balance: {}", balance);

    state.save()?;
    Ok(())
}

/// Submit an operation
pub fn cmd_submit(
    state: &mut AppState,
    address: &str,
    caller: &str,
    target: &str,
    amount: u128,
    payload_hex: Option<&str>,
) -> CliResult<()> {
    let payload = match payload_hex {
        Some(s) => hex::decode(s.trim_start_matches("0x"))?,
        None => Vec::new(),
    };

    let index = state
        .manager
        .submit(address, caller, target, amount, payload)?;

    let threshold = state
        .manager
        .get(address)
        .map(|l| l.threshold())
        .unwrap_or(0);

    println!("📨 Operation submitted!");
    println!("   Index: {}", index);
    println!("   Needs {} confirmation(s) before execution", threshold);

    state.save()?;
    Ok(())
}

/// Confirm an operation
pub fn cmd_confirm(state: &mut AppState, address: &str, caller: &str, index: u64) -> CliResult<()> {
    state.manager.confirm(address, caller, index)?;

    let ledger = state.manager.get(address).expect("confirmed above");
    let count = ledger.confirmation_count(index).unwrap_or(0);
    let threshold = ledger.threshold();

    println!("✍️  Confirmation recorded!");
    println!("   Operation: {}", index);
    println!("   Confirmations: {}/{}", count, threshold);
    if count >= threshold as usize {
        println!("   ✅ Quorum reached; the operation may be executed.");
    }

    state.save()?;
    Ok(())
}

/// Execute an approved operation
pub fn cmd_execute(state: &mut AppState, address: &str, caller: &str, index: u64) -> CliResult<()> {
    state
        .manager
        .execute(address, caller, index, &LogDispatcher::new())?;

    let balance = state.manager.get(address).map(|l| l.balance()).unwrap_or(0);

    println!("🚀 Operation {} executed!", index);
    println!("   Remaining balance: {}", balance);

    state.save()?;
    Ok(())
}

/// Show a ledger's event log
pub fn cmd_events(state: &AppState, address: &str, since: u64) -> CliResult<()> {
    let ledger = state
        .manager
        .get(address)
        .ok_or_else(|| format!("Ledger not found: {}", address))?;

    let events = ledger.events().since(since);
    if events.is_empty() {
        println!("📭 No events.");
        return Ok(());
    }

    println!("📜 Events for {}:", address);
    for event in events {
        println!(
            "   #{} {} {}",
            event.seq,
            event.at.to_rfc3339(),
            serde_json::to_string(&event.kind)?
        );
    }
    Ok(())
}
