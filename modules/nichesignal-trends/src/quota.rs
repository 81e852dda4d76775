//! Monthly call-quota bookkeeping for the two SerpApi keys.
//!
//! The ledger is injected into the validator — quota is explicit state with
//! serialized read-modify-write, not ambient filesystem globals. The provider
//! enforces the real limit with 429s; these counters exist so we stop
//! *before* burning calls that will be rejected.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Which of the two API keys a call is charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySlot {
    One,
    Two,
}

impl KeySlot {
    pub fn other(self) -> KeySlot {
        match self {
            KeySlot::One => KeySlot::Two,
            KeySlot::Two => KeySlot::One,
        }
    }
}

/// Persisted per-month usage counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    /// Calendar month the counters belong to, `YYYY-MM`.
    pub month: String,
    pub used_one: u32,
    pub used_two: u32,
}

impl QuotaState {
    pub fn fresh(month: String) -> Self {
        Self {
            month,
            used_one: 0,
            used_two: 0,
        }
    }

    fn used(&self, slot: KeySlot) -> u32 {
        match slot {
            KeySlot::One => self.used_one,
            KeySlot::Two => self.used_two,
        }
    }

    fn used_mut(&mut self, slot: KeySlot) -> &mut u32 {
        match slot {
            KeySlot::One => &mut self.used_one,
            KeySlot::Two => &mut self.used_two,
        }
    }
}

/// Persistence seam for quota state.
pub trait QuotaStore: Send + Sync {
    fn load(&self) -> Result<Option<QuotaState>>;
    fn save(&self, state: &QuotaState) -> Result<()>;
}

/// JSON-file-backed store.
pub struct FileQuotaStore {
    path: PathBuf,
}

impl FileQuotaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl QuotaStore for FileQuotaStore {
    fn load(&self) -> Result<Option<QuotaState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading quota state from {}", self.path.display()))?;
        let state = serde_json::from_str(&raw)
            .with_context(|| format!("parsing quota state in {}", self.path.display()))?;
        Ok(Some(state))
    }

    fn save(&self, state: &QuotaState) -> Result<()> {
        let raw = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("writing quota state to {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryQuotaStore {
    state: Mutex<Option<QuotaState>>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preloaded(state: QuotaState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn load(&self) -> Result<Option<QuotaState>> {
        Ok(self.state.lock().unwrap().clone())
    }

    fn save(&self, state: &QuotaState) -> Result<()> {
        *self.state.lock().unwrap() = Some(state.clone());
        Ok(())
    }
}

fn current_month() -> String {
    Utc::now().format("%Y-%m").to_string()
}

/// Tracks usage of both keys against a shared monthly limit.
///
/// All mutation happens inside the mutex; every change is written through to
/// the store so a crashed run never forgets spent quota.
pub struct QuotaLedger {
    store: Box<dyn QuotaStore>,
    state: Mutex<QuotaState>,
    limit: u32,
}

impl QuotaLedger {
    /// Load persisted counters, resetting them if the stored month is not
    /// the current one.
    pub fn new(store: Box<dyn QuotaStore>, limit: u32) -> Self {
        let month = current_month();
        let state = match store.load() {
            Ok(Some(stored)) if stored.month == month => stored,
            Ok(Some(stored)) => {
                info!(
                    stored_month = stored.month,
                    month, "Quota month rolled over, resetting counters"
                );
                QuotaState::fresh(month)
            }
            Ok(None) => QuotaState::fresh(month),
            Err(e) => {
                warn!(error = %e, "Failed to load quota state, starting fresh");
                QuotaState::fresh(month)
            }
        };
        Self {
            store,
            state: Mutex::new(state),
            limit,
        }
    }

    /// Roll the counters if the calendar month changed mid-process.
    fn roll_if_stale(&self, state: &mut QuotaState) {
        let month = current_month();
        if state.month != month {
            *state = QuotaState::fresh(month);
        }
    }

    /// The key to use for the next call: key one until its limit, then key
    /// two, then `None` — the caller falls back to the secondary provider.
    pub fn active_slot(&self) -> Option<KeySlot> {
        let mut state = self.state.lock().unwrap();
        self.roll_if_stale(&mut state);
        if state.used(KeySlot::One) < self.limit {
            Some(KeySlot::One)
        } else if state.used(KeySlot::Two) < self.limit {
            Some(KeySlot::Two)
        } else {
            None
        }
    }

    /// Charge one call against a key.
    pub fn record_call(&self, slot: KeySlot) {
        let mut state = self.state.lock().unwrap();
        self.roll_if_stale(&mut state);
        *state.used_mut(slot) += 1;
        self.persist(&state);
    }

    /// A 429 means the provider disagrees with our bookkeeping — trust the
    /// provider and stop using this key for the rest of the month.
    pub fn mark_exhausted(&self, slot: KeySlot) {
        let mut state = self.state.lock().unwrap();
        self.roll_if_stale(&mut state);
        *state.used_mut(slot) = self.limit;
        self.persist(&state);
        warn!(?slot, "API key marked exhausted for this month");
    }

    pub fn used(&self, slot: KeySlot) -> u32 {
        let mut state = self.state.lock().unwrap();
        self.roll_if_stale(&mut state);
        state.used(slot)
    }

    fn persist(&self, state: &QuotaState) {
        if let Err(e) = self.store.save(state) {
            warn!(error = %e, "Failed to persist quota state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_one_first_then_key_two_then_none() {
        let ledger = QuotaLedger::new(Box::new(MemoryQuotaStore::new()), 2);

        assert_eq!(ledger.active_slot(), Some(KeySlot::One));
        ledger.record_call(KeySlot::One);
        assert_eq!(ledger.active_slot(), Some(KeySlot::One));
        ledger.record_call(KeySlot::One);

        assert_eq!(ledger.active_slot(), Some(KeySlot::Two));
        ledger.record_call(KeySlot::Two);
        ledger.record_call(KeySlot::Two);

        assert_eq!(ledger.active_slot(), None);
    }

    #[test]
    fn exhausted_key_one_routes_to_key_two() {
        let state = QuotaState {
            month: current_month(),
            used_one: 250,
            used_two: 0,
        };
        let ledger = QuotaLedger::new(Box::new(MemoryQuotaStore::preloaded(state)), 250);
        assert_eq!(ledger.active_slot(), Some(KeySlot::Two));
    }

    #[test]
    fn mark_exhausted_jumps_counter_to_limit() {
        let ledger = QuotaLedger::new(Box::new(MemoryQuotaStore::new()), 250);
        ledger.record_call(KeySlot::One);
        ledger.mark_exhausted(KeySlot::One);
        assert_eq!(ledger.used(KeySlot::One), 250);
        assert_eq!(ledger.active_slot(), Some(KeySlot::Two));
    }

    #[test]
    fn stale_month_resets_counters() {
        let state = QuotaState {
            month: "2019-01".to_string(),
            used_one: 250,
            used_two: 250,
        };
        let ledger = QuotaLedger::new(Box::new(MemoryQuotaStore::preloaded(state)), 250);
        assert_eq!(ledger.active_slot(), Some(KeySlot::One));
        assert_eq!(ledger.used(KeySlot::One), 0);
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quota.json");
        let store = FileQuotaStore::new(&path);

        assert!(store.load().unwrap().is_none());

        let state = QuotaState {
            month: "2026-08".to_string(),
            used_one: 17,
            used_two: 3,
        };
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn record_call_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quota.json");

        {
            let ledger = QuotaLedger::new(Box::new(FileQuotaStore::new(&path)), 250);
            ledger.record_call(KeySlot::One);
            ledger.record_call(KeySlot::One);
        }

        // A new ledger over the same file sees the spent quota.
        let ledger = QuotaLedger::new(Box::new(FileQuotaStore::new(&path)), 250);
        assert_eq!(ledger.used(KeySlot::One), 2);
    }
}
