// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-transaction write-buffering overlay over a frozen state snapshot
//! (spec.md §4.4): absorbs writes, supports snapshot/revert for contract
//! re-entry, and knows how to merge itself into the live state.

use crate::statedb::{RawLog, StateDb, StateView, TxLog};
use crate::types::{Address, Balance, Bytes, Hash};
use num_bigint::Sign;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Default)]
struct Overlay {
    balances: HashMap<Address, Balance>,
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Bytes>,
    storage: HashMap<Address, HashMap<Hash, Hash>>,
    created: HashSet<Address>,
}

struct Snapshot {
    overlay: Overlay,
    log_len: usize,
}

/// An opaque snapshot identifier returned by [`WriteBuf::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotId(usize);

/// One transaction's write-buffer overlay. Created fresh at the start of
/// every level (one per tx), mutated only by that tx's `ApplyMsgFn`, then
/// merged into the live state and discarded (spec.md §3, §4.4).
pub struct WriteBuf {
    parent: Arc<dyn StateView>,
    overlay: Overlay,
    logs: Vec<TxLog>,
    snapshots: Vec<Snapshot>,
    tx_hash: Hash,
    tx_index: usize,
}

impl WriteBuf {
    /// Creates a fresh overlay backed by `parent`, an exclusive snapshot of
    /// the live state taken at level start (spec.md §4.5 stage 4a).
    pub fn new(parent: Arc<dyn StateView>) -> Self {
        Self {
            parent,
            overlay: Overlay::default(),
            logs: Vec::new(),
            snapshots: Vec::new(),
            tx_hash: Hash::ZERO,
            tx_index: 0,
        }
    }

    /// Tags subsequent logs with `tx_hash`/`tx_index` (spec.md §4.5 stage
    /// 4b: "Calls prepare(...) on its WriteBuf so logs are tagged").
    pub fn prepare(&mut self, tx_hash: Hash, tx_index: usize) {
        self.tx_hash = tx_hash;
        self.tx_index = tx_index;
    }

    pub fn get_balance(&self, addr: &Address) -> Balance {
        self.overlay
            .balances
            .get(addr)
            .cloned()
            .unwrap_or_else(|| self.parent.get_balance(addr))
    }

    pub fn add_balance(&mut self, addr: Address, amount: Balance) {
        let current = self.get_balance(&addr);
        self.overlay
            .balances
            .insert(addr, current.checked_add(&amount));
    }

    pub fn sub_balance(&mut self, addr: Address, amount: Balance) {
        let current = self.get_balance(&addr);
        self.overlay
            .balances
            .insert(addr, current.checked_sub(&amount));
    }

    pub fn get_nonce(&self, addr: &Address) -> u64 {
        self.overlay
            .nonces
            .get(addr)
            .copied()
            .unwrap_or_else(|| self.parent.get_nonce(addr))
    }

    pub fn set_nonce(&mut self, addr: Address, nonce: u64) {
        self.overlay.nonces.insert(addr, nonce);
    }

    pub fn get_code(&self, addr: &Address) -> Option<Bytes> {
        self.overlay
            .code
            .get(addr)
            .cloned()
            .or_else(|| self.parent.get_code(addr))
    }

    pub fn set_code(&mut self, addr: Address, code: Bytes) {
        self.overlay.code.insert(addr, code);
    }

    pub fn get_state(&self, addr: &Address, slot: &Hash) -> Hash {
        self.overlay
            .storage
            .get(addr)
            .and_then(|slots| slots.get(slot))
            .copied()
            .unwrap_or_else(|| self.parent.get_state(addr, slot))
    }

    pub fn set_state(&mut self, addr: Address, slot: Hash, value: Hash) {
        self.overlay.storage.entry(addr).or_default().insert(slot, value);
    }

    /// Always reads through to the parent snapshot, ignoring any overlay
    /// write made by this transaction so far (spec.md §4.4).
    pub fn get_committed_state(&self, addr: &Address, slot: &Hash) -> Hash {
        self.parent.get_state(addr, slot)
    }

    pub fn create_account(&mut self, addr: Address) {
        self.overlay.created.insert(addr);
    }

    pub fn add_log(&mut self, log: RawLog) {
        self.logs.push(TxLog {
            address: log.address,
            topics: log.topics,
            data: log.data,
            tx_hash: self.tx_hash,
            tx_index: self.tx_index,
        });
    }

    pub fn logs(&self) -> &[TxLog] {
        &self.logs
    }

    /// Deep-copies the overlay maps and records the current log-list length
    /// so a later `revert_to_snapshot` can restore exactly this state.
    pub fn snapshot(&mut self) -> SnapshotId {
        let id = self.snapshots.len();
        self.snapshots.push(Snapshot {
            overlay: self.overlay.clone(),
            log_len: self.logs.len(),
        });
        SnapshotId(id)
    }

    /// Restores the overlay maps to the state recorded at `id`, truncates
    /// the log list to that point, and discards any snapshot taken after
    /// `id` (spec.md §4.4).
    pub fn revert_to_snapshot(&mut self, id: SnapshotId) {
        let snap_overlay = self.snapshots[id.0].overlay.clone();
        let snap_log_len = self.snapshots[id.0].log_len;
        self.snapshots.truncate(id.0);
        self.overlay = snap_overlay;
        self.logs.truncate(snap_log_len);
    }

    /// Applies this overlay's writes into `dst` (spec.md §4.4 merge
    /// contract). Balances are applied as deltas against the shared parent
    /// snapshot so concurrently-merged WriteBufs compose instead of
    /// clobbering each other; nonces/code/storage are single-writer per
    /// level by the conflict invariant and are applied absolutely.
    pub fn merge(&self, dst: &mut dyn StateDb) {
        for addr in &self.overlay.created {
            dst.create_account(*addr);
        }
        for (addr, final_balance) in &self.overlay.balances {
            let parent_balance = self.parent.get_balance(addr);
            let delta = final_balance.delta_from(&parent_balance);
            match delta.sign() {
                Sign::Plus => dst.add_balance(*addr, Balance::from_abs_delta(&delta)),
                Sign::Minus => dst.sub_balance(*addr, Balance::from_abs_delta(&delta)),
                Sign::NoSign => {}
            }
        }
        for (addr, nonce) in &self.overlay.nonces {
            dst.set_nonce(*addr, *nonce);
        }
        for (addr, code) in &self.overlay.code {
            dst.set_code(*addr, code.clone());
        }
        for (addr, slots) in &self.overlay.storage {
            for (slot, value) in slots {
                dst.set_state(*addr, *slot, *value);
            }
        }
    }
}
