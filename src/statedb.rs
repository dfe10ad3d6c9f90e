// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! The state-database contract the executor consumes (spec.md §6). The
//! underlying trie/database implementation itself is explicitly out of
//! scope (spec.md §1); this module only defines the interface and the log
//! record shapes that travel through it.

use crate::types::{Address, Balance, Bytes, Hash};

/// A single event/log emitted by a transaction, before any tx- or
/// block-level metadata has been stamped onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: Bytes,
}

/// A log after `WriteBuf::add_log` has stamped the emitting transaction's
/// hash and index onto it (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxLog {
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: Bytes,
    pub tx_hash: Hash,
    pub tx_index: usize,
}

/// A fully-stamped log, ready to be attached to a receipt and to the
/// block-wide flat log list (spec.md §4.5 stage 4d).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: Bytes,
    pub tx_hash: Hash,
    pub tx_index: usize,
    pub block_hash: Hash,
    pub block_number: u64,
    /// Running count across the whole block; strictly monotonic in tx index
    /// (spec.md §8, property 10).
    pub index: u64,
}

/// Read-only view over the state database, as observed at some snapshot
/// point. Each `WriteBuf` is backed by its own `StateView` instance — the
/// underlying implementation is not assumed to be safe for concurrent reads
/// from a single shared instance (spec.md §4.4).
pub trait StateView: Send + Sync {
    fn get_balance(&self, addr: &Address) -> Balance;
    fn get_nonce(&self, addr: &Address) -> u64;
    fn get_code(&self, addr: &Address) -> Option<Bytes>;
    fn get_state(&self, addr: &Address, slot: &Hash) -> Hash;
    fn exists(&self, addr: &Address) -> bool;
    fn is_empty(&self, addr: &Address) -> bool;
}

/// The live, mutable state database. Read-only for snapshot purposes at
/// level start; written only by the executor's serial merge thread
/// (spec.md §5).
pub trait StateDb: StateView {
    /// Returns an exclusive, immutable view frozen at the current state.
    /// Every `WriteBuf` created for a level gets its own `snapshot()` call.
    fn snapshot(&self) -> std::sync::Arc<dyn StateView>;

    fn create_account(&mut self, addr: Address);

    fn add_balance(&mut self, addr: Address, amount: Balance);
    fn sub_balance(&mut self, addr: Address, amount: Balance);
    fn set_nonce(&mut self, addr: Address, nonce: u64);
    fn set_code(&mut self, addr: Address, code: Bytes);
    fn set_state(&mut self, addr: Address, slot: Hash, value: Hash);

    fn add_log(&mut self, log: Log);

    /// Normalizes the live state after a merge (e.g. clearing touched-but-
    /// empty accounts); called once per merged transaction (spec.md §4.5).
    fn finalise(&mut self, delete_empty_objects: bool);

    /// Commits the accumulated writes and returns the resulting state root.
    fn commit(&mut self) -> Hash;
}
