// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! Static access-set analysis (spec.md §4.2): maps a transaction message and
//! the current block height to a conservative `AccessSet`, dispatching on
//! recipient address against the closed set of transaction kinds in
//! spec.md §3.

use crate::access_set::AccessSet;
use crate::config::ChainConfig;
use crate::message::Message;
use crate::types::Hash;

/// A parsed `SetCode` envelope (spec.md §6). Only constructed on successful
/// parse; a failed parse never produces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCodeEnvelope {
    pub version: u8,
    pub ttl: u64,
    pub code: Vec<u8>,
}

/// Parses the bytewise `SetCode` envelope: `u8` version, big-endian `u64`
/// TTL, then a `u32`-big-endian-length-prefixed code blob. `version != 1` or
/// `ttl == 0` is a parse failure, per spec.md §6.
pub fn parse_set_code_envelope(data: &[u8]) -> Option<SetCodeEnvelope> {
    if data.len() < 1 + 8 + 4 {
        return None;
    }
    let version = data[0];
    if version != 1 {
        return None;
    }
    let ttl = u64::from_be_bytes(data[1..9].try_into().ok()?);
    if ttl == 0 {
        return None;
    }
    let code_len = u32::from_be_bytes(data[9..13].try_into().ok()?) as usize;
    let code = data.get(13..13 + code_len)?;
    if code.len() != code_len {
        return None;
    }
    Some(SetCodeEnvelope {
        version,
        ttl,
        code: code.to_vec(),
    })
}

/// Encodes a `SetCodeEnvelope` in the wire format `parse_set_code_envelope`
/// expects. Used by embedders constructing `SetCode` transactions and by
/// this crate's own tests.
pub fn encode_set_code_envelope(version: u8, ttl: u64, code: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 8 + 4 + code.len());
    out.push(version);
    out.extend_from_slice(&ttl.to_be_bytes());
    out.extend_from_slice(&(code.len() as u32).to_be_bytes());
    out.extend_from_slice(code);
    out
}

/// Parses an opaque KV-put payload. The wire schema itself is out of scope
/// for this crate (spec.md §6); only parse success/failure is consumed by
/// the Analyzer. This default implementation treats any non-empty payload
/// as well-formed — embedders with a real schema should analyze with
/// [`Analyzer::analyze_with_kv_parser`] instead.
pub fn default_parse_kv_put(data: &[u8]) -> bool {
    !data.is_empty()
}

/// Byte-exact slot-derivation scheme for the historical (shared-index)
/// variant of the Analyzer (spec.md §6, §9). Not called from
/// [`Analyzer::analyze`] — the lazy-expiry variant supersedes it — but kept
/// so multiple implementations can agree on the same derived slots if a
/// chain ever opts into the historical scheme.
pub fn historical_expiry_slot(prefix: &'static str, expiry_block: u64) -> Hash {
    use crate::hashing::keccak256;

    let mut base_input = Vec::with_capacity(prefix.len() + 8);
    base_input.extend_from_slice(prefix.as_bytes());
    base_input.extend_from_slice(&expiry_block.to_be_bytes());
    let base = keccak256(&base_input);

    let mut slot_input = Vec::with_capacity(32 + 1 + 6 + 1 + 5);
    slot_input.extend_from_slice(&base);
    slot_input.push(0x00);
    slot_input.extend_from_slice(b"bucket");
    slot_input.push(0x00);
    slot_input.extend_from_slice(b"count");
    Hash::new(keccak256(&slot_input))
}

/// Maps a transaction message + chain config into a conservative
/// `AccessSet` (spec.md §4.2). Pure: identical inputs always yield an
/// identical `AccessSet`.
pub struct Analyzer {
    config: ChainConfig,
}

impl Analyzer {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Analyze with the default KV-put parser ([`default_parse_kv_put`]).
    pub fn analyze<M: Message>(&self, msg: &M) -> AccessSet {
        self.analyze_with_kv_parser(msg, default_parse_kv_put)
    }

    /// Analyze with a caller-supplied KV-put payload validator, for
    /// embedders with a real KV-put wire schema.
    pub fn analyze_with_kv_parser<M: Message>(
        &self,
        msg: &M,
        parse_kv_put: impl Fn(&[u8]) -> bool,
    ) -> AccessSet {
        let mut set = AccessSet::new();
        let sender = msg.from();
        set.add_write_addr(sender);

        match msg.to() {
            None => {
                // SetCode path: lazy-expiry writes only to sender on
                // success. A malformed envelope conservatively serializes
                // against all system actions.
                if parse_set_code_envelope(msg.data()).is_none() {
                    set.add_write_addr(self.config.system_action);
                }
            }
            Some(to) if to == self.config.system_action => {
                set.add_write_addr(self.config.validator_registry);
            }
            Some(to) if to == self.config.kv_router => {
                if !parse_kv_put(msg.data()) {
                    set.add_write_addr(self.config.kv_router);
                }
            }
            Some(to) if to == self.config.privacy_router => {
                set.add_write_addr(self.config.privacy_router);
            }
            Some(to) => {
                // Plain transfer.
                set.add_write_addr(to);
                set.add_read_addr(to);
            }
        }

        set
    }
}
