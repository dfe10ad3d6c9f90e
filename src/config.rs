// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! Chain-wide constants the Analyzer and Executor need (spec.md §6's
//! "well-known system addresses," promoted from compile-time constants to a
//! config value per SPEC_FULL.md §4.2).

use crate::types::Address;
use serde::{Deserialize, Serialize};

/// Well-known addresses and per-block limits shared by every Analyzer and
/// Executor invocation on one chain. All nodes on a chain must agree on one
/// `ChainConfig`; the Analyzer is pure only with respect to a fixed config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Recipient address that marks a System action transaction.
    pub system_action: Address,
    /// Address all System actions additionally write, serializing them
    /// against each other.
    pub validator_registry: Address,
    /// Recipient address that marks a KV-put transaction.
    pub kv_router: Address,
    /// Recipient address that marks a Privacy transfer transaction.
    pub privacy_router: Address,
    /// Per-block gas pool size consumed by the executor's gas accounting.
    pub block_gas_limit: u64,
}

impl ChainConfig {
    pub fn new(
        system_action: Address,
        validator_registry: Address,
        kv_router: Address,
        privacy_router: Address,
        block_gas_limit: u64,
    ) -> Self {
        Self {
            system_action,
            validator_registry,
            kv_router,
            privacy_router,
            block_gas_limit,
        }
    }
}
