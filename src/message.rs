// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! The transaction-message abstraction (spec.md §6). Out of CORE scope as an
//! implementation — this is the interface the Analyzer and Executor consume;
//! embedders provide their own concrete `Message` impl (or use
//! [`SimpleMessage`] for tests and simple integrations).

use crate::types::{Address, Balance, Bytes, Hash};

/// Everything the Analyzer and Executor need to know about a transaction,
/// independent of how the embedding chain represents it on the wire.
pub trait Message: Send + Sync {
    fn from(&self) -> Address;
    /// `None` marks a `SetCode` transaction (spec.md §4.2).
    fn to(&self) -> Option<Address>;
    fn gas(&self) -> u64;
    fn value(&self) -> Balance;
    fn data(&self) -> &[u8];
    fn nonce(&self) -> u64;
    fn hash(&self) -> Hash;
    /// Numeric transaction type tag carried through into the receipt
    /// verbatim; the Analyzer does not interpret it (dispatch is by
    /// recipient address, per spec.md §4.2).
    fn tx_type(&self) -> u8;
}

/// A plain, owned `Message` implementation for tests and simple embedders
/// that don't need a zero-copy wire representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleMessage {
    pub from: Address,
    pub to: Option<Address>,
    pub gas: u64,
    pub value: Balance,
    pub data: Bytes,
    pub nonce: u64,
    pub hash: Hash,
    pub tx_type: u8,
}

impl Message for SimpleMessage {
    fn from(&self) -> Address {
        self.from
    }

    fn to(&self) -> Option<Address> {
        self.to
    }

    fn gas(&self) -> u64 {
        self.gas
    }

    fn value(&self) -> Balance {
        self.value.clone()
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn nonce(&self) -> u64 {
        self.nonce
    }

    fn hash(&self) -> Hash {
        self.hash
    }

    fn tx_type(&self) -> u8 {
        self.tx_type
    }
}
