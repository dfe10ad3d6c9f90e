// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! Shared Keccak-256 wrapper used by the historical slot-derivation scheme
//! and by receipt bloom filters.

pub(crate) fn keccak256(input: &[u8]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};
    let mut hasher = Keccak::v256();
    hasher.update(input);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}
