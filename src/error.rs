// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! Typed error taxonomy for the executor (spec.md §7, SPEC_FULL.md §7).
//!
//! Fatal variants abort the whole block; application-level failures never
//! appear here; they are recorded in `receipt.status` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("message count {msgs} does not match transaction count {txs}")]
    MessageCountMismatch { txs: usize, msgs: usize },

    #[error("block gas limit reached")]
    GasLimitReached,

    #[error("apply_msg fatal error for tx index {index}")]
    ApplyMsgFatal {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("missing receipt for tx index {index} after level completion")]
    MissingReceipt { index: usize },
}
