// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! Deterministic parallel transaction execution for a blockchain with a
//! fixed, small set of transaction kinds: static access-set analysis,
//! conflict-free level assignment, per-transaction write-buffer overlays,
//! and a serial-merge executor. No speculation and no rollback-on-conflict
//! — conflicts are resolved before any transaction runs, not after.

pub mod access_set;
pub mod analyzer;
pub mod config;
pub mod error;
mod hashing;
pub mod executor;
pub mod levels;
pub mod message;
pub mod metrics;
pub mod statedb;
pub mod types;
pub mod writebuf;

pub use access_set::AccessSet;
pub use analyzer::Analyzer;
pub use config::ChainConfig;
pub use error::ExecError;
pub use executor::{
    execute_parallel, ApplyMsgFn, ApplyOutcome, BlockContext, Bloom, ExecutionReport, Receipt,
    TxStatus,
};
pub use levels::{build_levels, Level};
pub use message::{Message, SimpleMessage};
pub use statedb::{Log, RawLog, StateDb, StateView, TxLog};
pub use types::{Address, Balance, Bytes, Hash};
