// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! The executor (spec.md §4.5): the five-stage algorithm that turns a block's
//! transactions into receipts, logs, and total gas, driving every other
//! module in this crate.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rayon::prelude::*;

use crate::analyzer::Analyzer;
use crate::config::ChainConfig;
use crate::error::ExecError;
use crate::levels::build_levels;
use crate::message::Message;
use crate::metrics;
use crate::statedb::{Log, StateDb, StateView};
use crate::types::{Address, Hash};
use crate::writebuf::WriteBuf;

/// Per-block context an `ApplyMsgFn` needs but which isn't carried on the
/// message itself (spec.md §6).
#[derive(Debug, Clone)]
pub struct BlockContext {
    pub coinbase: Address,
    pub block_number: u64,
    pub block_hash: Hash,
}

/// What a successful `ApplyMsgFn` call reports back to the executor
/// (spec.md §6): gas consumed, and whether the application itself failed
/// (a VM revert, say) without that being a fatal error for the block.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub used_gas: u64,
    pub vm_err: Option<String>,
}

/// The callback the embedding chain supplies to actually run a transaction
/// against a `WriteBuf` (spec.md §6). Any `Fn` closure with this signature
/// implements it automatically.
pub trait ApplyMsgFn<M: Message>: Sync {
    fn apply(
        &self,
        block_ctx: &BlockContext,
        config: &ChainConfig,
        msg: &M,
        statedb: &mut WriteBuf,
    ) -> anyhow::Result<ApplyOutcome>;
}

impl<M, F> ApplyMsgFn<M> for F
where
    M: Message,
    F: Fn(&BlockContext, &ChainConfig, &M, &mut WriteBuf) -> anyhow::Result<ApplyOutcome> + Sync,
{
    fn apply(
        &self,
        block_ctx: &BlockContext,
        config: &ChainConfig,
        msg: &M,
        statedb: &mut WriteBuf,
    ) -> anyhow::Result<ApplyOutcome> {
        self(block_ctx, config, msg, statedb)
    }
}

/// Whether a transaction's application succeeded or failed, independent of
/// whether gas was consumed (spec.md §7: application failure is not a fatal
/// executor error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Failed,
}

/// A 2048-bit, three-hash Bloom filter over a receipt's own logs, built the
/// same way an EVM-style chain's receipt log bloom is: three 11-bit
/// positions are taken from the low bits of the first three big-endian byte
/// pairs of the item's Keccak-256 hash.
#[derive(Clone, PartialEq, Eq)]
pub struct Bloom(pub [u8; 256]);

impl Bloom {
    pub fn new() -> Self {
        Bloom([0u8; 256])
    }

    pub fn add(&mut self, data: &[u8]) {
        let hash = crate::hashing::keccak256(data);
        for i in [0usize, 2, 4] {
            let bit = (u16::from_be_bytes([hash[i], hash[i + 1]]) & 0x07ff) as usize;
            let byte = 255 - bit / 8;
            self.0[byte] |= 1 << (bit % 8);
        }
    }

    pub fn contains(&self, data: &[u8]) -> bool {
        let hash = crate::hashing::keccak256(data);
        for i in [0usize, 2, 4] {
            let bit = (u16::from_be_bytes([hash[i], hash[i + 1]]) & 0x07ff) as usize;
            let byte = 255 - bit / 8;
            if self.0[byte] & (1 << (bit % 8)) == 0 {
                return false;
            }
        }
        true
    }
}

impl Default for Bloom {
    fn default() -> Self {
        Bloom::new()
    }
}

impl std::fmt::Debug for Bloom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bloom(0x{})", hex::encode(self.0))
    }
}

/// The executor's per-transaction output record (spec.md §4.5 stage 4d).
#[derive(Debug, Clone)]
pub struct Receipt {
    pub tx_type: u8,
    pub tx_hash: Hash,
    pub tx_index: usize,
    pub status: TxStatus,
    pub gas_used: u64,
    /// Running total across the whole block, filled in by stage 5.
    pub cumulative_gas_used: u64,
    pub block_hash: Hash,
    pub block_number: u64,
    pub logs: Vec<Log>,
    pub bloom: Bloom,
}

/// The full result of executing one block (spec.md §4.5).
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub receipts: Vec<Receipt>,
    pub logs: Vec<Log>,
    pub total_gas_used: u64,
}

enum TaskResult {
    Applied { wb: WriteBuf, outcome: ApplyOutcome },
    Fatal(anyhow::Error),
}

fn panic_payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs one block's worth of transactions to completion (spec.md §4.5,
/// stages 1-5).
///
/// `txs` and `msgs` are kept as two separate slices to mirror the external
/// transaction-list/message-list boundary (spec.md §6): the transaction type
/// itself is out of scope here and is never read, only counted, so that its
/// length can be checked against `msgs` per spec.md §7's precondition.
pub fn execute_parallel<T, M, A>(
    config: &ChainConfig,
    block_ctx: &BlockContext,
    state: &mut dyn StateDb,
    txs: &[T],
    msgs: &[M],
    apply: &A,
) -> Result<ExecutionReport, ExecError>
where
    M: Message,
    A: ApplyMsgFn<M>,
{
    if txs.len() != msgs.len() {
        return Err(ExecError::MessageCountMismatch {
            txs: txs.len(),
            msgs: msgs.len(),
        });
    }

    let n = msgs.len();
    if n == 0 {
        return Ok(ExecutionReport {
            receipts: Vec::new(),
            logs: Vec::new(),
            total_gas_used: 0,
        });
    }

    // Stage 1: analyze.
    let analyzer = Analyzer::new(config.clone());
    let access_sets: Vec<_> = msgs.iter().map(|m| analyzer.analyze(m)).collect();

    // Stage 2: build levels.
    let mut levels = build_levels(&access_sets);

    // Stage 3: coinbase-sender fallback check.
    let fallback = msgs.iter().any(|m| m.from() == block_ctx.coinbase);
    if fallback {
        tracing::warn!(
            block_number = block_ctx.block_number,
            tx_count = n,
            "coinbase-sender fallback engaged; executing block serially"
        );
        levels = (0..n).map(|i| vec![i]).collect();
        metrics::FALLBACK_BLOCKS.inc();
        metrics::FALLBACK_TXS.inc_by(n as u64);
    }

    let mut receipt_slots: Vec<Option<Receipt>> = (0..n).map(|_| None).collect();
    let mut block_logs: Vec<Log> = Vec::new();
    let mut total_gas_used: u64 = 0;
    let mut gas_pool = config.block_gas_limit;

    // Stage 4: per level, fork/run/merge.
    for (level_index, level) in levels.iter().enumerate() {
        let _span = tracing::info_span!(
            "paraexec.level",
            level = level_index,
            size = level.len()
        )
        .entered();
        metrics::LEVELS_BUILT.inc();

        // 4a/4b: fork a WriteBuf per tx off a fresh snapshot and run
        // ApplyMsgFn concurrently; `par_iter().map(..).collect()` is the
        // barrier that waits for every task in the level before merging.
        // Reborrowed as shared so every task's closure can call `snapshot()`
        // without contending for a single `&mut` handle; the reborrow's
        // last use is this block, leaving `state` free for the serial
        // merge below.
        let state_shared: &dyn StateDb = &*state;
        let results: Vec<TaskResult> = level
            .par_iter()
            .map(|&idx| {
                let parent: Arc<dyn StateView> = state_shared.snapshot();
                let mut wb = WriteBuf::new(parent);
                wb.prepare(msgs[idx].hash(), idx);
                match panic::catch_unwind(AssertUnwindSafe(|| {
                    apply.apply(block_ctx, config, &msgs[idx], &mut wb)
                })) {
                    Ok(Ok(outcome)) => TaskResult::Applied { wb, outcome },
                    Ok(Err(e)) => TaskResult::Fatal(e),
                    Err(payload) => {
                        TaskResult::Fatal(anyhow::anyhow!(panic_payload_message(&*payload)))
                    }
                }
            })
            .collect();

        // 4c/4d: serial merge, in tx-index order within the level.
        for (&idx, task_result) in level.iter().zip(results.into_iter()) {
            let (wb, outcome) = match task_result {
                TaskResult::Fatal(source) => {
                    return Err(ExecError::ApplyMsgFatal { index: idx, source })
                }
                TaskResult::Applied { wb, outcome } => (wb, outcome),
            };

            if msgs[idx].gas() > gas_pool {
                return Err(ExecError::GasLimitReached);
            }
            gas_pool = gas_pool
                .checked_sub(outcome.used_gas)
                .ok_or(ExecError::GasLimitReached)?;
            total_gas_used += outcome.used_gas;

            wb.merge(state);
            state.finalise(true);

            let mut tx_logs = Vec::with_capacity(wb.logs().len());
            let mut bloom = Bloom::new();
            for raw in wb.logs() {
                let log = Log {
                    address: raw.address,
                    topics: raw.topics.clone(),
                    data: raw.data.clone(),
                    tx_hash: raw.tx_hash,
                    tx_index: raw.tx_index,
                    block_hash: block_ctx.block_hash,
                    block_number: block_ctx.block_number,
                    index: block_logs.len() as u64,
                };
                bloom.add(log.address.as_bytes());
                for topic in &log.topics {
                    bloom.add(topic.as_bytes());
                }
                state.add_log(log.clone());
                block_logs.push(log.clone());
                tx_logs.push(log);
            }

            let status = match outcome.vm_err {
                None => TxStatus::Success,
                Some(ref reason) => {
                    tracing::trace!(tx_index = idx, reason = %reason, "transaction application failed");
                    TxStatus::Failed
                }
            };

            receipt_slots[idx] = Some(Receipt {
                tx_type: msgs[idx].tx_type(),
                tx_hash: msgs[idx].hash(),
                tx_index: idx,
                status,
                gas_used: outcome.used_gas,
                cumulative_gas_used: 0,
                block_hash: block_ctx.block_hash,
                block_number: block_ctx.block_number,
                logs: tx_logs,
                bloom,
            });
        }
    }

    // Stage 5: cumulative-gas pass, strictly in tx-index order.
    let mut cumulative = 0u64;
    let mut receipts = Vec::with_capacity(n);
    for (idx, slot) in receipt_slots.into_iter().enumerate() {
        let mut receipt = slot.ok_or(ExecError::MissingReceipt { index: idx })?;
        cumulative += receipt.gas_used;
        receipt.cumulative_gas_used = cumulative;
        receipts.push(receipt);
    }

    metrics::GAS_USED.inc_by(total_gas_used);

    Ok(ExecutionReport {
        receipts,
        logs: block_logs,
        total_gas_used,
    })
}
