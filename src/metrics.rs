// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! Process-wide counters, in the shape of `aptos-metrics-core`'s shortcut
//! macros: `once_cell::sync::Lazy` statics wrapping `prometheus` collectors.
//! Incremented only at level granularity (spec.md §5: "not on the hot path").

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, IntCounter};

pub static FALLBACK_BLOCKS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "paraexec_fallback_blocks_total",
        "Number of blocks where the coinbase-sender serial fallback engaged"
    )
    .unwrap()
});

pub static FALLBACK_TXS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "paraexec_fallback_txs_total",
        "Number of transactions executed under the coinbase-sender serial fallback"
    )
    .unwrap()
});

pub static LEVELS_BUILT: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "paraexec_levels_built_total",
        "Number of execution levels run across all blocks"
    )
    .unwrap()
});

pub static GAS_USED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "paraexec_gas_used_total",
        "Cumulative gas used across all executed blocks"
    )
    .unwrap()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_or_later_and_only_increase() {
        let before = LEVELS_BUILT.get();
        LEVELS_BUILT.inc();
        assert_eq!(LEVELS_BUILT.get(), before + 1);
    }
}
