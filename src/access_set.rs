// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-transaction read/write footprint and the conflict predicate that
//! drives level assignment (spec.md §3, §4.1).

use crate::types::{Address, Hash};
use std::collections::{HashMap, HashSet};

/// Describes one transaction's reads and writes at account-address and
/// (address, storage-slot) granularity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSet {
    read_addrs: HashSet<Address>,
    read_slots: HashMap<Address, HashSet<Hash>>,
    write_addrs: HashSet<Address>,
    write_slots: HashMap<Address, HashSet<Hash>>,
}

impl AccessSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_read_addr(&mut self, addr: Address) {
        self.read_addrs.insert(addr);
    }

    pub fn add_write_addr(&mut self, addr: Address) {
        self.write_addrs.insert(addr);
    }

    pub fn add_read_slot(&mut self, addr: Address, slot: Hash) {
        self.read_slots.entry(addr).or_default().insert(slot);
    }

    pub fn add_write_slot(&mut self, addr: Address, slot: Hash) {
        self.write_slots.entry(addr).or_default().insert(slot);
    }

    pub fn read_addrs(&self) -> &HashSet<Address> {
        &self.read_addrs
    }

    pub fn write_addrs(&self) -> &HashSet<Address> {
        &self.write_addrs
    }

    pub fn read_slots(&self) -> &HashMap<Address, HashSet<Hash>> {
        &self.read_slots
    }

    pub fn write_slots(&self) -> &HashMap<Address, HashSet<Hash>> {
        &self.write_slots
    }

    /// Symmetric conflict predicate (spec.md §3):
    ///
    /// true iff a write-address in one set is present in the other's
    /// read-addrs or write-addrs, OR a written (address, slot) pair in one
    /// set is present in the other's read-slots or write-slots under the
    /// same address. Pure read/read overlap is never a conflict.
    pub fn conflicts(&self, other: &AccessSet) -> bool {
        Self::write_addrs_conflict(self, other) || Self::write_addrs_conflict(other, self)
    }

    fn write_addrs_conflict(writer: &AccessSet, other: &AccessSet) -> bool {
        for addr in &writer.write_addrs {
            if other.read_addrs.contains(addr) || other.write_addrs.contains(addr) {
                return true;
            }
            // A whole-address write implicitly covers every slot under that
            // address, so it conflicts with any slot-level access the other
            // set has recorded there too.
            if other.read_slots.contains_key(addr) || other.write_slots.contains_key(addr) {
                return true;
            }
        }
        for (addr, slots) in &writer.write_slots {
            if let Some(other_read) = other.read_slots.get(addr) {
                if !slots.is_disjoint(other_read) {
                    return true;
                }
            }
            if let Some(other_write) = other.write_slots.get(addr) {
                if !slots.is_disjoint(other_write) {
                    return true;
                }
            }
        }
        false
    }
}
