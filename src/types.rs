// Copyright (c) The Paraexec Authors
// SPDX-License-Identifier: Apache-2.0

//! Primitive identifiers and the arbitrary-precision balance type shared by
//! every other module in this crate.

use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque 20-byte account identifier. Equality is bytewise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(#[serde(with = "hex::serde")] pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The null recipient used to mark a `SetCode` transaction (spec.md §4.2).
    pub fn is_null(&self) -> bool {
        *self == Address::ZERO
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Opaque 32-byte identifier used for storage slot keys and tx/block hashes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(#[serde(with = "hex::serde")] pub [u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(0x{})", hex::encode(self.0))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Arbitrary-precision account balance.
///
/// Backed by a signed big integer rather than `BigUint` because overlay
/// arithmetic can pass through a negative intermediate value between a
/// `sub_balance` and a later `add_balance` within the same transaction
/// (spec.md §4.4); only the value observed at merge time must be
/// non-negative, and that is the underlying state database's concern, not
/// this overlay's.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Balance(BigInt);

impl Balance {
    pub fn zero() -> Self {
        Balance(BigInt::zero())
    }

    pub fn from_u64(v: u64) -> Self {
        Balance(BigInt::from(v))
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == num_bigint::Sign::Minus
    }

    pub fn checked_add(&self, other: &Balance) -> Balance {
        Balance(&self.0 + &other.0)
    }

    pub fn checked_sub(&self, other: &Balance) -> Balance {
        Balance(&self.0 - &other.0)
    }

    /// Signed difference `self - other`, used by the merge step to turn two
    /// absolute overlay balances into the delta applied to the live state.
    pub fn delta_from(&self, other: &Balance) -> BigInt {
        &self.0 - &other.0
    }

    /// Builds a `Balance` from the absolute value of a signed delta, for
    /// feeding into `add_balance`/`sub_balance` at merge time.
    pub fn from_abs_delta(delta: &BigInt) -> Balance {
        Balance(if delta.sign() == num_bigint::Sign::Minus {
            -delta
        } else {
            delta.clone()
        })
    }
}

impl Default for Balance {
    fn default() -> Self {
        Balance::zero()
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Balance {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<BigInt>()
            .map(Balance)
            .map_err(serde::de::Error::custom)
    }
}

/// Opaque byte blob, used for contract code and transaction payloads.
pub type Bytes = Vec<u8>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_equality_is_bytewise() {
        assert_eq!(Address::new([1; 20]), Address::new([1; 20]));
        assert_ne!(Address::new([1; 20]), Address::new([2; 20]));
    }

    #[test]
    fn address_zero_is_null() {
        assert!(Address::ZERO.is_null());
        assert!(!Address::new([1; 20]).is_null());
    }

    #[test]
    fn balance_delta_can_be_negative() {
        let a = Balance::from_u64(10);
        let b = Balance::from_u64(15);
        assert!(a.delta_from(&b) < BigInt::zero());
    }

    #[test]
    fn balance_display_parses_back_to_the_same_value() {
        let b = Balance::from_u64(12345);
        let parsed: BigInt = b.to_string().parse().unwrap();
        assert_eq!(Balance(parsed), b);
    }
}
