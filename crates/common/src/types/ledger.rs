// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Side tables collected alongside the trace tree

use alloy_primitives::{keccak256, Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use std::{
    collections::{btree_map::Entry, BTreeMap},
    ops::Deref,
};

/// Every `KECCAK256` input seen during the transaction, keyed by its digest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreimageLedger(BTreeMap<B256, Bytes>);

impl PreimageLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `data` and record it; a repeated digest keeps the latest input
    pub fn record(&mut self, data: Bytes) -> B256 {
        let digest = keccak256(&data);
        self.0.insert(digest, data);
        digest
    }

    /// Preimage of `digest`, if recorded
    pub fn preimage(&self, digest: &B256) -> Option<&Bytes> {
        self.0.get(digest)
    }

    /// Consume the ledger
    pub fn into_inner(self) -> BTreeMap<B256, Bytes> {
        self.0
    }
}

impl Deref for PreimageLedger {
    type Target = BTreeMap<B256, Bytes>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Decoding hints for one deployed code, reserved for a later enrichment step
///
/// Fields are always present in the serialized form, even when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressMetadata {
    /// Custom errors by selector
    #[serde(default)]
    pub errors: BTreeMap<String, serde_json::Value>,
    /// Events by topic
    #[serde(default)]
    pub events: BTreeMap<String, serde_json::Value>,
    /// Functions by selector
    #[serde(default)]
    pub functions: BTreeMap<String, serde_json::Value>,
    /// Human readable label
    #[serde(default)]
    pub label: String,
}

/// Every `(address, code hash)` pair that finalized a frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook(BTreeMap<Address, BTreeMap<B256, AddressMetadata>>);

impl AddressBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `(address, code_hash)` has an entry
    ///
    /// Existing metadata is left alone. Returns `true` if the entry was new.
    pub fn ensure(&mut self, address: Address, code_hash: B256) -> bool {
        match self.0.entry(address).or_default().entry(code_hash) {
            Entry::Vacant(slot) => {
                slot.insert(AddressMetadata::default());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Metadata for `(address, code_hash)`, if registered
    pub fn get(&self, address: &Address, code_hash: &B256) -> Option<&AddressMetadata> {
        self.0.get(address)?.get(code_hash)
    }

    /// Mutable metadata for `(address, code_hash)`, if registered
    pub fn get_mut(&mut self, address: &Address, code_hash: &B256) -> Option<&mut AddressMetadata> {
        self.0.get_mut(address)?.get_mut(code_hash)
    }

    /// Number of `(address, code hash)` entries
    pub fn entry_count(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }
}

impl Deref for AddressBook {
    type Target = BTreeMap<Address, BTreeMap<B256, AddressMetadata>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
