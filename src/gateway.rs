// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
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

//! In-memory persistence gateway.
//!
//! [`Registry`] is the per-entity record store the engine reads and writes
//! through. It offers two read paths: [`Registry::get`] includes inactive
//! (soft-deleted) records — the audit path penalty resolution depends on —
//! while [`Registry::get_active`] is the default active-only path used by
//! command preconditions.
//!
//! Insertion uses the map's entry API so duplicate detection is a single
//! atomic check-and-insert, safe under concurrent callers.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::hash::Hash;
use std::sync::Arc;

/// A soft-deletable record that reports whether it is currently active.
pub(crate) trait Soft {
    fn is_active(&self) -> bool;
}

/// Marker returned when an insert collides with an existing key.
///
/// The engine maps this onto the entity-specific duplicate error.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct DuplicateKey;

/// A concurrent keyed record store with duplicate detection.
pub(crate) struct Registry<K, T> {
    records: DashMap<K, Arc<T>>,
}

impl<K: Eq + Hash + Clone, T> Registry<K, T> {
    pub(crate) fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Adds a record under `key`, returning the shared handle.
    ///
    /// Fails with [`DuplicateKey`] if the key is already taken.
    pub(crate) fn insert(&self, key: K, record: T) -> Result<Arc<T>, DuplicateKey> {
        match self.records.entry(key) {
            Entry::Occupied(_) => Err(DuplicateKey),
            Entry::Vacant(entry) => {
                let record = Arc::new(record);
                entry.insert(Arc::clone(&record));
                Ok(record)
            }
        }
    }

    /// Including-inactive read path.
    pub(crate) fn get(&self, key: &K) -> Option<Arc<T>> {
        self.records.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Physically removes a record. Reserved for the few sanctioned hard
    /// deletes; soft delete is the norm.
    pub(crate) fn remove(&self, key: &K) -> Option<Arc<T>> {
        self.records.remove(key).map(|(_, record)| record)
    }

    /// Iterates over all records, inactive ones included.
    pub(crate) fn iter(
        &self,
    ) -> impl Iterator<Item = dashmap::mapref::multiple::RefMulti<'_, K, Arc<T>>> {
        self.records.iter()
    }
}

impl<K: Eq + Hash + Clone, T: Soft> Registry<K, T> {
    /// Active-only read path (the default for command preconditions).
    pub(crate) fn get_active(&self, key: &K) -> Option<Arc<T>> {
        self.get(key).filter(|record| record.is_active())
    }
}
