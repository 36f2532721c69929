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

//! Spare-part stock management.
//!
//! On-hand quantity only ever changes through three operations —
//! [`PartState::consume`], [`PartState::restore`], [`PartState::restock`] —
//! each an atomic read-modify-write under the part mutex. There is no way
//! to overwrite the quantity directly, which is what keeps the stock
//! conservation invariant checkable: for a part with no restocks,
//! `on_hand + Σ(active ledger quantities)` is constant.
//!
//! Lock acquisition is bounded: a part lock held longer than
//! [`STOCK_LOCK_TIMEOUT`] surfaces as
//! [`FleetError::ConcurrentModification`], which the command boundary
//! retries once.

use crate::base::PartId;
use crate::error::FleetError;
use crate::gateway::Soft;
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::time::Duration;

/// Bound on waiting for a part's stock lock.
pub(crate) const STOCK_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Mutable part state, guarded by the record mutex.
#[derive(Debug)]
pub(crate) struct PartState {
    quantity: u32,
    price: Decimal,
    active: bool,
}

impl PartState {
    /// Runs the consumption checks without mutating. Cascades use this to
    /// verify every line before applying any decrement.
    pub(crate) fn check_consume(&self, part: &PartId, quantity: u32) -> Result<(), FleetError> {
        if quantity == 0 {
            return Err(FleetError::InvalidQuantity);
        }
        if !self.active {
            return Err(FleetError::PartNotFound(part.clone()));
        }
        if quantity > self.quantity {
            return Err(FleetError::InsufficientStock {
                part: part.clone(),
                requested: quantity,
                on_hand: self.quantity,
            });
        }
        Ok(())
    }

    /// Decrements on-hand stock: "decrement iff the result stays ≥ 0" as
    /// one step. Inactive parts reject new consumption.
    pub(crate) fn consume(&mut self, part: &PartId, quantity: u32) -> Result<(), FleetError> {
        self.check_consume(part, quantity)?;
        self.quantity -= quantity;
        Ok(())
    }

    /// Returns previously consumed stock. Applies to inactive parts as
    /// well: committed consumption must remain reversible.
    pub(crate) fn restore(&mut self, quantity: u32) -> Result<(), FleetError> {
        if quantity == 0 {
            return Err(FleetError::InvalidQuantity);
        }
        self.quantity += quantity;
        Ok(())
    }

    /// Manual stock increase, active parts only.
    pub(crate) fn restock(&mut self, part: &PartId, quantity: u32) -> Result<(), FleetError> {
        if quantity == 0 {
            return Err(FleetError::InvalidQuantity);
        }
        if !self.active {
            return Err(FleetError::PartNotFound(part.clone()));
        }
        self.quantity += quantity;
        Ok(())
    }

    pub(crate) fn quantity(&self) -> u32 {
        self.quantity
    }

    pub(crate) fn price(&self) -> Decimal {
        self.price
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// A spare part.
#[derive(Debug)]
pub struct Part {
    id: PartId,
    name: String,
    inner: Mutex<PartState>,
}

impl Part {
    const PRICE_PRECISION: u32 = 2;

    pub(crate) fn new(id: PartId, name: String, quantity: u32, price: Decimal) -> Self {
        Self {
            id,
            name,
            inner: Mutex::new(PartState {
                quantity,
                price,
                active: true,
            }),
        }
    }

    pub fn id(&self) -> &PartId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// On-hand stock.
    pub fn quantity(&self) -> u32 {
        self.inner.lock().quantity()
    }

    pub fn price(&self) -> Decimal {
        self.inner.lock().price()
    }

    pub fn active(&self) -> bool {
        self.inner.lock().active
    }

    /// Acquires the stock lock within [`STOCK_LOCK_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// [`FleetError::ConcurrentModification`] if another operation holds
    /// the lock past the bound; nothing has been modified at that point,
    /// so the caller may retry.
    pub(crate) fn guard(&self) -> Result<MutexGuard<'_, PartState>, FleetError> {
        self.inner
            .try_lock_for(STOCK_LOCK_TIMEOUT)
            .ok_or(FleetError::ConcurrentModification)
    }

    pub(crate) fn consume(&self, quantity: u32) -> Result<(), FleetError> {
        self.guard()?.consume(&self.id, quantity)
    }

    pub(crate) fn restore(&self, quantity: u32) -> Result<(), FleetError> {
        self.guard()?.restore(quantity)
    }

    pub(crate) fn restock(&self, quantity: u32) -> Result<(), FleetError> {
        self.guard()?.restock(&self.id, quantity)
    }

    pub(crate) fn set_active(&self, active: bool) -> Result<(), FleetError> {
        self.guard()?.set_active(active);
        Ok(())
    }
}

impl Soft for Part {
    fn is_active(&self) -> bool {
        self.inner.lock().active
    }
}

impl Serialize for Part {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let state = self.inner.lock();
        let mut row = serializer.serialize_struct("Part", 5)?;
        row.serialize_field("part", &self.id)?;
        row.serialize_field("name", &self.name)?;
        row.serialize_field("quantity", &state.quantity)?;
        row.serialize_field("price", &state.price.round_dp(Part::PRICE_PRECISION))?;
        row.serialize_field("active", &state.active)?;
        row.end()
    }
}
