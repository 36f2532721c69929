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

//! Rental records and lifecycle guards.
//!
//! Rentals follow a state machine:
//! - `Active` (booked, no pickup yet) → `Active` (picked up, via
//!   [`RentalState::record_pickup`])
//! - `Active` → `Completed` (via [`RentalState::complete`], sets the end
//!   time) or `Cancelled` (via [`RentalState::cancel`])
//! - `Cancelled` → `Active` (via [`RentalState::reactivate`]) — cancelling
//!   is an administrative reversal and is itself reversible.
//!
//! The end time is set if and only if the rental is Completed.

use crate::base::{CustomerId, LocationId, PlateId, RentalId};
use crate::error::FleetError;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a rental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalStatus {
    /// Booked or ongoing; the pickup time distinguishes the two phases.
    Active,
    /// Vehicle returned; end time recorded.
    Completed,
    /// Administratively reversed; reversible back to Active.
    Cancelled,
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RentalStatus::Active => "Active",
            RentalStatus::Completed => "Completed",
            RentalStatus::Cancelled => "Cancelled",
        };
        write!(f, "{name}")
    }
}

/// Mutable rental state, guarded by the record mutex.
#[derive(Debug)]
pub(crate) struct RentalState {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    status: RentalStatus,
}

impl RentalState {
    fn assert_invariants(&self) {
        debug_assert_eq!(
            self.status == RentalStatus::Completed,
            self.end.is_some(),
            "Invariant violated: end time must be set exactly when completed"
        );
    }

    pub(crate) fn status(&self) -> RentalStatus {
        self.status
    }

    fn require_active(&self, rental: RentalId) -> Result<(), FleetError> {
        if self.status != RentalStatus::Active {
            return Err(FleetError::RentalNotActive {
                rental,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Confirms the vehicle hand-over, ending the booked phase.
    pub(crate) fn record_pickup(
        &mut self,
        rental: RentalId,
        at: DateTime<Utc>,
    ) -> Result<(), FleetError> {
        self.require_active(rental)?;
        if self.start.is_some() {
            return Err(FleetError::PickupAlreadyRecorded(rental));
        }
        self.start = Some(at);
        self.assert_invariants();
        Ok(())
    }

    /// Completes the rental, recording the return time.
    pub(crate) fn complete(&mut self, rental: RentalId, at: DateTime<Utc>) -> Result<(), FleetError> {
        self.require_active(rental)?;
        let Some(start) = self.start else {
            return Err(FleetError::PickupNotRecorded(rental));
        };
        if at < start {
            return Err(FleetError::InvalidTimestamp);
        }
        self.end = Some(at);
        self.status = RentalStatus::Completed;
        self.assert_invariants();
        Ok(())
    }

    /// Administrative reversal of an active rental.
    pub(crate) fn cancel(&mut self, rental: RentalId) -> Result<(), FleetError> {
        self.require_active(rental)?;
        self.status = RentalStatus::Cancelled;
        self.assert_invariants();
        Ok(())
    }

    /// Reverses a cancellation. The caller re-acquires the vehicle before
    /// flipping the status.
    pub(crate) fn reactivate(&mut self, rental: RentalId) -> Result<(), FleetError> {
        if self.status != RentalStatus::Cancelled {
            return Err(FleetError::RentalNotCancelled {
                rental,
                status: self.status,
            });
        }
        self.status = RentalStatus::Active;
        self.assert_invariants();
        Ok(())
    }
}

/// A vehicle rental.
#[derive(Debug)]
pub struct Rental {
    id: RentalId,
    customer: CustomerId,
    plate: PlateId,
    location: LocationId,
    pickup_time: DateTime<Utc>,
    inner: Mutex<RentalState>,
}

impl Rental {
    pub(crate) fn new(
        id: RentalId,
        customer: CustomerId,
        plate: PlateId,
        location: LocationId,
        pickup_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            customer,
            plate,
            location,
            pickup_time,
            inner: Mutex::new(RentalState {
                start: None,
                end: None,
                status: RentalStatus::Active,
            }),
        }
    }

    pub fn id(&self) -> RentalId {
        self.id
    }

    pub fn customer(&self) -> CustomerId {
        self.customer
    }

    pub fn plate(&self) -> &PlateId {
        &self.plate
    }

    pub fn location(&self) -> LocationId {
        self.location
    }

    /// The agreed pickup time, set at booking.
    pub fn pickup_time(&self) -> DateTime<Utc> {
        self.pickup_time
    }

    pub fn status(&self) -> RentalStatus {
        self.inner.lock().status
    }

    /// Actual hand-over time; `None` while still in the booked phase.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().start
    }

    /// Return time; `None` unless completed.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().end
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, RentalState> {
        self.inner.lock()
    }
}
