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

//! Vehicle state control.
//!
//! A vehicle's status is never stored: it is derived from what currently
//! holds the vehicle (`retired` flag, open rental, open maintenance). All
//! transitions go through [`VehicleState`]'s methods, which makes this
//! module the single chokepoint deciding what can happen to a vehicle —
//! the two "in progress" states (rented out, in the shop) can never
//! coexist because the same lock-guarded record gates both.
//!
//! # Status derivation
//!
//! | Condition | Status |
//! |-----------|--------|
//! | `retired` | `Inactive` |
//! | open rental | `InUse` |
//! | open maintenance | `Maintenance` |
//! | none of the above | `Available` |
//!
//! Derivation order matters only for `Inactive`: a retired vehicle cannot
//! acquire an open rental or maintenance in the first place.

use crate::base::{DeploymentId, MaintenanceId, PlateId, RentalId};
use crate::error::{Blocker, FleetError};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived lifecycle status of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleStatus {
    /// Free for booking.
    Available,
    /// Held by an open rental.
    InUse,
    /// Held by an open maintenance session.
    Maintenance,
    /// Retired from the fleet.
    Inactive,
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VehicleStatus::Available => "Available",
            VehicleStatus::InUse => "InUse",
            VehicleStatus::Maintenance => "Maintenance",
            VehicleStatus::Inactive => "Inactive",
        };
        write!(f, "{name}")
    }
}

/// Mutable vehicle state, guarded by the record mutex.
///
/// Holding the guard serializes every read-then-write of this vehicle's
/// derived status, which is what makes "check Available, then book" safe
/// against a concurrent booking for the same plate.
#[derive(Debug)]
pub(crate) struct VehicleState {
    plate: PlateId,
    retired: bool,
    open_rental: Option<RentalId>,
    open_maintenance: Option<MaintenanceId>,
    open_deployment: Option<DeploymentId>,
}

impl VehicleState {
    fn new(plate: PlateId) -> Self {
        Self {
            plate,
            retired: false,
            open_rental: None,
            open_maintenance: None,
            open_deployment: None,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            !(self.open_rental.is_some() && self.open_maintenance.is_some()),
            "Invariant violated: vehicle {} is simultaneously rented and in maintenance",
            self.plate
        );
        debug_assert!(
            !(self.retired && (self.open_rental.is_some() || self.open_maintenance.is_some())),
            "Invariant violated: retired vehicle {} holds an open record",
            self.plate
        );
    }

    pub(crate) fn status(&self) -> VehicleStatus {
        if self.retired {
            VehicleStatus::Inactive
        } else if self.open_rental.is_some() {
            VehicleStatus::InUse
        } else if self.open_maintenance.is_some() {
            VehicleStatus::Maintenance
        } else {
            VehicleStatus::Available
        }
    }

    /// Whatever currently prevents the vehicle from being Available.
    pub(crate) fn blocker(&self) -> Option<Blocker> {
        if self.retired {
            Some(Blocker::Retired)
        } else if let Some(rental) = self.open_rental {
            Some(Blocker::OpenRental(rental))
        } else {
            self.open_maintenance.map(Blocker::OpenMaintenance)
        }
    }

    fn conflict(&self, blocker: Blocker) -> FleetError {
        FleetError::VehicleConflict {
            plate: self.plate.clone(),
            blocker,
        }
    }

    /// Commits the vehicle to a rental (transition to InUse).
    pub(crate) fn begin_rental(&mut self, rental: RentalId) -> Result<(), FleetError> {
        if let Some(blocker) = self.blocker() {
            return Err(self.conflict(blocker));
        }
        self.open_rental = Some(rental);
        self.assert_invariants();
        Ok(())
    }

    /// Releases the vehicle from a rental, if that rental still holds it.
    pub(crate) fn end_rental(&mut self, rental: RentalId) {
        if self.open_rental == Some(rental) {
            self.open_rental = None;
        }
        self.assert_invariants();
    }

    /// Commits the vehicle to a maintenance session.
    pub(crate) fn begin_maintenance(&mut self, maintenance: MaintenanceId) -> Result<(), FleetError> {
        if let Some(blocker) = self.blocker() {
            return Err(self.conflict(blocker));
        }
        self.open_maintenance = Some(maintenance);
        self.assert_invariants();
        Ok(())
    }

    /// Releases the vehicle from a maintenance session, if it still holds it.
    pub(crate) fn end_maintenance(&mut self, maintenance: MaintenanceId) {
        if self.open_maintenance == Some(maintenance) {
            self.open_maintenance = None;
        }
        self.assert_invariants();
    }

    /// Retires the vehicle. Refused while an open rental or maintenance
    /// exists; a later [`VehicleState::reinstate`] derives Available, never
    /// a stale prior status.
    pub(crate) fn retire(&mut self) -> Result<(), FleetError> {
        if let Some(rental) = self.open_rental {
            return Err(self.conflict(Blocker::OpenRental(rental)));
        }
        if let Some(maintenance) = self.open_maintenance {
            return Err(self.conflict(Blocker::OpenMaintenance(maintenance)));
        }
        self.retired = true;
        self.assert_invariants();
        Ok(())
    }

    /// Brings a retired vehicle back into the fleet. No-op if not retired.
    pub(crate) fn reinstate(&mut self) {
        self.retired = false;
    }

    pub(crate) fn open_deployment(&self) -> Option<DeploymentId> {
        self.open_deployment
    }

    /// Points the vehicle at a new current deployment, returning the
    /// previous one (which the caller has already closed in the same
    /// locked scope).
    pub(crate) fn swap_deployment(&mut self, deployment: Option<DeploymentId>) -> Option<DeploymentId> {
        std::mem::replace(&mut self.open_deployment, deployment)
    }
}

/// A fleet vehicle.
///
/// Identity and registration data are immutable; everything that moves
/// lives behind the state mutex.
#[derive(Debug)]
pub struct Vehicle {
    plate: PlateId,
    kind: String,
    daily_rate: Decimal,
    inner: Mutex<VehicleState>,
}

impl Vehicle {
    pub(crate) fn new(plate: PlateId, kind: String, daily_rate: Decimal) -> Self {
        let state = VehicleState::new(plate.clone());
        Self {
            plate,
            kind,
            daily_rate,
            inner: Mutex::new(state),
        }
    }

    pub fn plate(&self) -> &PlateId {
        &self.plate
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn daily_rate(&self) -> Decimal {
        self.daily_rate
    }

    /// Derives the vehicle's current status.
    pub fn status(&self) -> VehicleStatus {
        self.inner.lock().status()
    }

    /// Locks the vehicle state for a compound read-then-write. Engine
    /// operations hold this guard across every step that depends on the
    /// derived status.
    pub(crate) fn state(&self) -> MutexGuard<'_, VehicleState> {
        self.inner.lock()
    }
}
