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

//! Error types for fleet command processing.

use crate::base::{DeploymentId, MaintenanceId, PartId, PenaltyId, PlateId, RentalId};
use crate::rental::RentalStatus;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// The record blocking a requested vehicle transition.
///
/// Conflicts always name the blocking record so the caller can show (or
/// resolve) the actual obstacle instead of a generic refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blocker {
    /// An unfinished rental holds the vehicle.
    OpenRental(RentalId),
    /// An unfinished maintenance session holds the vehicle.
    OpenMaintenance(MaintenanceId),
    /// The vehicle has been retired from the fleet.
    Retired,
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::OpenRental(rental) => write!(f, "open rental {rental}"),
            Blocker::OpenMaintenance(maintenance) => {
                write!(f, "open maintenance {maintenance}")
            }
            Blocker::Retired => write!(f, "retired from fleet"),
        }
    }
}

/// Fleet command processing errors.
///
/// Every command on [`crate::Fleet`] returns one of these instead of
/// panicking or writing partial state. Only [`FleetError::ConcurrentModification`]
/// is retried (once, transparently) before being surfaced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FleetError {
    /// Referenced vehicle does not exist
    #[error("vehicle {0} not found")]
    VehicleNotFound(PlateId),

    /// Referenced part does not exist, or is inactive where an active
    /// part was required
    #[error("part {0} not found or not active")]
    PartNotFound(PartId),

    /// Referenced rental does not exist
    #[error("rental {0} not found")]
    RentalNotFound(RentalId),

    /// Referenced maintenance does not exist
    #[error("maintenance {0} not found")]
    MaintenanceNotFound(MaintenanceId),

    /// Referenced deployment does not exist
    #[error("deployment {0} not found")]
    DeploymentNotFound(DeploymentId),

    /// Referenced penalty does not exist
    #[error("penalty {0} not found")]
    PenaltyNotFound(PenaltyId),

    /// No cheque line exists for the (maintenance, part) pair
    #[error("maintenance {maintenance} has no usage recorded for part {part}")]
    ChequeLineNotFound {
        maintenance: MaintenanceId,
        part: PartId,
    },

    /// A vehicle with this plate is already registered
    #[error("vehicle {0} is already registered")]
    DuplicateVehicle(PlateId),

    /// A part with this ID is already registered
    #[error("part {0} is already registered")]
    DuplicatePart(PartId),

    /// The vehicle cannot make the requested transition; names the
    /// blocking record
    #[error("vehicle {plate} is unavailable: {blocker}")]
    VehicleConflict { plate: PlateId, blocker: Blocker },

    /// The rental is not in the Active state required by the operation
    #[error("rental {rental} is not active (status: {status})")]
    RentalNotActive {
        rental: RentalId,
        status: RentalStatus,
    },

    /// Reactivation requested for a rental that is not cancelled
    #[error("rental {rental} is not cancelled (status: {status})")]
    RentalNotCancelled {
        rental: RentalId,
        status: RentalStatus,
    },

    /// The rental has no recorded pickup yet
    #[error("rental {0} has no recorded pickup")]
    PickupNotRecorded(RentalId),

    /// The rental already has a recorded pickup
    #[error("rental {0} already has a recorded pickup")]
    PickupAlreadyRecorded(RentalId),

    /// The maintenance session has already been closed
    #[error("maintenance {0} is already closed")]
    MaintenanceClosed(MaintenanceId),

    /// The maintenance session is deactivated
    #[error("maintenance {0} is deactivated")]
    MaintenanceInactive(MaintenanceId),

    /// A cheque line for the (maintenance, part) pair already exists
    #[error("maintenance {maintenance} already records usage of part {part}")]
    ChequeLineExists {
        maintenance: MaintenanceId,
        part: PartId,
    },

    /// The supplied total cost disagrees with the sum of active lines
    #[error(
        "total cost {supplied} for maintenance {maintenance} does not match ledger sum {derived}"
    )]
    CostMismatch {
        maintenance: MaintenanceId,
        supplied: Decimal,
        derived: Decimal,
    },

    /// The deployment already has an end date
    #[error("deployment {0} is already closed")]
    DeploymentClosed(DeploymentId),

    /// A stock decrement requested more than the on-hand quantity
    #[error("insufficient stock of part {part}: requested {requested}, on hand {on_hand}")]
    InsufficientStock {
        part: PartId,
        requested: u32,
        on_hand: u32,
    },

    /// The record changed (or stayed locked) between read and write;
    /// retried once before surfacing
    #[error("record was modified concurrently, retry the operation")]
    ConcurrentModification,

    /// The operation would orphan a dependent record
    #[error("part {part} is still referenced by the ledger of maintenance {maintenance}")]
    ReferentialIntegrity {
        part: PartId,
        maintenance: MaintenanceId,
    },

    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Quantity is zero
    #[error("invalid quantity (must be positive)")]
    InvalidQuantity,

    /// An end timestamp precedes the matching start timestamp
    #[error("end timestamp precedes start")]
    InvalidTimestamp,
}

#[cfg(test)]
mod tests {
    use super::{Blocker, FleetError};
    use crate::base::{MaintenanceId, PartId, PlateId, RentalId};
    use crate::rental::RentalStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            FleetError::VehicleNotFound(PlateId::from("ES-001")).to_string(),
            "vehicle ES-001 not found"
        );
        assert_eq!(
            FleetError::PartNotFound(PartId::from("P-010")).to_string(),
            "part P-010 not found or not active"
        );
        assert_eq!(
            FleetError::VehicleConflict {
                plate: PlateId::from("ES-001"),
                blocker: Blocker::OpenRental(RentalId(7)),
            }
            .to_string(),
            "vehicle ES-001 is unavailable: open rental 7"
        );
        assert_eq!(
            FleetError::VehicleConflict {
                plate: PlateId::from("ES-002"),
                blocker: Blocker::OpenMaintenance(MaintenanceId(3)),
            }
            .to_string(),
            "vehicle ES-002 is unavailable: open maintenance 3"
        );
        assert_eq!(
            FleetError::VehicleConflict {
                plate: PlateId::from("ES-003"),
                blocker: Blocker::Retired,
            }
            .to_string(),
            "vehicle ES-003 is unavailable: retired from fleet"
        );
        assert_eq!(
            FleetError::RentalNotActive {
                rental: RentalId(4),
                status: RentalStatus::Completed,
            }
            .to_string(),
            "rental 4 is not active (status: Completed)"
        );
        assert_eq!(
            FleetError::InsufficientStock {
                part: PartId::from("P-010"),
                requested: 5,
                on_hand: 3,
            }
            .to_string(),
            "insufficient stock of part P-010: requested 5, on hand 3"
        );
        assert_eq!(
            FleetError::CostMismatch {
                maintenance: MaintenanceId(2),
                supplied: dec!(100.00),
                derived: dec!(80.00),
            }
            .to_string(),
            "total cost 100.00 for maintenance 2 does not match ledger sum 80.00"
        );
        assert_eq!(
            FleetError::ConcurrentModification.to_string(),
            "record was modified concurrently, retry the operation"
        );
        assert_eq!(
            FleetError::InvalidAmount.to_string(),
            "invalid amount (must be positive)"
        );
        assert_eq!(
            FleetError::InvalidQuantity.to_string(),
            "invalid quantity (must be positive)"
        );
    }

    #[test]
    fn errors_are_cloneable() {
        let error = FleetError::InsufficientStock {
            part: PartId::from("P-001"),
            requested: 2,
            on_hand: 1,
        };
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
