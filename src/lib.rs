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

//! # Fleet Engine
//!
//! This library provides the management core for an electric-vehicle
//! rental fleet: customers book vehicles at locations, vehicles move
//! between locations (deployments), vehicles undergo maintenance that
//! consumes spare parts, and penalties are assessed against rentals
//! linked to maintenance events. Records are soft-deleted and reactivated
//! rather than removed, and the engine keeps vehicle status, rental
//! state, deployment location, maintenance activity and spare-part stock
//! mutually consistent throughout.
//!
//! ## Core Components
//!
//! - [`Fleet`]: Command boundary processing bookings, deployments,
//!   maintenance ledgers, stock and penalties
//! - [`Vehicle`]: Fleet vehicle with a derived status ([`VehicleStatus`])
//! - [`Rental`]: Booking with the active/completed/cancelled lifecycle
//! - [`Maintenance`]: Maintenance session owning its cheque-line ledger
//! - [`Part`]: Spare part with conservation-checked stock
//! - [`FleetError`]: Typed failures for every command
//!
//! ## Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use fleet_engine_rs::{CustomerId, Fleet, LocationId, PlateId, VehicleStatus};
//! use rust_decimal_macros::dec;
//!
//! let fleet = Fleet::new();
//! let plate = PlateId::from("ES-001");
//! fleet
//!     .register_vehicle(plate.clone(), "scooter".to_owned(), dec!(25.00))
//!     .unwrap();
//!
//! // Book the vehicle for a customer.
//! let pickup = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
//! let rental = fleet
//!     .book_rental(CustomerId(1), &plate, LocationId(1), pickup)
//!     .unwrap();
//!
//! assert_eq!(fleet.vehicle_status(&plate), Ok(VehicleStatus::InUse));
//!
//! // Hand over, then return the vehicle.
//! fleet.record_pickup(rental, pickup).unwrap();
//! fleet
//!     .complete_rental(rental, Utc.with_ymd_and_hms(2025, 6, 1, 17, 0, 0).unwrap())
//!     .unwrap();
//! assert_eq!(fleet.vehicle_status(&plate), Ok(VehicleStatus::Available));
//! ```
//!
//! ## Thread Safety
//!
//! The engine serializes operations per vehicle and per part while
//! allowing concurrent processing across different records: of two
//! concurrent bookings for the same plate, exactly one succeeds and the
//! other is told which record blocks it.

pub mod base;
pub mod deployment;
mod engine;
pub mod error;
mod gateway;
pub mod maintenance;
pub mod part;
pub mod penalty;
pub mod rental;
pub mod vehicle;

pub use base::{
    CustomerId, DeploymentId, LocationId, MaintenanceId, PartId, PenaltyId, PlateId, RentalId,
    TechnicianId,
};
pub use deployment::Deployment;
pub use engine::{Fleet, VehicleReport};
pub use error::{Blocker, FleetError};
pub use maintenance::{ChequeLine, LineStatus, Maintenance};
pub use part::Part;
pub use penalty::{Penalty, PenaltyStatement, PenaltyStatus};
pub use rental::{Rental, RentalStatus};
pub use vehicle::{Vehicle, VehicleStatus};
