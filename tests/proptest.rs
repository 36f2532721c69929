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

//! Property-based tests for the fleet engine.
//!
//! These tests verify invariants that should hold for any sequence of
//! commands, successful or rejected: stock conservation, at most one open
//! deployment, at most one active rental, and the mutual exclusion of the
//! InUse and Maintenance states.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fleet_engine_rs::{
    CustomerId, Fleet, LineStatus, LocationId, MaintenanceId, PartId, PlateId, RentalId,
    RentalStatus, TechnicianId, VehicleStatus,
};
use proptest::prelude::*;
use rust_decimal_macros::dec;

// =============================================================================
// Helpers and Arbitrary Strategies
// =============================================================================

const INITIAL_STOCK: u32 = 20;
const PART_COUNT: usize = 3;

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour % 24, 0, 0).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, d.clamp(1, 28)).unwrap()
}

fn part_id(index: usize) -> PartId {
    PartId(format!("P-{:03}", index % PART_COUNT))
}

fn fleet_with_parts() -> Fleet {
    let fleet = Fleet::new();
    fleet
        .register_vehicle(PlateId::from("ES-001"), "scooter".to_owned(), dec!(25.00))
        .unwrap();
    for index in 0..PART_COUNT {
        fleet
            .register_part(
                part_id(index),
                format!("part {index}"),
                INITIAL_STOCK,
                dec!(3.25),
            )
            .unwrap();
    }
    fleet
}

/// One step against a single maintenance ledger.
#[derive(Debug, Clone)]
enum LedgerOp {
    Use { part: usize, quantity: u32 },
    DeactivateLine { part: usize },
    ReactivateLine { part: usize },
    SuspendSession,
    RestoreSession,
}

fn arb_ledger_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (0..PART_COUNT, 1u32..=5).prop_map(|(part, quantity)| LedgerOp::Use { part, quantity }),
        (0..PART_COUNT).prop_map(|part| LedgerOp::DeactivateLine { part }),
        (0..PART_COUNT).prop_map(|part| LedgerOp::ReactivateLine { part }),
        Just(LedgerOp::SuspendSession),
        Just(LedgerOp::RestoreSession),
    ]
}

/// One step against a single vehicle's rental/maintenance lifecycle.
#[derive(Debug, Clone)]
enum VehicleOp {
    Book,
    Pickup,
    Complete,
    Cancel,
    Reactivate,
    OpenMaintenance,
    CloseMaintenance,
    DeactivateMaintenance,
    ReactivateMaintenance,
}

fn arb_vehicle_op() -> impl Strategy<Value = VehicleOp> {
    prop_oneof![
        Just(VehicleOp::Book),
        Just(VehicleOp::Pickup),
        Just(VehicleOp::Complete),
        Just(VehicleOp::Cancel),
        Just(VehicleOp::Reactivate),
        Just(VehicleOp::OpenMaintenance),
        Just(VehicleOp::CloseMaintenance),
        Just(VehicleOp::DeactivateMaintenance),
        Just(VehicleOp::ReactivateMaintenance),
    ]
}

// =============================================================================
// Stock Conservation
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// With no restocks, `on_hand + Σ(active ledger quantities)` stays at
    /// the initial stock for every part, across any ledger op sequence.
    #[test]
    fn stock_is_conserved_across_ledger_operations(
        ops in prop::collection::vec(arb_ledger_op(), 1..40),
    ) {
        let fleet = fleet_with_parts();
        let maintenance = fleet
            .open_maintenance(&PlateId::from("ES-001"), TechnicianId(1), at(8))
            .unwrap();

        for op in &ops {
            // Preconditions may reject any given op; that's fine, the
            // invariant must hold regardless.
            let _ = match op {
                LedgerOp::Use { part, quantity } => {
                    fleet.add_part_usage(maintenance, &part_id(*part), *quantity)
                }
                LedgerOp::DeactivateLine { part } => {
                    fleet.deactivate_cheque_line(maintenance, &part_id(*part))
                }
                LedgerOp::ReactivateLine { part } => {
                    fleet.reactivate_cheque_line(maintenance, &part_id(*part))
                }
                LedgerOp::SuspendSession => fleet.deactivate_maintenance(maintenance),
                LedgerOp::RestoreSession => fleet.reactivate_maintenance(maintenance),
            };

            let record = fleet.get_maintenance(maintenance).unwrap();
            for index in 0..PART_COUNT {
                let part = part_id(index);
                let consumed = record
                    .line(&part)
                    .filter(|line| line.status() == LineStatus::Active)
                    .map(|line| line.quantity())
                    .unwrap_or(0);
                prop_assert_eq!(
                    fleet.stock_on_hand(&part).unwrap() + consumed,
                    INITIAL_STOCK,
                    "conservation broken after {:?}",
                    op
                );
            }
        }
    }

    /// Repeating a line toggle is a no-op: the same final line states give
    /// the same final stock no matter how many times toggles were retried.
    #[test]
    fn line_toggles_are_idempotent(
        quantity in 1u32..=5,
        repeats in 1usize..4,
    ) {
        let fleet = fleet_with_parts();
        let maintenance = fleet
            .open_maintenance(&PlateId::from("ES-001"), TechnicianId(1), at(8))
            .unwrap();
        let part = part_id(0);
        fleet.add_part_usage(maintenance, &part, quantity).unwrap();

        for _ in 0..repeats {
            fleet.deactivate_cheque_line(maintenance, &part).unwrap();
        }
        prop_assert_eq!(fleet.stock_on_hand(&part).unwrap(), INITIAL_STOCK);

        for _ in 0..repeats {
            fleet.reactivate_cheque_line(maintenance, &part).unwrap();
        }
        prop_assert_eq!(fleet.stock_on_hand(&part).unwrap(), INITIAL_STOCK - quantity);
    }
}

// =============================================================================
// Vehicle Lifecycle Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// At most one Active rental per vehicle, and InUse excludes any open
    /// active maintenance, across any op sequence.
    #[test]
    fn rental_uniqueness_and_state_exclusion(
        ops in prop::collection::vec(arb_vehicle_op(), 1..50),
    ) {
        let fleet = fleet_with_parts();
        let plate = PlateId::from("ES-001");
        let mut rentals: Vec<RentalId> = Vec::new();
        let mut maintenances: Vec<MaintenanceId> = Vec::new();
        let mut hour = 6u32;

        for op in &ops {
            hour += 1;
            let _ = match op {
                VehicleOp::Book => fleet
                    .book_rental(CustomerId(1), &plate, LocationId(1), at(hour))
                    .map(|id| rentals.push(id)),
                VehicleOp::Pickup => match rentals.last() {
                    Some(id) => fleet.record_pickup(*id, at(hour)).map(|_| ()),
                    None => Ok(()),
                },
                VehicleOp::Complete => match rentals.last() {
                    Some(id) => fleet.complete_rental(*id, at(23)).map(|_| ()),
                    None => Ok(()),
                },
                VehicleOp::Cancel => match rentals.last() {
                    Some(id) => fleet.cancel_rental(*id).map(|_| ()),
                    None => Ok(()),
                },
                VehicleOp::Reactivate => match rentals.last() {
                    Some(id) => fleet.reactivate_rental(*id).map(|_| ()),
                    None => Ok(()),
                },
                VehicleOp::OpenMaintenance => fleet
                    .open_maintenance(&plate, TechnicianId(1), at(hour))
                    .map(|id| maintenances.push(id)),
                VehicleOp::CloseMaintenance => match maintenances.last() {
                    Some(id) => fleet.close_maintenance(*id, at(23), None).map(|_| ()),
                    None => Ok(()),
                },
                VehicleOp::DeactivateMaintenance => match maintenances.last() {
                    Some(id) => fleet.deactivate_maintenance(*id).map(|_| ()),
                    None => Ok(()),
                },
                VehicleOp::ReactivateMaintenance => match maintenances.last() {
                    Some(id) => fleet.reactivate_maintenance(*id).map(|_| ()),
                    None => Ok(()),
                },
            };

            // Rental uniqueness.
            let active_rentals = rentals
                .iter()
                .filter(|id| fleet.get_rental(**id).unwrap().status() == RentalStatus::Active)
                .count();
            prop_assert!(active_rentals <= 1, "{} active rentals after {:?}", active_rentals, op);

            // Open, active maintenance sessions for the plate.
            let open_maintenances = maintenances
                .iter()
                .filter(|id| {
                    let m = fleet.get_maintenance(**id).unwrap();
                    m.active() && m.end().is_none()
                })
                .count();
            prop_assert!(open_maintenances <= 1);

            // Mutual exclusion: the derived status agrees with the records.
            let status = fleet.vehicle_status(&plate).unwrap();
            if status == VehicleStatus::InUse {
                prop_assert_eq!(open_maintenances, 0, "InUse with open maintenance");
                prop_assert_eq!(active_rentals, 1);
            }
            if open_maintenances == 1 {
                prop_assert_eq!(status, VehicleStatus::Maintenance);
            }
        }
    }
}

// =============================================================================
// Deployment Invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// A vehicle never has two simultaneously open deployments, whatever
    /// mix of starts and ends is thrown at it.
    #[test]
    fn at_most_one_open_deployment(
        steps in prop::collection::vec((1u32..=5, 1u32..=28, any::<bool>()), 1..30),
    ) {
        let fleet = fleet_with_parts();
        let plate = PlateId::from("ES-001");
        let mut deployments = Vec::new();

        for (location, date, end_current) in &steps {
            if *end_current {
                if let Some(id) = deployments.last() {
                    let _ = fleet.end_deployment(*id, day(*date));
                }
            } else if let Ok(id) = fleet.start_deployment(&plate, LocationId(*location), day(*date))
            {
                deployments.push(id);
            }

            let open = deployments
                .iter()
                .filter(|id| fleet.get_deployment(**id).unwrap().is_open())
                .count();
            prop_assert!(open <= 1, "{} open deployments", open);

            // The derived location agrees with the open deployment.
            let location = fleet.current_location(&plate).unwrap();
            prop_assert_eq!(location.is_some(), open == 1);
        }
    }
}

// =============================================================================
// Booking Determinism
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A sequence of book/complete pairs always leaves the vehicle
    /// Available, with every rental Completed.
    #[test]
    fn completed_cycles_always_free_the_vehicle(
        cycles in 1usize..10,
    ) {
        let fleet = fleet_with_parts();
        let plate = PlateId::from("ES-001");

        for cycle in 0..cycles {
            let rental = fleet
                .book_rental(CustomerId(cycle as u32 + 1), &plate, LocationId(1), at(8))
                .unwrap();
            fleet.record_pickup(rental, at(9)).unwrap();
            fleet.complete_rental(rental, at(17)).unwrap();
            prop_assert_eq!(
                fleet.get_rental(rental).unwrap().status(),
                RentalStatus::Completed
            );
        }

        prop_assert_eq!(fleet.vehicle_status(&plate).unwrap(), VehicleStatus::Available);
    }
}
